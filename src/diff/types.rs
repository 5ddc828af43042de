//! Core types for structured diffs.
//!
//! A `FileDiff` is produced once by the generator and is immutable
//! afterward; hunk ids are stable for the lifetime of the diff and are
//! what the review surface references when approving a subset of changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A contiguous block of changed lines, individually approvable.
///
/// `old_start` is the 0-based line index in the old content where this
/// hunk applies. Hunks are applied by line-range offset, never by
/// searching for their old text — repeated content in a file must not
/// change where a hunk lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    /// Stable id, unique within the diff (`hunk-0`, `hunk-1`, ... in file order)
    pub id: String,

    /// 0-based line index in the old content where the hunk starts
    pub old_start: usize,

    /// Lines removed from the old content
    pub old_lines: Vec<String>,

    /// Lines inserted in their place
    pub new_lines: Vec<String>,
}

impl Hunk {
    /// Number of lines this hunk adds.
    pub fn additions(&self) -> usize {
        self.new_lines.len()
    }

    /// Number of lines this hunk removes.
    pub fn deletions(&self) -> usize {
        self.old_lines.len()
    }
}

/// A structured diff between the current content of a file and a
/// proposed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    /// The file's content before the mutation (empty for new files)
    pub old_content: String,

    /// The full proposed content after the mutation
    pub new_content: String,

    /// Changed blocks in file order
    pub hunks: Vec<Hunk>,

    /// Total lines added across all hunks
    pub additions: usize,

    /// Total lines removed across all hunks
    pub deletions: usize,
}

impl FileDiff {
    pub fn new(old_content: String, new_content: String, hunks: Vec<Hunk>) -> Self {
        let additions = hunks.iter().map(Hunk::additions).sum();
        let deletions = hunks.iter().map(Hunk::deletions).sum();
        Self {
            old_content,
            new_content,
            hunks,
            additions,
            deletions,
        }
    }

    /// True if the proposed content is identical to the current content.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// The ids of all hunks in this diff, in file order.
    pub fn hunk_ids(&self) -> Vec<String> {
        self.hunks.iter().map(|h| h.id.clone()).collect()
    }
}

/// A single line-range edit operation: replace the half-open line range
/// `[start_line, end_line)` of the file with `new_text`. An insertion has
/// `start_line == end_line`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOp {
    pub start_line: usize,
    pub end_line: usize,
    pub new_text: String,
}

impl EditOp {
    pub fn replace(start_line: usize, end_line: usize, new_text: impl Into<String>) -> Self {
        Self {
            start_line,
            end_line,
            new_text: new_text.into(),
        }
    }

    pub fn insert(at_line: usize, new_text: impl Into<String>) -> Self {
        Self::replace(at_line, at_line, new_text)
    }
}

/// Why a diff could not be computed. Always a catchable condition —
/// the gateway recovers from every variant via the fallback confirmation.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot edit {0}: file does not exist")]
    NotFound(String),

    #[error("{0}")]
    OutsideWorkspace(#[from] crate::utils::paths::PathResolveError),

    #[error("invalid edit range {start_line}..{end_line}")]
    InvalidRange { start_line: usize, end_line: usize },

    #[error("edit range {start_line}..{end_line} is out of bounds ({file_lines} lines in file)")]
    RangeOutOfBounds {
        start_line: usize,
        end_line: usize,
        file_lines: usize,
    },

    #[error("conflicting edits: {first_start}..{first_end} overlaps {second_start}..{second_end}")]
    ConflictingEdits {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },
}
