//! Diff generation for proposed file mutations.
//!
//! Turns a proposed full-file write, or a set of line-range edit
//! operations, into a `FileDiff` with stable hunk ids. Hunks are computed
//! at zero context, so each hunk is exactly one contiguous changed block —
//! the unit the reviewer approves or rejects.
//!
//! Every failure is a typed `DiffError`; the gateway recovers from all of
//! them by degrading to a binary confirmation.

use crate::diff::apply::{join_lines, split_lines};
use crate::diff::types::{DiffError, EditOp, FileDiff, Hunk};
use crate::utils::paths::resolve_in_workspace;
use similar::TextDiff;
use std::path::{Path, PathBuf};

/// Computes structured diffs against the current workspace state.
pub struct DiffGenerator {
    workspace_root: PathBuf,
}

impl DiffGenerator {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Diff a proposed full-file write against the file's current content.
    /// A file that doesn't exist yet diffs against empty content.
    pub fn diff_for_write(&self, file_path: &str, content: &str) -> Result<FileDiff, DiffError> {
        let old = self.read_current(file_path, true)?;
        Ok(build_diff(&old, content))
    }

    /// Apply the edit operations to the file's current content, then diff
    /// the result against it. Editing a missing file is an error.
    pub fn diff_for_edits(&self, file_path: &str, edits: &[EditOp]) -> Result<FileDiff, DiffError> {
        let old = self.read_current(file_path, false)?;
        let new = apply_edits(&old, edits)?;
        Ok(build_diff(&old, &new))
    }

    fn read_current(&self, file_path: &str, missing_ok: bool) -> Result<String, DiffError> {
        let resolved = resolve_in_workspace(&self.workspace_root, file_path)?;
        if !resolved.exists() {
            return if missing_ok {
                Ok(String::new())
            } else {
                Err(DiffError::NotFound(file_path.to_string()))
            };
        }
        std::fs::read_to_string(&resolved).map_err(|source| DiffError::Unreadable {
            path: file_path.to_string(),
            source,
        })
    }
}

/// Compute hunks between old and new content. Zero context: each grouped
/// op run becomes one hunk covering exactly the changed lines.
fn build_diff(old: &str, new: &str) -> FileDiff {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    let diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();

    for group in diff.grouped_ops(0) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;
        if old_range.is_empty() && new_range.is_empty() {
            continue;
        }
        hunks.push(Hunk {
            id: format!("hunk-{}", hunks.len()),
            old_start: old_range.start,
            old_lines: old_lines[old_range].iter().map(|l| l.to_string()).collect(),
            new_lines: new_lines[new_range].iter().map(|l| l.to_string()).collect(),
        });
    }

    FileDiff::new(old.to_string(), new.to_string(), hunks)
}

/// Apply line-range edits to content. Edits may arrive in any order;
/// overlapping or out-of-bounds ranges are conflicts.
fn apply_edits(old: &str, edits: &[EditOp]) -> Result<String, DiffError> {
    let old_lines = split_lines(old);

    let mut ordered: Vec<&EditOp> = edits.iter().collect();
    ordered.sort_by_key(|e| (e.start_line, e.end_line));

    for edit in &ordered {
        if edit.start_line > edit.end_line {
            return Err(DiffError::InvalidRange {
                start_line: edit.start_line,
                end_line: edit.end_line,
            });
        }
        if edit.end_line > old_lines.len() {
            return Err(DiffError::RangeOutOfBounds {
                start_line: edit.start_line,
                end_line: edit.end_line,
                file_lines: old_lines.len(),
            });
        }
    }
    for pair in ordered.windows(2) {
        if pair[1].start_line < pair[0].end_line {
            return Err(DiffError::ConflictingEdits {
                first_start: pair[0].start_line,
                first_end: pair[0].end_line,
                second_start: pair[1].start_line,
                second_end: pair[1].end_line,
            });
        }
    }

    let mut out: Vec<&str> = Vec::with_capacity(old_lines.len());
    let mut cursor = 0usize;
    for edit in &ordered {
        out.extend(&old_lines[cursor..edit.start_line]);
        out.extend(split_lines(&edit.new_text));
        cursor = edit.end_line;
    }
    out.extend(&old_lines[cursor..]);

    Ok(join_lines(&out, old.ends_with('\n')))
}
