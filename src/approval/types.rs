//! Types for the approval flow.
//!
//! `ApprovalRequest` and `ApprovalResponse` are the two halves of the
//! contract between the gateway and the review surface: one request is
//! shown, exactly one terminal response comes back, correlated by
//! string-equality on the request id.

use crate::diff::{EditOp, FileDiff};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Request id carried by responses produced without a pending request —
/// the degraded binary confirmation used when diff generation fails.
pub const FALLBACK_REQUEST_ID: &str = "fallback";

/// The kind of mutation awaiting approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    /// A full-file write (includes creating new files)
    Write,
    /// A set of line-range edit operations
    Edit,
}

impl fmt::Display for ApprovalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalKind::Write => write!(f, "write"),
            ApprovalKind::Edit => write!(f, "edit"),
        }
    }
}

impl ApprovalKind {
    /// Parse a kind from a string (used for log filtering).
    /// Accepts a few aliases so CLI flags feel natural to type.
    pub fn from_str_loose(s: &str) -> Option<ApprovalKind> {
        match s.to_lowercase().trim() {
            "write" | "write_file" | "file_write" => Some(ApprovalKind::Write),
            "edit" | "edits" | "file_edit" => Some(ApprovalKind::Edit),
            _ => None,
        }
    }
}

/// The agent's untransformed proposal. Kept with the pending request for
/// auditing and re-application; never sent to the review surface.
#[derive(Debug, Clone)]
pub enum OriginalInput {
    Write { content: String },
    Edit { edits: Vec<EditOp> },
}

/// A pending unit of work awaiting a single human decision about a
/// proposed file mutation. Owned exclusively by the gateway from creation
/// until terminal resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    /// Globally unique for the gateway's lifetime
    pub id: String,

    #[serde(rename = "type")]
    pub kind: ApprovalKind,

    /// Workspace-relative path of the file to mutate
    pub file_path: String,

    /// The structured diff the reviewer decides on
    pub diff: FileDiff,

    /// The agent's original proposal (internal, not part of the wire shape)
    #[serde(skip)]
    pub original_input: Option<OriginalInput>,

    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// The single terminal value delivered to the caller for each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    /// Matches the id of the originating request
    pub request_id: String,

    /// Whether the mutation may proceed
    pub approved: bool,

    /// If present, only these hunks were approved (partial approval)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_hunks: Option<BTreeSet<String>>,

    /// If rejected or cancelled: why
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

impl ApprovalResponse {
    /// Full approval of every hunk.
    pub fn approved(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            approved: true,
            approved_hunks: None,
            reject_reason: None,
        }
    }

    /// Approval of a subset of hunks.
    pub fn partial(request_id: impl Into<String>, approved_hunks: BTreeSet<String>) -> Self {
        Self {
            request_id: request_id.into(),
            approved: true,
            approved_hunks: Some(approved_hunks),
            reject_reason: None,
        }
    }

    /// Rejection with a reason shown to the agent.
    pub fn rejected(request_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            approved: false,
            approved_hunks: None,
            reject_reason: Some(reason.into()),
        }
    }

    /// The terminal value delivered when a request is cancelled — by the
    /// surface closing it, or by gateway disposal.
    pub fn cancelled(request_id: impl Into<String>) -> Self {
        Self::rejected(request_id, "Cancelled by user")
    }

    /// Outcome of the degraded binary confirmation. Carries the sentinel
    /// request id and no hunk granularity.
    pub fn fallback(approved: bool) -> Self {
        Self {
            request_id: FALLBACK_REQUEST_ID.to_string(),
            approved,
            approved_hunks: None,
            reject_reason: (!approved).then(|| "Rejected via fallback confirmation".to_string()),
        }
    }

    /// True when this is a fallback outcome rather than a reviewed diff.
    pub fn is_fallback(&self) -> bool {
        self.request_id == FALLBACK_REQUEST_ID
    }

    /// True when only a subset of hunks was approved.
    pub fn is_partial(&self) -> bool {
        self.approved && self.approved_hunks.is_some()
    }
}
