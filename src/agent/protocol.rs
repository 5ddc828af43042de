//! Agent IPC protocol types.
//!
//! Defines the JSON messages exchanged between the host agent (the
//! process proposing mutations) and the diffgate serve harness over a
//! Unix domain socket.
//!
//! The agent sends MutationRequests; diffgate routes each through the
//! approval gateway and answers with a MutationResponse once the human
//! decision is terminal.

use crate::approval::types::ApprovalKind;
use crate::diff::EditOp;
use serde::{Deserialize, Serialize};

/// A proposed file mutation awaiting approval.
/// Sent over the Unix domain socket as a JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRequest {
    /// Agent-side correlation id (echoed back in the response)
    pub request_id: String,

    /// Whether this is a full-file write or a set of edits
    pub kind: ApprovalKind,

    /// Workspace-relative path of the target file
    pub path: String,

    /// For writes: the full proposed content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// For edits: the line-range operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<Vec<EditOp>>,
}

/// The terminal outcome for one proposed mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    /// Matches the request_id from the request
    pub request_id: String,

    /// Whether the mutation may proceed
    pub approved: bool,

    /// If approved: the content the agent should write. On partial
    /// approval this is the approved-hunks-only application; absent when
    /// the decision came from the fallback path for an edit request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// If rejected or failed: why
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationResponse {
    /// Create an "approved" response, optionally with the content to write.
    pub fn approved(request_id: String, content: Option<String>) -> Self {
        Self {
            request_id,
            approved: true,
            content,
            error: None,
        }
    }

    /// Create a "rejected" response with a reason.
    pub fn rejected(request_id: String, reason: impl Into<String>) -> Self {
        Self {
            request_id,
            approved: false,
            content: None,
            error: Some(reason.into()),
        }
    }

    /// Create an "error" response for internal failures.
    pub fn internal_error(request_id: String, error: impl Into<String>) -> Self {
        Self {
            request_id,
            approved: false,
            content: None,
            error: Some(format!("Internal error: {}", error.into())),
        }
    }
}
