//! The review-surface message contract.
//!
//! The only wire-level contract in the system: typed messages exchanged
//! between the gateway and whatever renders the review UI. The gateway's
//! correctness depends on these shapes alone, never on how the surface
//! renders them, so the surface can be a terminal pane, an editor webview,
//! or a test script.
//!
//! Sent as JSON lines; the `type` tag and camelCase payload fields are the
//! contract and must not drift.

use crate::approval::types::{ApprovalRequest, ApprovalResponse};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Messages the gateway sends to the review surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GatewayToSurface {
    /// Render this request's diff and collect a decision.
    #[serde(rename_all = "camelCase")]
    ShowDiff { request: ApprovalRequest },

    /// The content that would result from the hunk subset the surface
    /// asked about.
    #[serde(rename_all = "camelCase")]
    PreviewResult {
        request_id: String,
        preview_content: String,
    },
}

/// Messages the review surface sends to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceToGateway {
    /// The reviewer's terminal decision for one request.
    #[serde(rename_all = "camelCase")]
    ApprovalResponse { response: ApprovalResponse },

    /// Ask what the file would look like with only these hunks applied.
    #[serde(rename_all = "camelCase")]
    RequestPreview {
        request_id: String,
        approved_hunks: BTreeSet<String>,
    },

    /// The surface closed this request without a decision.
    #[serde(rename_all = "camelCase")]
    CancelRequest { request_id: String },

    /// The surface is attached and ready to render.
    Ready,
}
