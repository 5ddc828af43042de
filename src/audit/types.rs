//! Types for the diffgate audit trail.
//!
//! Every terminal decision that flows through the serve harness gets
//! logged — approved, rejected, cancelled, or degraded to the fallback.
//! The gateway itself keeps no persisted state; the audit trail records
//! outcomes, nothing more.

use crate::approval::types::ApprovalKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entry in the audit log.
/// One entry per terminal approval decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// When the decision became terminal
    pub timestamp: DateTime<Utc>,

    /// Session identifier (generated at `diffgate serve` start)
    pub session_id: String,

    /// The gateway request id (or the fallback sentinel)
    pub request_id: String,

    /// What kind of mutation was proposed
    pub kind: ApprovalKind,

    /// Workspace-relative path of the target file
    pub path: String,

    /// Whether the mutation was approved
    pub approved: bool,

    /// On partial approval: how many hunks were approved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_hunks: Option<usize>,

    /// Whether the decision came from the degraded binary confirmation
    #[serde(default)]
    pub fallback: bool,

    /// If rejected or cancelled: why
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,

    /// How long the reviewer took to decide (milliseconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_duration_ms: Option<u64>,
}

/// Summary statistics for a session's audit log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub total_decisions: usize,
    pub approved: usize,
    pub rejected: usize,
    pub partial: usize,
    pub fallbacks: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SessionSummary {
    /// Format as a human-readable one-liner for terminal output.
    pub fn one_line(&self) -> String {
        format!(
            "{} decisions | {} approved | {} rejected | {} partial | {} fallback",
            self.total_decisions, self.approved, self.rejected, self.partial, self.fallbacks
        )
    }
}

/// Filter criteria for querying audit logs.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub kind: Option<ApprovalKind>,
    pub decision: Option<DecisionFilter>,
    pub limit: Option<usize>,
}

/// Filter for decision outcomes in log queries.
#[derive(Debug, Clone)]
pub enum DecisionFilter {
    Approved,
    Rejected,
    Fallback,
}
