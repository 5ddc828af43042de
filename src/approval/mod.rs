pub mod fallback;
pub mod gateway;
pub mod types;

use crate::approval::types::ApprovalKind;
use anyhow::Result;
use async_trait::async_trait;

pub use fallback::{AutoApprove, AutoDeny, TerminalConfirm};
pub use gateway::ApprovalGateway;
pub use types::{
    ApprovalRequest, ApprovalResponse, OriginalInput, FALLBACK_REQUEST_ID,
};

/// What the reviewer is asked to confirm when no diff could be computed.
#[derive(Debug, Clone)]
pub struct FallbackPrompt {
    /// The kind of mutation that was proposed
    pub kind: ApprovalKind,
    /// Workspace-relative path of the target file
    pub file_path: String,
    /// Why the rich diff is unavailable
    pub reason: String,
}

/// Trait for the degraded binary confirmation.
/// Implementations can be terminal-based, auto-approve, etc.
#[async_trait]
pub trait FallbackConfirm {
    async fn confirm(&self, prompt: &FallbackPrompt) -> Result<bool>;
}
