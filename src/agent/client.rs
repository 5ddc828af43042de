//! Agent client — proposes mutations to the diffgate serve harness over
//! a Unix socket.
//!
//! Used by:
//! 1. Agent-side tooling that wants its writes reviewed
//! 2. Integration/E2E tests to exercise the full approval flow

use crate::agent::protocol::{MutationRequest, MutationResponse};
use crate::approval::types::ApprovalKind;
use crate::diff::EditOp;
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Client for proposing mutations through diffgate.
pub struct AgentClient {
    socket_path: PathBuf,
}

impl AgentClient {
    /// Create a new client pointing to an agent socket.
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    /// Create a client using the DIFFGATE_SOCKET environment variable.
    pub fn from_env() -> Result<Self> {
        let socket_path = std::env::var("DIFFGATE_SOCKET").context(
            "DIFFGATE_SOCKET environment variable not set. Are you running inside diffgate?",
        )?;
        Ok(Self::new(socket_path))
    }

    /// Send a request and block until the terminal decision arrives.
    /// Each call opens a new connection — the decision can take as long
    /// as the human takes.
    pub fn send(&self, request: &MutationRequest) -> Result<MutationResponse> {
        let mut stream = UnixStream::connect(&self.socket_path).with_context(|| {
            format!(
                "Failed to connect to diffgate at {}. Is diffgate running?",
                self.socket_path.display()
            )
        })?;

        let json = serde_json::to_string(request)?;
        stream.write_all(json.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        reader.read_line(&mut response_line)?;

        let response: MutationResponse = serde_json::from_str(response_line.trim())
            .context("Failed to parse diffgate response")?;

        Ok(response)
    }

    /// Convenience: propose a full-file write.
    pub fn propose_write(&self, path: &str, content: &str) -> Result<MutationResponse> {
        let request = MutationRequest {
            request_id: Uuid::new_v4().to_string(),
            kind: ApprovalKind::Write,
            path: path.to_string(),
            content: Some(content.to_string()),
            edits: None,
        };
        self.send(&request)
    }

    /// Convenience: propose a set of line-range edits.
    pub fn propose_edits(&self, path: &str, edits: Vec<EditOp>) -> Result<MutationResponse> {
        let request = MutationRequest {
            request_id: Uuid::new_v4().to_string(),
            kind: ApprovalKind::Edit,
            path: path.to_string(),
            content: None,
            edits: Some(edits),
        };
        self.send(&request)
    }
}
