//! Surface client — a review surface speaking to the gateway over its
//! Unix socket.
//!
//! Used by:
//! 1. Integration/E2E tests that script a reviewer's behavior
//! 2. Any headless or remote surface implementation
//!
//! Synchronous I/O, one JSON line per message. Inside a tokio runtime,
//! run calls through `spawn_blocking`.

use crate::approval::ApprovalResponse;
use crate::surface::protocol::{GatewayToSurface, SurfaceToGateway};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

/// A connected review surface.
pub struct SurfaceClient {
    writer: UnixStream,
    reader: BufReader<UnixStream>,
}

impl SurfaceClient {
    /// Connect to a gateway's surface socket.
    pub fn connect(socket_path: impl AsRef<Path>) -> Result<Self> {
        let socket_path = socket_path.as_ref();
        let stream = UnixStream::connect(socket_path).with_context(|| {
            format!(
                "Failed to connect to surface socket at {}. Is diffgate running?",
                socket_path.display()
            )
        })?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            writer: stream,
            reader,
        })
    }

    /// Send one message to the gateway.
    pub fn send(&mut self, message: &SurfaceToGateway) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.writer.write_all(json.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Block until the next gateway message arrives.
    pub fn next_message(&mut self) -> Result<GatewayToSurface> {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line)?;
        if bytes == 0 {
            anyhow::bail!("gateway closed the surface connection");
        }
        serde_json::from_str(line.trim()).context("Failed to parse gateway message")
    }

    /// Announce readiness; the gateway re-sends every pending request.
    pub fn announce_ready(&mut self) -> Result<()> {
        self.send(&SurfaceToGateway::Ready)
    }

    /// Approve a request in full.
    pub fn approve(&mut self, request_id: &str) -> Result<()> {
        self.send(&SurfaceToGateway::ApprovalResponse {
            response: ApprovalResponse::approved(request_id),
        })
    }

    /// Approve only a subset of hunks.
    pub fn approve_hunks(&mut self, request_id: &str, hunks: BTreeSet<String>) -> Result<()> {
        self.send(&SurfaceToGateway::ApprovalResponse {
            response: ApprovalResponse::partial(request_id, hunks),
        })
    }

    /// Reject a request with a reason.
    pub fn reject(&mut self, request_id: &str, reason: &str) -> Result<()> {
        self.send(&SurfaceToGateway::ApprovalResponse {
            response: ApprovalResponse::rejected(request_id, reason),
        })
    }

    /// Ask for the content that would result from a hunk subset.
    pub fn request_preview(&mut self, request_id: &str, hunks: BTreeSet<String>) -> Result<()> {
        self.send(&SurfaceToGateway::RequestPreview {
            request_id: request_id.to_string(),
            approved_hunks: hunks,
        })
    }

    /// Close a request without a decision.
    pub fn cancel(&mut self, request_id: &str) -> Result<()> {
        self.send(&SurfaceToGateway::CancelRequest {
            request_id: request_id.to_string(),
        })
    }
}
