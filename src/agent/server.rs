//! Agent server — the boundary between the proposing agent and the
//! approval gateway.
//!
//! Listens on a Unix domain socket. The agent sends JSON mutation
//! requests over this socket, and the server:
//! 1. Routes each through the approval gateway (which shows the diff to
//!    the reviewer and suspends until the decision is terminal)
//! 2. Answers with the outcome, including the content to write when a
//!    hunk subset was approved
//! 3. Optionally applies approved content to the workspace itself
//! 4. Logs every terminal decision to the audit trail

use crate::agent::protocol::{MutationRequest, MutationResponse};
use crate::approval::types::{ApprovalKind, ApprovalResponse};
use crate::approval::ApprovalGateway;
use crate::audit::{AuditLogger, DecisionRecord};
use crate::diff::{apply_hunks, DiffGenerator};
use crate::utils::paths::resolve_in_workspace;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::Mutex;

/// Shared state for all agent connections.
struct AgentContext {
    gateway: Arc<ApprovalGateway>,
    diff: DiffGenerator,
    workspace_root: PathBuf,
    /// Apply approved content to the workspace on the host side
    apply: bool,
    session_id: String,
    logger: Option<Mutex<AuditLogger>>,
}

/// The server that mediates all agent mutation requests.
pub struct AgentServer {
    socket_path: PathBuf,
    ctx: Arc<AgentContext>,
}

impl AgentServer {
    pub fn new(
        socket_path: impl AsRef<Path>,
        gateway: Arc<ApprovalGateway>,
        workspace_root: impl AsRef<Path>,
        apply: bool,
        session_id: String,
        logger: Option<AuditLogger>,
    ) -> Self {
        let workspace_root = workspace_root.as_ref().to_path_buf();
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            ctx: Arc::new(AgentContext {
                gateway,
                diff: DiffGenerator::new(&workspace_root),
                workspace_root,
                apply,
                session_id,
                logger: logger.map(Mutex::new),
            }),
        }
    }

    /// Start the agent server. Listens for connections and handles requests.
    pub async fn run(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind socket: {}", self.socket_path.display()))?;

        tracing::info!("agent server listening on {}", self.socket_path.display());

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let ctx = self.ctx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, ctx).await {
                            tracing::error!("agent connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("failed to accept agent connection: {}", e);
                }
            }
        }
    }
}

/// Handle a single connection from an agent.
async fn handle_connection(stream: tokio::net::UnixStream, ctx: Arc<AgentContext>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // Connection closed
        }

        let request: MutationRequest = match serde_json::from_str(line.trim()) {
            Ok(req) => req,
            Err(e) => {
                let error_response = MutationResponse::internal_error(
                    "unknown".to_string(),
                    format!("Invalid request JSON: {}", e),
                );
                let json = serde_json::to_string(&error_response)?;
                writer.write_all(json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                continue;
            }
        };

        let response = process_request(&request, &ctx).await;

        let json = serde_json::to_string(&response)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Route one mutation request through the gateway and build the answer.
async fn process_request(request: &MutationRequest, ctx: &AgentContext) -> MutationResponse {
    let start = std::time::Instant::now();

    let outcome = match request.kind {
        ApprovalKind::Write => {
            let Some(content) = &request.content else {
                return MutationResponse::internal_error(
                    request.request_id.clone(),
                    "write request is missing content",
                );
            };
            ctx.gateway.request_write_approval(&request.path, content).await
        }
        ApprovalKind::Edit => {
            let Some(edits) = &request.edits else {
                return MutationResponse::internal_error(
                    request.request_id.clone(),
                    "edit request is missing edits",
                );
            };
            ctx.gateway.request_edit_approval(&request.path, edits).await
        }
    };

    log_decision(ctx, request, &outcome, start.elapsed().as_millis() as u64).await;

    if !outcome.approved {
        return MutationResponse::rejected(
            request.request_id.clone(),
            outcome
                .reject_reason
                .unwrap_or_else(|| "Rejected by reviewer".to_string()),
        );
    }

    let content = match final_content(request, &outcome, ctx) {
        Ok(content) => content,
        Err(e) => {
            return MutationResponse::internal_error(request.request_id.clone(), e.to_string())
        }
    };

    if ctx.apply {
        if let Some(content) = &content {
            if let Err(e) = apply_to_workspace(&ctx.workspace_root, &request.path, content) {
                return MutationResponse::internal_error(
                    request.request_id.clone(),
                    e.to_string(),
                );
            }
        }
    }

    MutationResponse::approved(request.request_id.clone(), content)
}

/// The content the agent should write for an approved mutation.
///
/// Full approval uses the diff's new content; partial approval applies
/// only the approved hunks — the same pure function the reviewer's
/// preview used, so what was previewed is exactly what lands. A fallback
/// approval has no diff; the proposed write content passes through
/// unchanged, and a fallback-approved edit yields no content (the agent
/// applies its own edits).
fn final_content(
    request: &MutationRequest,
    outcome: &ApprovalResponse,
    ctx: &AgentContext,
) -> Result<Option<String>> {
    if outcome.is_fallback() {
        return Ok(match request.kind {
            ApprovalKind::Write => request.content.clone(),
            ApprovalKind::Edit => None,
        });
    }

    // The file hasn't changed since the request was registered, so the
    // recomputed diff carries the same hunks the reviewer saw.
    let diff = match request.kind {
        ApprovalKind::Write => ctx
            .diff
            .diff_for_write(request.path.as_str(), request.content.as_deref().unwrap_or(""))?,
        ApprovalKind::Edit => ctx
            .diff
            .diff_for_edits(request.path.as_str(), request.edits.as_deref().unwrap_or(&[]))?,
    };

    match &outcome.approved_hunks {
        Some(approved) if approved.len() < diff.hunks.len() => {
            Ok(Some(apply_hunks(&diff.old_content, &diff.hunks, approved)))
        }
        _ => Ok(Some(diff.new_content)),
    }
}

/// Write approved content into the workspace (traversal-guarded).
fn apply_to_workspace(workspace_root: &Path, relative_path: &str, content: &str) -> Result<()> {
    let target = resolve_in_workspace(workspace_root, relative_path)?;
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(&target, content)
        .with_context(|| format!("Failed to write file: {}", target.display()))?;
    tracing::info!(path = relative_path, "applied approved mutation");
    Ok(())
}

async fn log_decision(
    ctx: &AgentContext,
    request: &MutationRequest,
    outcome: &ApprovalResponse,
    duration_ms: u64,
) {
    let Some(logger) = &ctx.logger else {
        return;
    };
    let record = DecisionRecord {
        timestamp: Utc::now(),
        session_id: ctx.session_id.clone(),
        request_id: outcome.request_id.clone(),
        kind: request.kind,
        path: request.path.clone(),
        approved: outcome.approved,
        approved_hunks: outcome.approved_hunks.as_ref().map(|h| h.len()),
        fallback: outcome.is_fallback(),
        reject_reason: outcome.reject_reason.clone(),
        decision_duration_ms: Some(duration_ms),
    };
    if let Err(e) = logger.lock().await.log(&record) {
        tracing::error!("failed to write audit log: {}", e);
    }
}
