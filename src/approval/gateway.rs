//! The approval gateway — brokers exactly-once human decisions for
//! proposed file mutations.
//!
//! Lifecycle of one request:
//! 1. A caller proposes a write or a set of edits
//! 2. The diff generator turns it into a structured diff
//! 3. The request enters the pending table and a `showDiff` message goes
//!    to the review surface
//! 4. The caller suspends on a oneshot channel until a terminal event
//!    arrives: the reviewer's response, a cancellation, or disposal
//!
//! If diff generation fails, no pending entry is ever created — the
//! gateway degrades to a binary confirmation and resolves immediately.
//!
//! Exactly-once delivery is structural: the oneshot sender lives inside
//! the single pending-table entry, and the entry is removed atomically
//! with the send. A late or duplicate response finds no entry and is a
//! logged no-op.

use crate::approval::types::{
    ApprovalKind, ApprovalRequest, ApprovalResponse, OriginalInput,
};
use crate::approval::{FallbackConfirm, FallbackPrompt};
use crate::diff::{apply_hunks, DiffError, DiffGenerator, EditOp};
use crate::surface::protocol::{GatewayToSurface, SurfaceToGateway};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use uuid::Uuid;

/// One entry in the pending table: the request plus the mechanism to
/// fulfill the caller's outstanding future exactly once.
struct PendingApproval {
    request: ApprovalRequest,
    responder: oneshot::Sender<ApprovalResponse>,
}

/// Everything the gateway mutates, behind one lock so a lookup and its
/// corresponding table mutation are a single atomic step.
struct GatewayState {
    pending: HashMap<String, PendingApproval>,
    surface: Option<mpsc::UnboundedSender<GatewayToSurface>>,
    disposed: bool,
}

impl GatewayState {
    fn send_to_surface(&self, message: GatewayToSurface) {
        let Some(tx) = &self.surface else {
            tracing::debug!("surface channel released, dropping outbound message");
            return;
        };
        if tx.send(message).is_err() {
            tracing::debug!("surface receiver gone, dropping outbound message");
        }
    }
}

/// Brokers exactly-once, human-correlated approval for each proposed
/// file mutation, regardless of UI failures.
pub struct ApprovalGateway {
    diff: DiffGenerator,
    fallback: Arc<dyn FallbackConfirm + Send + Sync>,
    state: Mutex<GatewayState>,
}

impl ApprovalGateway {
    /// Create a gateway for a workspace. Returns the gateway and the
    /// outbound half of the surface channel; whoever renders the review
    /// surface consumes the receiver and feeds replies back through
    /// `handle_surface_message`.
    pub fn new(
        workspace_root: impl AsRef<Path>,
        fallback: Arc<dyn FallbackConfirm + Send + Sync>,
    ) -> (Self, mpsc::UnboundedReceiver<GatewayToSurface>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gateway = Self {
            diff: DiffGenerator::new(workspace_root),
            fallback,
            state: Mutex::new(GatewayState {
                pending: HashMap::new(),
                surface: Some(tx),
                disposed: false,
            }),
        };
        (gateway, rx)
    }

    /// Request approval for a full-file write. Suspends until the
    /// reviewer decides, the request is cancelled, or the gateway is
    /// disposed — every path yields a terminal response, never an error.
    pub async fn request_write_approval(
        &self,
        file_path: &str,
        content: &str,
    ) -> ApprovalResponse {
        match self.diff.diff_for_write(file_path, content) {
            Ok(diff) => {
                let original = OriginalInput::Write {
                    content: content.to_string(),
                };
                self.register_and_wait(ApprovalKind::Write, file_path, diff, original)
                    .await
            }
            Err(e) => self.fallback_confirm(ApprovalKind::Write, file_path, &e).await,
        }
    }

    /// Request approval for a set of line-range edits. Same contract as
    /// `request_write_approval`.
    pub async fn request_edit_approval(
        &self,
        file_path: &str,
        edits: &[EditOp],
    ) -> ApprovalResponse {
        match self.diff.diff_for_edits(file_path, edits) {
            Ok(diff) => {
                let original = OriginalInput::Edit {
                    edits: edits.to_vec(),
                };
                self.register_and_wait(ApprovalKind::Edit, file_path, diff, original)
                    .await
            }
            Err(e) => self.fallback_confirm(ApprovalKind::Edit, file_path, &e).await,
        }
    }

    /// Dispatch one inbound surface message.
    pub async fn handle_surface_message(&self, message: SurfaceToGateway) {
        match message {
            SurfaceToGateway::ApprovalResponse { response } => {
                self.handle_approval_response(response).await;
            }
            SurfaceToGateway::RequestPreview {
                request_id,
                approved_hunks,
            } => {
                self.handle_preview_request(&request_id, &approved_hunks).await;
            }
            SurfaceToGateway::CancelRequest { request_id } => {
                self.cancel_request(&request_id).await;
            }
            SurfaceToGateway::Ready => {
                self.handle_ready().await;
            }
        }
    }

    /// Deliver the reviewer's decision to the waiting caller. Unknown or
    /// already-resolved ids are tolerated no-ops.
    pub async fn handle_approval_response(&self, mut response: ApprovalResponse) {
        let mut state = self.state.lock().await;
        let Some(entry) = state.pending.remove(&response.request_id) else {
            tracing::debug!(
                request_id = %response.request_id,
                "response for unknown or already-resolved request, ignoring"
            );
            return;
        };

        // Only hunk ids from the originating diff may be approved.
        if let Some(hunks) = response.approved_hunks.as_mut() {
            let known: BTreeSet<&str> =
                entry.request.diff.hunks.iter().map(|h| h.id.as_str()).collect();
            hunks.retain(|id| known.contains(id.as_str()));
        }

        if entry.responder.send(response).is_err() {
            tracing::debug!(
                request_id = %entry.request.id,
                "caller no longer waiting, decision dropped"
            );
        }
    }

    /// Read-only lookup of a pending request. Used by the surface to
    /// recompute a preview; never mutates gateway state.
    pub async fn get_pending_request(&self, request_id: &str) -> Option<ApprovalRequest> {
        let state = self.state.lock().await;
        state.pending.get(request_id).map(|p| p.request.clone())
    }

    /// Number of requests currently awaiting a decision.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Compute the content that would result from applying only the
    /// approved hunks. Pure: repeated calls are idempotent and leave the
    /// stored request untouched. `None` if the id isn't pending.
    pub async fn preview(
        &self,
        request_id: &str,
        approved_hunks: &BTreeSet<String>,
    ) -> Option<String> {
        let state = self.state.lock().await;
        let entry = state.pending.get(request_id)?;
        Some(apply_hunks(
            &entry.request.diff.old_content,
            &entry.request.diff.hunks,
            approved_hunks,
        ))
    }

    /// Cancel a pending request: the caller receives
    /// `{approved: false, reject_reason: "Cancelled by user"}`.
    /// No-op if the id is unknown.
    pub async fn cancel_request(&self, request_id: &str) {
        let mut state = self.state.lock().await;
        let Some(entry) = state.pending.remove(request_id) else {
            tracing::debug!(request_id, "cancel for unknown request, ignoring");
            return;
        };
        let _ = entry.responder.send(ApprovalResponse::cancelled(request_id));
        tracing::info!(request_id, "request cancelled");
    }

    /// Cancel every still-pending request and release the surface
    /// channel. No caller is left awaiting across a teardown; requests
    /// arriving after disposal resolve immediately as cancelled.
    pub async fn dispose(&self) {
        let mut state = self.state.lock().await;
        state.disposed = true;
        let drained: Vec<(String, PendingApproval)> = state.pending.drain().collect();
        for (id, entry) in drained {
            let _ = entry.responder.send(ApprovalResponse::cancelled(&id));
        }
        state.surface = None;
        tracing::info!("gateway disposed, all pending requests cancelled");
    }

    async fn register_and_wait(
        &self,
        kind: ApprovalKind,
        file_path: &str,
        diff: crate::diff::FileDiff,
        original: OriginalInput,
    ) -> ApprovalResponse {
        let request = ApprovalRequest {
            id: next_request_id(),
            kind,
            file_path: file_path.to_string(),
            diff,
            original_input: Some(original),
            created_at: Utc::now(),
        };
        let request_id = request.id.clone();

        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().await;
            if state.disposed {
                return ApprovalResponse::cancelled(request_id);
            }
            state.send_to_surface(GatewayToSurface::ShowDiff {
                request: request.clone(),
            });
            state.pending.insert(
                request_id.clone(),
                PendingApproval {
                    request,
                    responder: tx,
                },
            );
        }
        tracing::info!(request_id = %request_id, %kind, file_path, "approval requested");

        // The responder is only ever dropped without sending if the
        // gateway itself is dropped mid-flight.
        rx.await
            .unwrap_or_else(|_| ApprovalResponse::cancelled(&request_id))
    }

    async fn handle_preview_request(&self, request_id: &str, approved_hunks: &BTreeSet<String>) {
        let state = self.state.lock().await;
        let Some(entry) = state.pending.get(request_id) else {
            tracing::debug!(request_id, "preview for unknown request, ignoring");
            return;
        };
        let preview_content = apply_hunks(
            &entry.request.diff.old_content,
            &entry.request.diff.hunks,
            approved_hunks,
        );
        state.send_to_surface(GatewayToSurface::PreviewResult {
            request_id: request_id.to_string(),
            preview_content,
        });
    }

    /// The surface announced it is (re)attached: re-emit every pending
    /// request so it can render the full outstanding set.
    async fn handle_ready(&self) {
        let state = self.state.lock().await;
        let mut requests: Vec<ApprovalRequest> =
            state.pending.values().map(|p| p.request.clone()).collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        tracing::debug!(count = requests.len(), "surface ready, re-emitting pending requests");
        for request in requests {
            state.send_to_surface(GatewayToSurface::ShowDiff { request });
        }
    }

    async fn fallback_confirm(
        &self,
        kind: ApprovalKind,
        file_path: &str,
        error: &DiffError,
    ) -> ApprovalResponse {
        tracing::warn!(
            %kind,
            file_path,
            %error,
            "diff generation failed, degrading to binary confirmation"
        );
        let prompt = FallbackPrompt {
            kind,
            file_path: file_path.to_string(),
            reason: error.to_string(),
        };
        match self.fallback.confirm(&prompt).await {
            Ok(approved) => ApprovalResponse::fallback(approved),
            Err(e) => {
                tracing::error!("fallback confirmation failed: {}", e);
                ApprovalResponse::rejected(
                    crate::approval::FALLBACK_REQUEST_ID,
                    format!("Fallback confirmation failed: {}", e),
                )
            }
        }
    }
}

/// A fresh request id: creation timestamp plus a random suffix. Unique
/// without any shared counter; correlation is exact string equality.
fn next_request_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("req-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{AutoDeny, FALLBACK_REQUEST_ID};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counts how often the fallback is consulted.
    struct CountingFallback {
        calls: AtomicUsize,
        approve: bool,
    }

    #[async_trait]
    impl FallbackConfirm for CountingFallback {
        async fn confirm(&self, _prompt: &FallbackPrompt) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.approve)
        }
    }

    fn test_gateway(
        workspace: &TempDir,
    ) -> (
        Arc<ApprovalGateway>,
        mpsc::UnboundedReceiver<GatewayToSurface>,
    ) {
        let (gateway, rx) = ApprovalGateway::new(workspace.path(), Arc::new(AutoDeny));
        (Arc::new(gateway), rx)
    }

    /// Spawn a write approval and return its request id once registered.
    async fn spawn_write(
        gateway: &Arc<ApprovalGateway>,
        surface_rx: &mut mpsc::UnboundedReceiver<GatewayToSurface>,
        path: &str,
        content: &str,
    ) -> (tokio::task::JoinHandle<ApprovalResponse>, String) {
        let g = gateway.clone();
        let path = path.to_string();
        let content = content.to_string();
        let handle =
            tokio::spawn(async move { g.request_write_approval(&path, &content).await });

        let message = surface_rx.recv().await.expect("showDiff not emitted");
        let GatewayToSurface::ShowDiff { request } = message else {
            panic!("expected showDiff, got {:?}", message);
        };
        (handle, request.id)
    }

    #[test]
    fn test_request_ids_are_pairwise_distinct() {
        let ids: std::collections::HashSet<String> =
            (0..1000).map(|_| next_request_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[tokio::test]
    async fn test_approval_resolves_waiting_caller() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("foo.ts"), "old").unwrap();
        let (gateway, mut rx) = test_gateway(&tmp);

        let (handle, id) = spawn_write(&gateway, &mut rx, "foo.ts", "console.log(1)").await;
        assert!(gateway.get_pending_request(&id).await.is_some());

        gateway
            .handle_approval_response(ApprovalResponse::approved(&id))
            .await;

        let response = handle.await.unwrap();
        assert_eq!(response.request_id, id);
        assert!(response.approved);
        assert!(gateway.get_pending_request(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_response_is_noop() {
        let tmp = TempDir::new().unwrap();
        let (gateway, mut rx) = test_gateway(&tmp);

        let (handle, id) = spawn_write(&gateway, &mut rx, "a.txt", "content").await;

        gateway
            .handle_approval_response(ApprovalResponse::approved(&id))
            .await;
        // Second delivery for the same id: no panic, no state change.
        gateway
            .handle_approval_response(ApprovalResponse::rejected(&id, "late"))
            .await;

        let response = handle.await.unwrap();
        assert!(response.approved, "first delivery wins");
        assert_eq!(gateway.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_changes_nothing() {
        let tmp = TempDir::new().unwrap();
        let (gateway, mut rx) = test_gateway(&tmp);

        let (_handle, id) = spawn_write(&gateway, &mut rx, "a.txt", "content").await;
        gateway.cancel_request("no-such-id").await;
        assert_eq!(gateway.pending_count().await, 1);
        assert!(gateway.get_pending_request(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_cancel_resolves_with_cancelled_reason() {
        let tmp = TempDir::new().unwrap();
        let (gateway, mut rx) = test_gateway(&tmp);

        let (handle, id) = spawn_write(&gateway, &mut rx, "a.txt", "content").await;
        gateway.cancel_request(&id).await;

        let response = handle.await.unwrap();
        assert!(!response.approved);
        assert_eq!(response.reject_reason.as_deref(), Some("Cancelled by user"));
        assert_eq!(gateway.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_dispose_cancels_all_pending() {
        for k in [0usize, 3, 10] {
            let tmp = TempDir::new().unwrap();
            let (gateway, mut rx) = test_gateway(&tmp);

            let mut handles = Vec::new();
            for i in 0..k {
                let (handle, _id) =
                    spawn_write(&gateway, &mut rx, &format!("f{}.txt", i), "content").await;
                handles.push(handle);
            }
            assert_eq!(gateway.pending_count().await, k);

            gateway.dispose().await;
            assert_eq!(gateway.pending_count().await, 0);

            for handle in handles {
                let response = handle.await.unwrap();
                assert!(!response.approved);
                assert_eq!(response.reject_reason.as_deref(), Some("Cancelled by user"));
            }
        }
    }

    #[tokio::test]
    async fn test_request_after_dispose_resolves_cancelled() {
        let tmp = TempDir::new().unwrap();
        let (gateway, _rx) = test_gateway(&tmp);

        gateway.dispose().await;
        let response = gateway.request_write_approval("a.txt", "content").await;
        assert!(!response.approved);
        assert_eq!(response.reject_reason.as_deref(), Some("Cancelled by user"));
    }

    #[tokio::test]
    async fn test_diff_failure_falls_back_and_still_resolves() {
        let tmp = TempDir::new().unwrap();
        let fallback = Arc::new(CountingFallback {
            calls: AtomicUsize::new(0),
            approve: true,
        });
        let (gateway, _rx) = ApprovalGateway::new(tmp.path(), fallback.clone());

        // Editing a missing file fails diff generation.
        let response = gateway
            .request_edit_approval("missing.txt", &[EditOp::insert(0, "x")])
            .await;

        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
        assert!(response.approved);
        assert!(response.is_fallback());
        assert_eq!(response.request_id, FALLBACK_REQUEST_ID);
        assert_eq!(gateway.pending_count().await, 0, "no pending entry for fallback");
    }

    #[tokio::test]
    async fn test_fallback_rejection() {
        let tmp = TempDir::new().unwrap();
        let (gateway, _rx) = ApprovalGateway::new(tmp.path(), Arc::new(AutoDeny));

        let response = gateway
            .request_write_approval("../escape.txt", "content")
            .await;
        assert!(!response.approved);
        assert!(response.is_fallback());
    }

    #[tokio::test]
    async fn test_preview_applies_only_approved_hunks() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("f.txt"), "A\nB\nC").unwrap();
        let (gateway, mut rx) = test_gateway(&tmp);

        let (_handle, id) = spawn_write(&gateway, &mut rx, "f.txt", "A\nX\nC").await;
        let request = gateway.get_pending_request(&id).await.unwrap();
        let hunk_id = request.diff.hunks[0].id.clone();

        let all: BTreeSet<String> = [hunk_id].into_iter().collect();
        assert_eq!(gateway.preview(&id, &all).await.as_deref(), Some("A\nX\nC"));
        assert_eq!(
            gateway.preview(&id, &BTreeSet::new()).await.as_deref(),
            Some("A\nB\nC")
        );
        // Preview never consumed the request.
        assert!(gateway.get_pending_request(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_preview_request_message_emits_result() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("f.txt"), "A\nB\nC").unwrap();
        let (gateway, mut rx) = test_gateway(&tmp);

        let (_handle, id) = spawn_write(&gateway, &mut rx, "f.txt", "A\nX\nC").await;

        gateway
            .handle_surface_message(SurfaceToGateway::RequestPreview {
                request_id: id.clone(),
                approved_hunks: BTreeSet::new(),
            })
            .await;

        let message = rx.recv().await.unwrap();
        let GatewayToSurface::PreviewResult {
            request_id,
            preview_content,
        } = message
        else {
            panic!("expected previewResult, got {:?}", message);
        };
        assert_eq!(request_id, id);
        assert_eq!(preview_content, "A\nB\nC");
    }

    #[tokio::test]
    async fn test_unknown_hunk_ids_are_filtered_from_response() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("f.txt"), "A\nB\nC").unwrap();
        let (gateway, mut rx) = test_gateway(&tmp);

        let (handle, id) = spawn_write(&gateway, &mut rx, "f.txt", "A\nX\nC").await;
        let request = gateway.get_pending_request(&id).await.unwrap();
        let hunk_id = request.diff.hunks[0].id.clone();

        let mut hunks: BTreeSet<String> = BTreeSet::new();
        hunks.insert(hunk_id.clone());
        hunks.insert("hunk-bogus".to_string());
        gateway
            .handle_approval_response(ApprovalResponse::partial(&id, hunks))
            .await;

        let response = handle.await.unwrap();
        let approved = response.approved_hunks.unwrap();
        assert!(approved.contains(&hunk_id));
        assert!(!approved.contains("hunk-bogus"));
    }

    #[tokio::test]
    async fn test_ready_reemits_pending_requests() {
        let tmp = TempDir::new().unwrap();
        let (gateway, mut rx) = test_gateway(&tmp);

        let (_h1, id1) = spawn_write(&gateway, &mut rx, "a.txt", "one").await;
        let (_h2, id2) = spawn_write(&gateway, &mut rx, "b.txt", "two").await;

        gateway.handle_surface_message(SurfaceToGateway::Ready).await;

        let mut reemitted = std::collections::HashSet::new();
        for _ in 0..2 {
            let GatewayToSurface::ShowDiff { request } = rx.recv().await.unwrap() else {
                panic!("expected showDiff");
            };
            reemitted.insert(request.id);
        }
        assert!(reemitted.contains(&id1) && reemitted.contains(&id2));
    }

    #[tokio::test]
    async fn test_end_to_end_write_approval() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        let (gateway, mut rx) = test_gateway(&tmp);

        let (handle, id) =
            spawn_write(&gateway, &mut rx, "src/foo.ts", "console.log(1)").await;

        let request = gateway.get_pending_request(&id).await.unwrap();
        assert_eq!(request.diff.hunks.len(), 1);

        gateway
            .handle_surface_message(SurfaceToGateway::ApprovalResponse {
                response: ApprovalResponse::approved(&id),
            })
            .await;

        let response = handle.await.unwrap();
        assert_eq!(response.request_id, id);
        assert!(response.approved);
        assert!(gateway.get_pending_request(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_fallback_never_consulted_when_diff_succeeds() {
        let tmp = TempDir::new().unwrap();
        let fallback = Arc::new(CountingFallback {
            calls: AtomicUsize::new(0),
            approve: true,
        });
        let (gateway, mut rx) = ApprovalGateway::new(tmp.path(), fallback.clone());
        let gateway = Arc::new(gateway);

        let (handle, id) = spawn_write(&gateway, &mut rx, "new.txt", "content").await;
        gateway.cancel_request(&id).await;
        handle.await.unwrap();

        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }
}
