//! Integration tests for the two wire protocols.
//!
//! The surface contract is the one wire-level contract in the system:
//! these tests pin the exact `type` tags and camelCase field names, so
//! accidental drift fails loudly instead of silently breaking a surface.

use chrono::Utc;
use diffgate::agent::protocol::{MutationRequest, MutationResponse};
use diffgate::approval::types::{ApprovalKind, ApprovalRequest, ApprovalResponse};
use diffgate::diff::{EditOp, FileDiff, Hunk};
use diffgate::surface::protocol::{GatewayToSurface, SurfaceToGateway};
use std::collections::BTreeSet;

fn sample_request() -> ApprovalRequest {
    let hunk = Hunk {
        id: "hunk-0".to_string(),
        old_start: 1,
        old_lines: vec!["B".to_string()],
        new_lines: vec!["X".to_string()],
    };
    ApprovalRequest {
        id: "req-1722000000000-abcd1234".to_string(),
        kind: ApprovalKind::Write,
        file_path: "src/foo.ts".to_string(),
        diff: FileDiff::new("A\nB\nC".to_string(), "A\nX\nC".to_string(), vec![hunk]),
        original_input: None,
        created_at: Utc::now(),
    }
}

#[test]
fn test_show_diff_wire_shape() {
    let message = GatewayToSurface::ShowDiff {
        request: sample_request(),
    };
    let value: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&message).unwrap()).unwrap();

    assert_eq!(value["type"], "showDiff");
    let request = &value["request"];
    assert_eq!(request["id"], "req-1722000000000-abcd1234");
    assert_eq!(request["type"], "write");
    assert_eq!(request["filePath"], "src/foo.ts");
    // timestamp is ISO-8601
    let ts = request["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    // the diff carries hunks with stable ids and line offsets
    let diff = &request["diff"];
    assert_eq!(diff["oldContent"], "A\nB\nC");
    assert_eq!(diff["newContent"], "A\nX\nC");
    assert_eq!(diff["hunks"][0]["id"], "hunk-0");
    assert_eq!(diff["hunks"][0]["oldStart"], 1);
    assert_eq!(diff["additions"], 1);
    assert_eq!(diff["deletions"], 1);
    // the agent's original input never crosses the wire
    assert!(request.get("originalInput").is_none());
    assert!(request.get("original_input").is_none());
}

#[test]
fn test_preview_result_wire_shape() {
    let message = GatewayToSurface::PreviewResult {
        request_id: "req-1".to_string(),
        preview_content: "A\nX\nC".to_string(),
    };
    let value: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&message).unwrap()).unwrap();

    assert_eq!(value["type"], "previewResult");
    assert_eq!(value["requestId"], "req-1");
    assert_eq!(value["previewContent"], "A\nX\nC");
}

#[test]
fn test_approval_response_wire_shape() {
    let mut hunks = BTreeSet::new();
    hunks.insert("hunk-0".to_string());
    let message = SurfaceToGateway::ApprovalResponse {
        response: ApprovalResponse::partial("req-1", hunks),
    };
    let json = serde_json::to_string(&message).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["type"], "approvalResponse");
    assert_eq!(value["response"]["requestId"], "req-1");
    assert_eq!(value["response"]["approved"], true);
    assert_eq!(value["response"]["approvedHunks"][0], "hunk-0");

    let parsed: SurfaceToGateway = serde_json::from_str(&json).unwrap();
    let SurfaceToGateway::ApprovalResponse { response } = parsed else {
        panic!("wrong variant");
    };
    assert!(response.is_partial());
}

#[test]
fn test_reject_reason_wire_name() {
    let message = SurfaceToGateway::ApprovalResponse {
        response: ApprovalResponse::rejected("req-2", "touches generated code"),
    };
    let value: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&message).unwrap()).unwrap();

    assert_eq!(value["response"]["rejectReason"], "touches generated code");
    assert!(value["response"].get("approvedHunks").is_none());
}

#[test]
fn test_request_preview_and_cancel_wire_shapes() {
    let mut hunks = BTreeSet::new();
    hunks.insert("hunk-1".to_string());
    let preview = SurfaceToGateway::RequestPreview {
        request_id: "req-3".to_string(),
        approved_hunks: hunks,
    };
    let value: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&preview).unwrap()).unwrap();
    assert_eq!(value["type"], "requestPreview");
    assert_eq!(value["requestId"], "req-3");
    assert_eq!(value["approvedHunks"][0], "hunk-1");

    let cancel = SurfaceToGateway::CancelRequest {
        request_id: "req-3".to_string(),
    };
    let value: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&cancel).unwrap()).unwrap();
    assert_eq!(value["type"], "cancelRequest");
    assert_eq!(value["requestId"], "req-3");
}

#[test]
fn test_ready_wire_shape() {
    let value: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&SurfaceToGateway::Ready).unwrap()).unwrap();
    assert_eq!(value["type"], "ready");

    let parsed: SurfaceToGateway = serde_json::from_str(r#"{"type":"ready"}"#).unwrap();
    assert!(matches!(parsed, SurfaceToGateway::Ready));
}

#[test]
fn test_show_diff_roundtrip() {
    let message = GatewayToSurface::ShowDiff {
        request: sample_request(),
    };
    let json = serde_json::to_string(&message).unwrap();
    let parsed: GatewayToSurface = serde_json::from_str(&json).unwrap();

    let GatewayToSurface::ShowDiff { request } = parsed else {
        panic!("wrong variant");
    };
    assert_eq!(request.kind, ApprovalKind::Write);
    assert_eq!(request.diff.hunks.len(), 1);
    assert_eq!(request.diff.hunks[0].old_lines, vec!["B"]);
}

#[test]
fn test_mutation_request_serialization() {
    let request = MutationRequest {
        request_id: "req-001".to_string(),
        kind: ApprovalKind::Write,
        path: "src/main.rs".to_string(),
        content: Some("fn main() {}".to_string()),
        edits: None,
    };

    let json = serde_json::to_string(&request).unwrap();
    let parsed: MutationRequest = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.request_id, "req-001");
    assert_eq!(parsed.kind, ApprovalKind::Write);
    assert_eq!(parsed.path, "src/main.rs");
    assert_eq!(parsed.content.as_deref(), Some("fn main() {}"));
}

#[test]
fn test_mutation_request_with_edits() {
    let request = MutationRequest {
        request_id: "req-002".to_string(),
        kind: ApprovalKind::Edit,
        path: "src/lib.rs".to_string(),
        content: None,
        edits: Some(vec![EditOp::replace(1, 2, "replacement")]),
    };

    let json = serde_json::to_string(&request).unwrap();
    let parsed: MutationRequest = serde_json::from_str(&json).unwrap();

    let edits = parsed.edits.unwrap();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].start_line, 1);
    assert_eq!(edits[0].end_line, 2);
    assert_eq!(edits[0].new_text, "replacement");
}

#[test]
fn test_mutation_response_rejected() {
    let response = MutationResponse::rejected("req-002".to_string(), "Rejected by reviewer");
    let json = serde_json::to_string(&response).unwrap();
    let parsed: MutationResponse = serde_json::from_str(&json).unwrap();

    assert!(!parsed.approved);
    assert_eq!(parsed.error.as_deref(), Some("Rejected by reviewer"));
    assert!(parsed.content.is_none());
}
