#![allow(missing_docs)]
// Approval gating: action-class approvals, the indirect-injection guard,
// and their ablations.

mod common;

use common::{canaries, from_retrieved, from_user, harness, http_request, ticket_request};
use toolgate::types::Ablation;

#[tokio::test]
async fn test_create_ticket_requires_approval_by_default() {
    let h = harness();
    let req = ticket_request("SEC", "Hello", from_user(), Ablation::default());
    let res = h.gateway.execute(&req, &canaries()).await.expect("execute");
    assert_eq!(res.status(), "approval_required");
    assert!(res.policy().requires_approval);
    assert_eq!(res.reason(), "approval_required_action");
}

#[tokio::test]
async fn test_disable_approvals_allows_create_ticket() {
    let h = harness();
    let req = ticket_request(
        "SEC",
        "Hello",
        from_user(),
        Ablation {
            disable_approvals: true,
            ..Ablation::default()
        },
    );
    let res = h.gateway.execute(&req, &canaries()).await.expect("execute");
    assert_eq!(res.status(), "allowed");
    assert!(res.policy().allow);
}

#[tokio::test]
async fn test_from_retrieved_http_get_requires_approval() {
    // The key indirect-injection control: retrieved provenance plus network
    // risk halts even an allowlisted call.
    let h = harness();
    let req = http_request(
        "https://api.company.tld/status",
        from_retrieved(),
        Ablation::default(),
    );
    let res = h.gateway.execute(&req, &canaries()).await.expect("execute");
    assert_eq!(res.status(), "approval_required");
    assert_eq!(res.reason(), "approval_required_taint_high_risk");
}

#[tokio::test]
async fn test_disable_taint_approvals_allows_from_retrieved_http_get() {
    let h = harness();
    let req = http_request(
        "https://api.company.tld/status",
        from_retrieved(),
        Ablation {
            disable_taint_approvals: true,
            ..Ablation::default()
        },
    );
    let res = h.gateway.execute(&req, &canaries()).await.expect("execute");
    assert_eq!(res.status(), "allowed");
}

#[tokio::test]
async fn test_from_retrieved_read_tool_needs_no_approval() {
    let h = harness();
    let req = toolgate::types::ToolCallRequest {
        tool: "read_doc".to_owned(),
        args: serde_json::json!({"doc_id": "refund_policy"}),
        meta: common::meta_b3(from_retrieved(), Ablation::default()),
    };
    let res = h.gateway.execute(&req, &canaries()).await.expect("execute");
    assert_eq!(res.status(), "allowed");
}

#[tokio::test]
async fn test_deny_short_circuits_over_approval() {
    // A ticket that both leaks a canary and belongs to the approval class
    // must deny, never degrade to approval.
    let h = harness();
    let req = ticket_request(
        "SEC",
        "Here is CANARY_KEY_002",
        from_retrieved(),
        Ablation::default(),
    );
    let res = h.gateway.execute(&req, &canaries()).await.expect("execute");
    assert_eq!(res.status(), "denied");
    assert_eq!(res.reason(), "canary_detected");
    assert!(!res.policy().requires_approval);
}
