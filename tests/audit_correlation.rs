#![allow(missing_docs)]
// Audit trail: every gateway invocation appends exactly one event, events
// carry the correlation and policy identity, and metrics move in step.

mod common;

use common::{canaries, from_user, harness, http_request, meta_b3, ticket_request};
use toolgate::types::{Ablation, ToolCallRequest};

#[tokio::test]
async fn test_audit_includes_correlation_and_policy_identity() {
    let h = harness();
    let mut req = ToolCallRequest {
        tool: "read_doc".to_owned(),
        args: serde_json::json!({"doc_id": "refund_policy"}),
        meta: meta_b3(from_user(), Ablation::default()),
    };
    req.meta.correlation_id = "run-test-123".to_owned();
    req.meta.scenario_id = Some("TEST-CORR".to_owned());

    let res = h.gateway.execute(&req, &canaries()).await.expect("execute");
    assert_eq!(res.status(), "allowed");

    let events = h.audit_lines();
    assert_eq!(events.len(), 1, "expected exactly one audit event");
    let event = &events[0];
    assert_eq!(event["correlation_id"], "run-test-123");
    assert_eq!(event["scenario_id"], "TEST-CORR");
    assert_eq!(event["decision"], "allowed");
    assert_eq!(event["policy_id"], "agent-policy");
    assert_eq!(event["policy_version"], "1.1.0");
    assert_eq!(event["policy_hash"].as_str().expect("hash").len(), 64);
    assert!(event["risk_score"].as_f64().expect("risk") > 0.0);
    assert!(event["latency_ms"].as_f64().expect("latency") >= 0.0);
}

#[tokio::test]
async fn test_exactly_one_event_per_invocation() {
    let h = harness();

    // Allowed, denied, approval-required, lookup failure, schema failure:
    // one event each.
    let requests = vec![
        http_request("https://api.company.tld/status", from_user(), Ablation::default()),
        http_request("https://evil.tld/x", from_user(), Ablation::default()),
        ticket_request("SEC", "Hello", from_user(), Ablation::default()),
        ToolCallRequest {
            tool: "rm_rf".to_owned(),
            args: serde_json::json!({}),
            meta: meta_b3(from_user(), Ablation::default()),
        },
        ToolCallRequest {
            tool: "read_doc".to_owned(),
            args: serde_json::json!({}),
            meta: meta_b3(from_user(), Ablation::default()),
        },
    ];

    let mut expected = Vec::new();
    for req in &requests {
        let res = h.gateway.execute(req, &canaries()).await.expect("execute");
        expected.push(res.status().to_owned());
    }

    let events = h.audit_lines();
    assert_eq!(events.len(), requests.len());
    for (event, status) in events.iter().zip(&expected) {
        assert_eq!(event["decision"].as_str().expect("decision"), status);
    }
}

#[tokio::test]
async fn test_b3_event_carries_pdp_input_snapshot() {
    let h = harness();
    let req = http_request("https://api.company.tld/status", from_user(), Ablation::default());
    h.gateway.execute(&req, &canaries()).await.expect("execute");

    let events = h.audit_lines();
    let snapshot = &events[0]["pdp_input"];
    assert_eq!(snapshot["tool"], "http_get");
    assert_eq!(snapshot["risk"]["tool_risk"], "network");
    assert_eq!(snapshot["env"]["allowed_domains"][0], "api.company.tld");
    assert_eq!(events[0]["contains_canary"], false);
}

#[tokio::test]
async fn test_metrics_move_with_decisions() {
    let h = harness();

    let req = http_request("https://api.company.tld/status", from_user(), Ablation::default());
    h.gateway.execute(&req, &canaries()).await.expect("execute");
    let req = http_request("https://evil.tld/x", from_user(), Ablation::default());
    h.gateway.execute(&req, &canaries()).await.expect("execute");

    let text = h.metrics.render_prometheus();
    assert!(text.contains("tool_gateway_decisions_total{decision=\"allowed\"} 1"));
    assert!(text.contains("tool_gateway_decisions_total{decision=\"denied\"} 1"));
    assert!(text.contains("tool_gateway_tool_calls_total{tool=\"http_get\"} 2"));
    assert!(text.contains("tool_gateway_latency_ms_bucket{tool=\"http_get\""));
}
