#![allow(dead_code)]
// Shared fixtures for the gateway integration suites.

use std::path::PathBuf;
use std::sync::Arc;

use toolgate::audit::AuditLogger;
use toolgate::gateway::pdp::LocalPdp;
use toolgate::gateway::ToolGateway;
use toolgate::metrics::MetricsCollector;
use toolgate::policy::{PolicyData, PolicyMeta};
use toolgate::tools::docs::DocStore;
use toolgate::tools::http_mock::HttpMock;
use toolgate::tools::registry::ToolRegistry;
use toolgate::tools::tickets::TicketStore;
use toolgate::types::{Ablation, Baseline, RequestMeta, Taint, ToolCallRequest};

pub const CANARIES: [&str; 2] = ["CANARY_KEY_001", "CANARY_KEY_002"];

pub fn canaries() -> Vec<String> {
    CANARIES.iter().map(|c| (*c).to_owned()).collect()
}

/// A fully wired gateway over the embedded policy engine and mock adapter,
/// auditing into a temp file.
pub struct TestHarness {
    pub gateway: Arc<ToolGateway>,
    pub registry: Arc<ToolRegistry>,
    pub docs: Arc<DocStore>,
    pub metrics: Arc<MetricsCollector>,
    pub audit_path: PathBuf,
    _tmp: tempfile::TempDir,
}

impl TestHarness {
    pub fn audit_lines(&self) -> Vec<serde_json::Value> {
        let contents = std::fs::read_to_string(&self.audit_path).unwrap_or_default();
        contents
            .lines()
            .map(|line| serde_json::from_str(line).expect("audit line is valid json"))
            .collect()
    }
}

pub fn harness() -> TestHarness {
    let tmp = tempfile::tempdir().expect("tempdir");
    let audit_path = tmp.path().join("audit.jsonl");

    let docs = Arc::new(DocStore::new());
    let registry = Arc::new(ToolRegistry::new(
        docs.clone(),
        Arc::new(HttpMock::new()),
        Arc::new(TicketStore::new()),
    ));
    registry.set_allowed_domains(vec![
        "api.company.tld".to_owned(),
        "docs.company.tld".to_owned(),
    ]);
    registry.set_allowed_ticket_projects(vec!["SEC".to_owned(), "IT".to_owned()]);

    let metrics = Arc::new(MetricsCollector::new());
    let gateway = Arc::new(ToolGateway::new(
        registry.clone(),
        Arc::new(LocalPdp::new(PolicyData::default())),
        Arc::new(AuditLogger::new(&audit_path).expect("audit sink")),
        metrics.clone(),
        Arc::new(PolicyMeta {
            policy_id: "agent-policy".to_owned(),
            policy_version: "1.1.0".to_owned(),
            policy_hash: "f".repeat(64),
        }),
    ));

    TestHarness {
        gateway,
        registry,
        docs,
        metrics,
        audit_path,
        _tmp: tmp,
    }
}

pub fn meta_b3(taint: Taint, ablation: Ablation) -> RequestMeta {
    RequestMeta {
        baseline: Baseline::B3,
        scenario_id: Some("TEST".to_owned()),
        step: 1,
        correlation_id: "run-test".to_owned(),
        request_id: "req-test".to_owned(),
        taint,
        ablation,
    }
}

pub fn from_user() -> Taint {
    Taint {
        from_user: true,
        ..Taint::default()
    }
}

pub fn from_retrieved() -> Taint {
    Taint {
        from_retrieved: true,
        ..Taint::default()
    }
}

pub fn http_request(url: &str, taint: Taint, ablation: Ablation) -> ToolCallRequest {
    ToolCallRequest {
        tool: "http_get".to_owned(),
        args: serde_json::json!({"url": url}),
        meta: meta_b3(taint, ablation),
    }
}

pub fn ticket_request(project: &str, body: &str, taint: Taint, ablation: Ablation) -> ToolCallRequest {
    ToolCallRequest {
        tool: "create_ticket".to_owned(),
        args: serde_json::json!({"project": project, "title": "T", "body": body}),
        meta: meta_b3(taint, ablation),
    }
}
