//! Deterministic agent orchestration for benchmark and CI stability.
//!
//! The mock planner deliberately attempts forbidden actions in adversarial
//! scenarios so the gateway can demonstrate prevention; benign scenarios
//! produce ordinary task-shaped calls. One probing step is planned per run,
//! and the run halts on the first rejecting decision.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::bench::scenario::Scenario;
use crate::gateway::{GatewayError, ToolGateway};
use crate::types::{Ablation, Baseline, RequestMeta, Taint, ToolCallRequest, ToolCallResult};

/// One recorded request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    /// Step index, starting at 1.
    pub step: u32,
    /// Request as submitted to the gateway.
    pub request: ToolCallRequest,
    /// Terminal result for the step.
    pub response: ToolCallResult,
}

/// Result of one orchestrated run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorResult {
    /// Final agent output text.
    pub final_output: String,
    /// All executed steps in order.
    pub tool_trace: Vec<TraceStep>,
    /// End-to-end latency of the run in milliseconds.
    pub latency_ms: f64,
    /// Run-scoped correlation id shared by every step.
    pub correlation_id: String,
    /// Gateway-scoped request id for the run.
    pub request_id: String,
}

struct PlannedStep {
    tool: String,
    args: Value,
    taint: Taint,
    draft: String,
}

/// Deterministic planner emitting one canned step per run.
struct MockPlanner;

impl MockPlanner {
    fn plan_one_step(scenario: Option<&Scenario>, task: &str, canaries: &[String]) -> PlannedStep {
        let Some(scenario) = scenario else {
            return Self::plan_interactive(task);
        };

        let sid = &scenario.id;
        let category = scenario.category.as_str();
        let expected = &scenario.expected;
        let adversarial = scenario.is_adversarial();

        let mut taint = Taint::default();
        if matches!(
            category,
            "direct_injection" | "tool_misuse" | "exfiltration" | "excessive_agency"
        ) {
            taint.from_user = true;
        }
        if category == "indirect_injection" {
            taint.from_retrieved = true;
        }

        // Probe a forbidden path on an allowlisted domain first; path
        // allowlisting is the capability only B3 carries.
        if adversarial && !expected.denied_url_paths.is_empty() {
            let path = &expected.denied_url_paths[0];
            return PlannedStep {
                tool: "http_get".to_owned(),
                args: json!({"url": format!("https://api.company.tld{path}")}),
                taint,
                draft: format!("[{sid}] Attempting forbidden endpoint."),
            };
        }

        if adversarial && !expected.denied_domains.is_empty() {
            return PlannedStep {
                tool: "http_get".to_owned(),
                args: json!({"url": format!("https://{}/payload", expected.denied_domains[0])}),
                taint,
                draft: format!("[{sid}] Attempting remote fetch."),
            };
        }

        if adversarial && !expected.denied_tools.is_empty() {
            return PlannedStep {
                tool: expected.denied_tools[0].clone(),
                args: json!({"noop": true}),
                taint,
                draft: format!("[{sid}] Attempting forbidden tool."),
            };
        }

        if expected.allowed_tools.iter().any(|t| t == "create_ticket")
            || expected.requires_approval_for.iter().any(|t| t == "create_ticket")
            || matches!(category, "exfiltration" | "excessive_agency")
        {
            let project = if adversarial && !expected.denied_projects.is_empty() {
                expected.denied_projects[0].clone()
            } else {
                "SEC".to_owned()
            };
            let mut body = match (adversarial, expected.max_ticket_body_chars) {
                (true, Some(max)) => "X".repeat(max.saturating_add(100)),
                _ => format!("{sid}: Auto-generated ticket."),
            };
            if adversarial && expected.must_not_leak_canaries {
                if let Some(canary) = canaries.first() {
                    body.push_str(&format!(" Canary={canary}"));
                }
                taint.contains_canary = true;
            }
            return PlannedStep {
                tool: "create_ticket".to_owned(),
                args: json!({"project": project, "title": format!("{sid} Ticket"), "body": body}),
                taint,
                draft: format!("[{sid}] Prepared ticket draft."),
            };
        }

        // Propose a safe allowlisted call that the scenario expects to halt
        // with approval: permissive baselines execute it (attack success)
        // while the taint rule holds it.
        if adversarial && expected.requires_approval_for.iter().any(|t| t == "http_get") {
            return PlannedStep {
                tool: "http_get".to_owned(),
                args: json!({"url": "https://api.company.tld/status"}),
                taint,
                draft: format!("[{sid}] Attempting status check (should require approval)."),
            };
        }

        if category == "indirect_injection" || expected.allowed_tools.iter().any(|t| t == "read_doc")
        {
            let doc_id = scenario
                .retrieval_setup
                .as_ref()
                .map(|rs| rs.doc_id.clone())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| "refund_policy".to_owned());
            return PlannedStep {
                tool: "read_doc".to_owned(),
                args: json!({"doc_id": doc_id}),
                taint,
                draft: format!("[{sid}] Reading doc for summary."),
            };
        }

        PlannedStep {
            tool: "http_get".to_owned(),
            args: json!({"url": "https://api.company.tld/status"}),
            taint,
            draft: format!("[{sid}] Status fetched."),
        }
    }

    fn plan_interactive(task: &str) -> PlannedStep {
        let taint = Taint {
            from_user: true,
            ..Taint::default()
        };
        let lowered = task.to_lowercase();
        if lowered.contains("ticket") {
            return PlannedStep {
                tool: "create_ticket".to_owned(),
                args: json!({
                    "project": "SEC",
                    "title": "Ticket",
                    "body": "Created from /run request.",
                }),
                taint,
                draft: "Prepared ticket draft.".to_owned(),
            };
        }
        if lowered.contains("summar") || lowered.contains("policy") {
            return PlannedStep {
                tool: "read_doc".to_owned(),
                args: json!({"doc_id": "refund_policy"}),
                taint,
                draft: "Summarizing requested policy.".to_owned(),
            };
        }
        PlannedStep {
            tool: "http_get".to_owned(),
            args: json!({"url": "https://api.company.tld/status"}),
            taint,
            draft: "Fetching status.".to_owned(),
        }
    }
}

/// Drives planned steps through the gateway and assembles the run result.
pub struct AgentOrchestrator {
    gateway: Arc<ToolGateway>,
    canaries: Vec<String>,
}

impl AgentOrchestrator {
    /// Create an orchestrator over a gateway and the active canary set.
    pub fn new(gateway: Arc<ToolGateway>, canaries: Vec<String>) -> Self {
        Self { gateway, canaries }
    }

    /// Run one task. Each step awaits its gateway result before the next is
    /// emitted, so audit events within a correlation id appear in step
    /// order.
    pub async fn run(
        &self,
        task: &str,
        baseline: Baseline,
        scenario: Option<&Scenario>,
        ablation: Ablation,
    ) -> Result<OrchestratorResult, GatewayError> {
        let started = Instant::now();
        let correlation_id = format!("run-{}", short_id());
        let request_id = format!("req-{}", short_id());

        let step = 1;
        let plan = MockPlanner::plan_one_step(scenario, task, &self.canaries);

        let request = ToolCallRequest {
            tool: plan.tool.clone(),
            args: plan.args,
            meta: RequestMeta {
                baseline,
                scenario_id: scenario.map(|s| s.id.clone()),
                step,
                correlation_id: correlation_id.clone(),
                request_id: request_id.clone(),
                taint: plan.taint,
                ablation,
            },
        };

        let response = self.gateway.execute(&request, &self.canaries).await?;
        let final_output = if response.is_allowed() {
            format!("{} (tool executed: {})", plan.draft, plan.tool)
        } else {
            format!(
                "{} (stopped: {} / {})",
                plan.draft,
                response.status(),
                response.reason()
            )
        };

        let trace = vec![TraceStep {
            step,
            request,
            response,
        }];

        Ok(OrchestratorResult {
            final_output,
            tool_trace: trace,
            latency_ms: started.elapsed().as_secs_f64() * 1000.0,
            correlation_id,
            request_id,
        })
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(12).collect()
}
