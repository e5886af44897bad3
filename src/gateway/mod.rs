//! Policy Enforcement Point: the per-request gate every tool call passes
//! through.
//!
//! Lifecycle per request: tool lookup, schema validation, taint and risk
//! analysis, baseline dispatch, conditional execution, then exactly one
//! audit event and one metrics update. A request with a rejecting decision
//! never reaches the executor. Validation and policy outcomes are recovered
//! into [`ToolCallResult`]; PDP and audit-sink failures surface as
//! [`GatewayError`], never as a silent allow.

pub mod pdp;

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use crate::audit::{wall_clock_seconds, AuditError, AuditEvent, AuditLogger};
use crate::canary::detect_canary;
use crate::gateway::pdp::{EnvInput, PdpError, PdpInput, PolicyDecisionPoint, RiskInput};
use crate::metrics::MetricsCollector;
use crate::policy::{urlcheck, PolicyMeta};
use crate::risk::{risk_score, RiskClass};
use crate::tools::registry::ToolRegistry;
use crate::tools::ToolArgs;
use crate::types::{Baseline, Taint, ToolCallRequest, ToolCallResult};

/// Infrastructure failures the gateway cannot recover into a result.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The policy decision point failed or returned garbage.
    #[error("policy decision failure: {0}")]
    Pdp(#[from] PdpError),
    /// The audit sink rejected the event write.
    #[error("audit emit failure: {0}")]
    Audit(#[from] AuditError),
}

/// The Policy Enforcement Point.
pub struct ToolGateway {
    registry: Arc<ToolRegistry>,
    pdp: Arc<dyn PolicyDecisionPoint>,
    audit: Arc<AuditLogger>,
    metrics: Arc<MetricsCollector>,
    policy_meta: Arc<PolicyMeta>,
}

impl ToolGateway {
    /// Assemble a gateway over its collaborators. The policy metadata
    /// snapshot is fixed for the life of the gateway.
    pub fn new(
        registry: Arc<ToolRegistry>,
        pdp: Arc<dyn PolicyDecisionPoint>,
        audit: Arc<AuditLogger>,
        metrics: Arc<MetricsCollector>,
        policy_meta: Arc<PolicyMeta>,
    ) -> Self {
        Self {
            registry,
            pdp,
            audit,
            metrics,
            policy_meta,
        }
    }

    /// Decide and (when allowed) execute one tool call.
    pub async fn execute(
        &self,
        req: &ToolCallRequest,
        canaries: &[String],
    ) -> Result<ToolCallResult, GatewayError> {
        let started = Instant::now();

        // Step 1: lookup against the closed tool set.
        let tool = match self.registry.lookup(&req.tool) {
            Ok(tool) => tool,
            Err(_) => {
                let res = ToolCallResult::denied(&req.tool, "tool_not_registered");
                self.finish(req, &res, 0.0, None, None, started)?;
                return Ok(res);
            }
        };

        // Step 2: schema validation.
        let args = match self.registry.parse(tool, &req.args) {
            Ok(args) => args,
            Err(e) => {
                let res = ToolCallResult::denied(&req.tool, &e.to_string());
                self.finish(req, &res, 0.0, None, None, started)?;
                return Ok(res);
            }
        };
        let args_value = args.to_value();

        // Step 3: taint and risk. The effective canary flag is never weaker
        // than the caller-declared one.
        let contains_canary =
            req.meta.taint.contains_canary || detect_canary(&args_value, canaries);
        let taint = Taint {
            contains_canary,
            ..req.meta.taint
        };
        let class = RiskClass::of(tool);
        let score = risk_score(class, &taint);

        // Step 4: baseline dispatch.
        match req.meta.baseline {
            Baseline::B0 | Baseline::B1 => {
                let res = self.run_tool(&req.tool, &args, "baseline_permissive").await;
                self.finish(req, &res, score, Some(contains_canary), None, started)?;
                Ok(res)
            }
            Baseline::B2 => {
                if contains_canary {
                    let res = ToolCallResult::denied(&req.tool, "canary_detected");
                    self.finish(req, &res, score, Some(contains_canary), None, started)?;
                    return Ok(res);
                }

                if let ToolArgs::HttpGet(http_args) = &args {
                    let host = urlcheck::host_of(&http_args.url).unwrap_or_default();
                    if !urlcheck::host_matches(&host, &self.registry.allowed_domains()) {
                        let res = ToolCallResult::denied(&req.tool, "domain_not_allowlisted");
                        self.finish(req, &res, score, Some(contains_canary), None, started)?;
                        return Ok(res);
                    }
                }

                if let ToolArgs::CreateTicket(ticket_args) = &args {
                    if !self
                        .registry
                        .allowed_ticket_projects()
                        .iter()
                        .any(|p| p == &ticket_args.project)
                    {
                        let res = ToolCallResult::denied(&req.tool, "ticket_project_not_allowed");
                        self.finish(req, &res, score, Some(contains_canary), None, started)?;
                        return Ok(res);
                    }
                }

                let res = self.run_tool(&req.tool, &args, "simple_checks_passed").await;
                self.finish(req, &res, score, Some(contains_canary), None, started)?;
                Ok(res)
            }
            Baseline::B3 => {
                let pdp_input = PdpInput {
                    scenario_id: req.meta.scenario_id.clone(),
                    baseline: req.meta.baseline,
                    tool: req.tool.clone(),
                    args: args_value.clone(),
                    taint,
                    risk: RiskInput {
                        tool_risk: class.as_str().to_owned(),
                        high_risk_action: class.is_high_risk(),
                        risk_score: score,
                    },
                    env: EnvInput {
                        allowed_domains: self.registry.allowed_domains(),
                        allowed_ticket_projects: self.registry.allowed_ticket_projects(),
                    },
                    ablation: req.meta.ablation,
                };

                let decision = self.pdp.decide(&pdp_input).await?;
                let snapshot = serde_json::to_value(&pdp_input).ok();

                let res = if decision.allow {
                    self.run_tool(&req.tool, &args, &decision.reason).await
                } else if decision.requires_approval {
                    ToolCallResult::approval_required(&req.tool, args_value, &decision.reason)
                } else {
                    ToolCallResult::denied(&req.tool, &decision.reason)
                };
                self.finish(req, &res, score, Some(contains_canary), snapshot, started)?;
                Ok(res)
            }
        }
    }

    /// Invoke the executor for an allowed call; backend failures become
    /// denied results carrying the backend code.
    async fn run_tool(&self, tool: &str, args: &ToolArgs, reason: &str) -> ToolCallResult {
        match self.registry.execute(args).await {
            Ok(output) => ToolCallResult::allowed(tool, output, reason),
            Err(e) => {
                debug!(%tool, code = %e.code, "executor failure converted to denial");
                ToolCallResult::denied_with_message(tool, &e.code, &e.message)
            }
        }
    }

    /// Emit the audit event and update metrics. Latency runs from intake to
    /// just before emit.
    fn finish(
        &self,
        req: &ToolCallRequest,
        res: &ToolCallResult,
        score: f64,
        contains_canary: Option<bool>,
        pdp_input: Option<serde_json::Value>,
        started: Instant,
    ) -> Result<(), GatewayError> {
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let event = AuditEvent {
            ts: wall_clock_seconds(),
            scenario_id: req.meta.scenario_id.clone(),
            baseline: req.meta.baseline,
            step: req.meta.step,
            request_id: req.meta.request_id.clone(),
            correlation_id: req.meta.correlation_id.clone(),
            tool: req.tool.clone(),
            args: req.args.clone(),
            decision: res.status().to_owned(),
            reason: res.reason().to_owned(),
            policy_id: self.policy_meta.policy_id.clone(),
            policy_version: self.policy_meta.policy_version.clone(),
            policy_hash: self.policy_meta.policy_hash.clone(),
            risk_score: score,
            requires_approval: res.policy().requires_approval,
            latency_ms,
            contains_canary,
            pdp_input,
        };
        self.audit.emit(&event)?;

        self.metrics.record_decision(res.status());
        self.metrics.record_tool_call(&req.tool);
        self.metrics.observe_latency(&req.tool, latency_ms);
        Ok(())
    }
}
