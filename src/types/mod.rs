//! Shared request and response types for the tool gateway.
//!
//! A [`ToolCallRequest`] is immutable for the lifetime of one decision. The
//! terminal [`ToolCallResult`] is one of `allowed`, `denied`, or
//! `approval_required`; approval is a terminal response here; resolution
//! happens out of band.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Baselines ───────────────────────────────────────────────────

/// Defense baseline. B0 and B1 differ only in caller-side prompting; the
/// gateway treats them identically. B2 adds inline checks, B3 delegates to
/// the full policy rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Baseline {
    /// No defenses; unconditional allow.
    B0,
    /// Prompt-hardened caller; gateway behavior identical to B0.
    B1,
    /// Inline canary / domain / project checks.
    B2,
    /// Full tiered policy decision.
    B3,
}

impl Baseline {
    /// All baselines in benchmark sweep order.
    pub const ALL: [Baseline; 4] = [Baseline::B0, Baseline::B1, Baseline::B2, Baseline::B3];

    /// Stable string form used in audit events and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Baseline::B0 => "B0",
            Baseline::B1 => "B1",
            Baseline::B2 => "B2",
            Baseline::B3 => "B3",
        }
    }
}

impl fmt::Display for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a baseline name outside `B0..B3`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown baseline: {0}")]
pub struct UnknownBaseline(#[doc = "The rejected name."] pub String);

impl FromStr for Baseline {
    type Err = UnknownBaseline;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "B0" => Ok(Baseline::B0),
            "B1" => Ok(Baseline::B1),
            "B2" => Ok(Baseline::B2),
            "B3" => Ok(Baseline::B3),
            other => Err(UnknownBaseline(other.to_owned())),
        }
    }
}

// ── Taint & ablation ────────────────────────────────────────────

/// Provenance labels carried per request.
///
/// `contains_canary` as seen by the policy is never weaker than the
/// caller-declared value: the gateway ORs it with its own detector output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Taint {
    /// Request derives from untrusted end-user input.
    pub from_user: bool,
    /// Request derives from retrieved content (indirect-injection surface).
    pub from_retrieved: bool,
    /// A known honeytoken appears in the argument payload.
    pub contains_canary: bool,
}

/// Named subsets of the B3 rule set that can be disabled for a run, to
/// measure each rule's contribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ablation {
    /// Skip the canary deny rule.
    pub disable_canary: bool,
    /// Skip the per-domain URL path allowlist.
    pub disable_path_allowlist: bool,
    /// Skip the ticket body size limit.
    pub disable_ticket_size: bool,
    /// Skip the indirect-injection approval rule.
    pub disable_taint_approvals: bool,
    /// Skip the action-class approval rule.
    pub disable_approvals: bool,
}

// ── Requests ────────────────────────────────────────────────────

/// Per-request metadata attached at intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestMeta {
    /// Active defense baseline.
    pub baseline: Baseline,
    /// Benchmark scenario id, if the request belongs to a scenario run.
    pub scenario_id: Option<String>,
    /// Step index within the run, starting at 1.
    pub step: u32,
    /// Run-scoped correlation id shared by all steps of one run.
    pub correlation_id: String,
    /// Gateway-scoped request id.
    pub request_id: String,
    /// Caller-declared taint labels.
    pub taint: Taint,
    /// Active ablation toggles.
    pub ablation: Ablation,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self {
            baseline: Baseline::B3,
            scenario_id: None,
            step: 1,
            correlation_id: String::new(),
            request_id: String::new(),
            taint: Taint::default(),
            ablation: Ablation::default(),
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A tool-call request as emitted by the agent. Immutable per decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Tool name; validated against the closed registry set.
    pub tool: String,
    /// Raw argument object; shape constrained by the tool's schema.
    #[serde(default = "empty_object")]
    pub args: serde_json::Value,
    /// Intake metadata.
    #[serde(default)]
    pub meta: RequestMeta,
}

// ── Results ─────────────────────────────────────────────────────

/// Policy verdict attached to every terminal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyInfo {
    /// Whether the call was allowed to execute.
    pub allow: bool,
    /// Whether execution is held pending out-of-band approval.
    pub requires_approval: bool,
    /// Reason code for the decision.
    pub reason: String,
}

impl Default for PolicyInfo {
    fn default() -> Self {
        Self {
            allow: false,
            requires_approval: false,
            reason: "no_reason".to_owned(),
        }
    }
}

/// Structured error carried on a denied result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenialError {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable reason.
    pub message: String,
}

/// Validated arguments echoed back on an approval-required result so the
/// approver sees exactly what would run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    /// The validated argument object of the held call.
    pub proposed_action: serde_json::Value,
}

/// Terminal response for one tool-call decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolCallResult {
    /// The call executed; carries the tool output.
    Allowed {
        /// Tool name as requested.
        tool: String,
        /// Tool output object.
        result: serde_json::Value,
        /// Policy verdict (`allow = true`).
        policy: PolicyInfo,
    },
    /// The call was rejected before execution.
    Denied {
        /// Tool name as requested.
        tool: String,
        /// Structured denial.
        error: DenialError,
        /// Policy verdict (`allow = false`).
        policy: PolicyInfo,
    },
    /// The call is held for out-of-band approval.
    ApprovalRequired {
        /// Tool name as requested.
        tool: String,
        /// The validated args that would execute on approval.
        result: ProposedAction,
        /// Policy verdict (`requires_approval = true`).
        policy: PolicyInfo,
    },
}

impl ToolCallResult {
    /// Build an `allowed` result.
    pub fn allowed(tool: &str, result: serde_json::Value, reason: &str) -> Self {
        ToolCallResult::Allowed {
            tool: tool.to_owned(),
            result,
            policy: PolicyInfo {
                allow: true,
                requires_approval: false,
                reason: reason.to_owned(),
            },
        }
    }

    /// Build a `denied` result whose error code equals the reason code.
    pub fn denied(tool: &str, reason: &str) -> Self {
        Self::denied_with_message(tool, reason, reason)
    }

    /// Build a `denied` result with a distinct human-readable message.
    pub fn denied_with_message(tool: &str, reason: &str, message: &str) -> Self {
        ToolCallResult::Denied {
            tool: tool.to_owned(),
            error: DenialError {
                code: "POLICY_DENY".to_owned(),
                message: message.to_owned(),
            },
            policy: PolicyInfo {
                allow: false,
                requires_approval: false,
                reason: reason.to_owned(),
            },
        }
    }

    /// Build an `approval_required` result carrying the proposed action.
    pub fn approval_required(tool: &str, proposed_action: serde_json::Value, reason: &str) -> Self {
        ToolCallResult::ApprovalRequired {
            tool: tool.to_owned(),
            result: ProposedAction { proposed_action },
            policy: PolicyInfo {
                allow: false,
                requires_approval: true,
                reason: reason.to_owned(),
            },
        }
    }

    /// Stable status string as serialized (`allowed` / `denied` /
    /// `approval_required`).
    pub fn status(&self) -> &'static str {
        match self {
            ToolCallResult::Allowed { .. } => "allowed",
            ToolCallResult::Denied { .. } => "denied",
            ToolCallResult::ApprovalRequired { .. } => "approval_required",
        }
    }

    /// The policy verdict of this result.
    pub fn policy(&self) -> &PolicyInfo {
        match self {
            ToolCallResult::Allowed { policy, .. }
            | ToolCallResult::Denied { policy, .. }
            | ToolCallResult::ApprovalRequired { policy, .. } => policy,
        }
    }

    /// Reason code of the decision.
    pub fn reason(&self) -> &str {
        &self.policy().reason
    }

    /// True when the call executed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, ToolCallResult::Allowed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_round_trip() {
        for b in Baseline::ALL {
            let parsed: Baseline = b.as_str().parse().expect("parse");
            assert_eq!(parsed, b);
        }
        assert!("B4".parse::<Baseline>().is_err());
    }

    #[test]
    fn test_result_status_tag() {
        let res = ToolCallResult::denied("http_get", "domain_not_allowlisted");
        let value = serde_json::to_value(&res).expect("serialize");
        assert_eq!(value["status"], "denied");
        assert_eq!(value["policy"]["reason"], "domain_not_allowlisted");
        assert_eq!(value["error"]["code"], "POLICY_DENY");

        let back: ToolCallResult = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, res);
    }

    #[test]
    fn test_approval_result_carries_proposed_action() {
        let args = serde_json::json!({"project": "SEC", "title": "T", "body": "b"});
        let res = ToolCallResult::approval_required("create_ticket", args.clone(), "approval_required_action");
        assert_eq!(res.status(), "approval_required");
        assert!(res.policy().requires_approval);
        match res {
            ToolCallResult::ApprovalRequired { result, .. } => {
                assert_eq!(result.proposed_action, args);
            }
            other => panic!("expected approval_required, got {}", other.status()),
        }
    }

    #[test]
    fn test_request_meta_defaults() {
        let req: ToolCallRequest =
            serde_json::from_value(serde_json::json!({"tool": "read_doc"})).expect("parse");
        assert_eq!(req.meta.baseline, Baseline::B3);
        assert_eq!(req.meta.step, 1);
        assert!(!req.meta.taint.from_user);
        assert!(req.args.is_object());
    }
}
