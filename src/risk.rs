//! Risk scoring: tool → risk class, (class, taint) → numeric score.

use serde::{Deserialize, Serialize};

use crate::tools::ToolName;
use crate::types::Taint;

/// Closed risk classification of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    /// Read-only retrieval tools.
    Read,
    /// Outbound network access.
    Network,
    /// State-changing actions.
    Action,
    /// Anything outside the closed tool set.
    Unknown,
}

impl RiskClass {
    /// Map a registered tool to its risk class.
    pub fn of(tool: ToolName) -> RiskClass {
        match tool {
            ToolName::HttpGet => RiskClass::Network,
            ToolName::CreateTicket => RiskClass::Action,
            ToolName::SearchDocs | ToolName::ReadDoc | ToolName::DbQueryReadonly => RiskClass::Read,
        }
    }

    /// Base score contribution of the class.
    pub fn base_score(self) -> f64 {
        match self {
            RiskClass::Read => 0.2,
            RiskClass::Network => 0.8,
            RiskClass::Action => 0.9,
            RiskClass::Unknown => 1.0,
        }
    }

    /// Network and action classes are high risk.
    pub fn is_high_risk(self) -> bool {
        matches!(self, RiskClass::Network | RiskClass::Action)
    }

    /// Stable string form used in policy input documents.
    pub fn as_str(self) -> &'static str {
        match self {
            RiskClass::Read => "read",
            RiskClass::Network => "network",
            RiskClass::Action => "action",
            RiskClass::Unknown => "unknown",
        }
    }
}

/// Numeric risk score: class base plus taint surcharges, clamped to 1.0.
///
/// Surcharges: +0.05 `from_user`, +0.10 `from_retrieved`,
/// +0.20 `contains_canary`.
pub fn risk_score(class: RiskClass, taint: &Taint) -> f64 {
    let mut score = class.base_score();
    if taint.from_user {
        score += 0.05;
    }
    if taint.from_retrieved {
        score += 0.10;
    }
    if taint.contains_canary {
        score += 0.20;
    }
    score.min(1.0)
}
