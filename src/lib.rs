//! toolgate: policy-mediated tool-execution gateway for autonomous LLM agents.
//!
//! Every tool call an agent emits passes through the Policy Enforcement
//! Point ([`gateway::ToolGateway`]): arguments are type-validated, taint and
//! canary flags are computed, a risk score is derived, and a tiered Policy
//! Decision Point decides allow / deny / approval-required. Each decision is
//! audited as one JSONL event and counted in the metrics collector.
//!
//! The [`bench`] module drives the same pipeline across the four graduated
//! baselines (B0..B3) over a YAML scenario catalog and produces attack
//! success / leakage / task-success metrics.

pub mod audit;
pub mod bench;
pub mod canary;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod policy;
pub mod risk;
pub mod runtime;
pub mod tools;
pub mod types;
