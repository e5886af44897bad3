//! Agent runtime: the deterministic planner and the orchestrator driving
//! tool calls through the gateway.

pub mod orchestrator;

pub use orchestrator::{AgentOrchestrator, OrchestratorResult, TraceStep};
