//! HTTP egress capability.
//!
//! The registry holds this interface, not a concrete client, so the
//! deterministic mock and the hardened real adapter are interchangeable.
//! The registry mirrors its domain allowlist into the adapter whenever the
//! allowlist changes.

use async_trait::async_trait;

use crate::tools::ToolError;

/// Backend for the `http_get` tool.
#[async_trait]
pub trait HttpAdapter: Send + Sync {
    /// Perform a GET and return `{status_code, body, headers}`.
    async fn get(&self, url: &str) -> Result<serde_json::Value, ToolError>;

    /// Mirror the registry's domain allowlist into the adapter. Adapters
    /// without host policy ignore this.
    fn set_allowed_domains(&self, domains: &[String]);
}
