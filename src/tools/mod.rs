//! Tool layer: the closed tool set, per-tool argument schemas, backing
//! stores, and the HTTP egress adapters.
//!
//! Each tool declares its argument schema as a plain struct with
//! `deny_unknown_fields`; the registry owns the schema/executor pairing and
//! the environment allowlists the policy reads at decision time.

pub mod adapter;
pub mod docs;
pub mod http_mock;
pub mod http_real;
pub mod registry;
pub mod tickets;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Tool names ──────────────────────────────────────────────────

/// The closed set of tools the gateway mediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    /// Keyword search over the document store.
    SearchDocs,
    /// Read one document by id.
    ReadDoc,
    /// Outbound HTTP GET through the configured adapter.
    HttpGet,
    /// Create a ticket in a project.
    CreateTicket,
    /// Read-only SQL query.
    DbQueryReadonly,
}

impl ToolName {
    /// All registered tools.
    pub const ALL: [ToolName; 5] = [
        ToolName::SearchDocs,
        ToolName::ReadDoc,
        ToolName::HttpGet,
        ToolName::CreateTicket,
        ToolName::DbQueryReadonly,
    ];

    /// Wire name of the tool.
    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::SearchDocs => "search_docs",
            ToolName::ReadDoc => "read_doc",
            ToolName::HttpGet => "http_get",
            ToolName::CreateTicket => "create_ticket",
            ToolName::DbQueryReadonly => "db_query_readonly",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for tool names outside the closed set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("tool '{0}' is not registered")]
pub struct UnknownTool(#[doc = "The rejected name."] pub String);

impl FromStr for ToolName {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search_docs" => Ok(ToolName::SearchDocs),
            "read_doc" => Ok(ToolName::ReadDoc),
            "http_get" => Ok(ToolName::HttpGet),
            "create_ticket" => Ok(ToolName::CreateTicket),
            "db_query_readonly" => Ok(ToolName::DbQueryReadonly),
            other => Err(UnknownTool(other.to_owned())),
        }
    }
}

// ── Argument schemas ────────────────────────────────────────────

/// Arguments for `search_docs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchDocsArgs {
    /// Search query.
    pub query: String,
}

/// Arguments for `read_doc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadDocArgs {
    /// Document identifier.
    pub doc_id: String,
}

/// Arguments for `http_get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpGetArgs {
    /// Target URL.
    pub url: String,
    /// Whether the caller asks to follow redirects; the adapter's own
    /// redirect policy still applies.
    #[serde(default)]
    pub follow_redirects: bool,
}

/// Arguments for `create_ticket`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTicketArgs {
    /// Ticket project key.
    pub project: String,
    /// Ticket title.
    pub title: String,
    /// Ticket body.
    pub body: String,
}

/// Arguments for `db_query_readonly`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbQueryReadonlyArgs {
    /// SQL text; write statements are rejected.
    pub sql: String,
}

/// Schema validation failure with a coarse kind for the reason code.
#[derive(Debug, Error)]
#[error("schema_validation_failed:{kind}")]
pub struct SchemaError {
    /// Failure kind: `missing_field`, `unknown_field`, `invalid_type`, or
    /// `invalid`.
    pub kind: &'static str,
    /// Underlying parser message.
    pub message: String,
}

fn classify(err: &serde_json::Error) -> &'static str {
    let message = err.to_string();
    if message.starts_with("missing field") {
        "missing_field"
    } else if message.starts_with("unknown field") {
        "unknown_field"
    } else if message.starts_with("invalid type") {
        "invalid_type"
    } else {
        "invalid"
    }
}

/// Validated, typed arguments for one tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolArgs {
    /// Validated `search_docs` arguments.
    SearchDocs(SearchDocsArgs),
    /// Validated `read_doc` arguments.
    ReadDoc(ReadDocArgs),
    /// Validated `http_get` arguments.
    HttpGet(HttpGetArgs),
    /// Validated `create_ticket` arguments.
    CreateTicket(CreateTicketArgs),
    /// Validated `db_query_readonly` arguments.
    DbQueryReadonly(DbQueryReadonlyArgs),
}

impl ToolArgs {
    /// Validate a raw argument object against the tool's schema.
    pub fn parse(tool: ToolName, raw: &serde_json::Value) -> Result<ToolArgs, SchemaError> {
        fn typed<T: serde::de::DeserializeOwned>(
            raw: &serde_json::Value,
        ) -> Result<T, SchemaError> {
            serde_json::from_value(raw.clone()).map_err(|e| SchemaError {
                kind: classify(&e),
                message: e.to_string(),
            })
        }

        Ok(match tool {
            ToolName::SearchDocs => ToolArgs::SearchDocs(typed(raw)?),
            ToolName::ReadDoc => ToolArgs::ReadDoc(typed(raw)?),
            ToolName::HttpGet => ToolArgs::HttpGet(typed(raw)?),
            ToolName::CreateTicket => ToolArgs::CreateTicket(typed(raw)?),
            ToolName::DbQueryReadonly => ToolArgs::DbQueryReadonly(typed(raw)?),
        })
    }

    /// The tool these arguments belong to.
    pub fn tool(&self) -> ToolName {
        match self {
            ToolArgs::SearchDocs(_) => ToolName::SearchDocs,
            ToolArgs::ReadDoc(_) => ToolName::ReadDoc,
            ToolArgs::HttpGet(_) => ToolName::HttpGet,
            ToolArgs::CreateTicket(_) => ToolName::CreateTicket,
            ToolArgs::DbQueryReadonly(_) => ToolName::DbQueryReadonly,
        }
    }

    /// The validated arguments as a plain JSON object (for policy input,
    /// canary scanning, and approval echoes).
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

// ── Executor errors ─────────────────────────────────────────────

/// Structured failure from a tool backend. The gateway converts these to
/// denied results, using `code` as the reason.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ToolError {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl ToolError {
    /// Build a tool error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Generic execution failure for a tool, used when the backend supplies
    /// no structured code.
    pub fn execution_failed(tool: ToolName, message: impl Into<String>) -> Self {
        Self {
            code: format!("{tool}_execution_failed"),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_name_round_trip() {
        for tool in ToolName::ALL {
            let parsed: ToolName = tool.as_str().parse().expect("parse");
            assert_eq!(parsed, tool);
        }
        assert!("delete_everything".parse::<ToolName>().is_err());
    }

    #[test]
    fn test_parse_valid_args() {
        let args = ToolArgs::parse(
            ToolName::CreateTicket,
            &json!({"project": "SEC", "title": "T", "body": "b"}),
        )
        .expect("parse");
        assert_eq!(args.tool(), ToolName::CreateTicket);
        assert_eq!(args.to_value()["project"], "SEC");
    }

    #[test]
    fn test_parse_missing_field() {
        let err = ToolArgs::parse(ToolName::CreateTicket, &json!({"project": "SEC"}))
            .expect_err("missing title/body");
        assert_eq!(err.kind, "missing_field");
    }

    #[test]
    fn test_parse_unknown_field() {
        let err = ToolArgs::parse(
            ToolName::ReadDoc,
            &json!({"doc_id": "faq", "extra": true}),
        )
        .expect_err("unknown field");
        assert_eq!(err.kind, "unknown_field");
    }

    #[test]
    fn test_parse_invalid_type() {
        let err = ToolArgs::parse(ToolName::HttpGet, &json!({"url": 42}))
            .expect_err("url must be a string");
        assert_eq!(err.kind, "invalid_type");
    }

    #[test]
    fn test_http_get_default_redirects() {
        let args = ToolArgs::parse(ToolName::HttpGet, &json!({"url": "https://x.tld/"}))
            .expect("parse");
        match args {
            ToolArgs::HttpGet(inner) => assert!(!inner.follow_redirects),
            other => panic!("expected http_get args, got {:?}", other.tool()),
        }
    }
}
