//! Tool registry: schema lookup, argument validation, and execution
//! dispatch.
//!
//! The registry owns the environment allowlists the policy reads at
//! decision time, and mirrors the domain allowlist into the HTTP adapter
//! whenever it changes so the two can never drift.

use std::sync::{Arc, RwLock};

use serde_json::{json, Value};

use crate::tools::adapter::HttpAdapter;
use crate::tools::docs::DocStore;
use crate::tools::tickets::TicketStore;
use crate::tools::{SchemaError, ToolArgs, ToolError, ToolName, UnknownTool};

/// SQL keywords that mark a query as a write.
const WRITE_KEYWORDS: [&str; 4] = ["DROP", "DELETE", "UPDATE", "INSERT"];

const DEFAULT_ALLOWED_DOMAINS: [&str; 2] = ["api.company.tld", "docs.company.tld"];
const DEFAULT_ALLOWED_PROJECTS: [&str; 2] = ["SEC", "IT"];

/// Registry mapping tool names to their schemas and executors.
pub struct ToolRegistry {
    docs: Arc<DocStore>,
    tickets: Arc<TicketStore>,
    http: Arc<dyn HttpAdapter>,
    allowed_domains: RwLock<Vec<String>>,
    allowed_ticket_projects: RwLock<Vec<String>>,
}

impl ToolRegistry {
    /// Create a registry over the given stores and HTTP adapter, with the
    /// default allowlists.
    pub fn new(docs: Arc<DocStore>, http: Arc<dyn HttpAdapter>, tickets: Arc<TicketStore>) -> Self {
        let registry = Self {
            docs,
            tickets,
            http,
            allowed_domains: RwLock::new(
                DEFAULT_ALLOWED_DOMAINS.iter().map(|d| (*d).to_owned()).collect(),
            ),
            allowed_ticket_projects: RwLock::new(
                DEFAULT_ALLOWED_PROJECTS.iter().map(|p| (*p).to_owned()).collect(),
            ),
        };
        registry.sync_http_allowed_domains();
        registry
    }

    /// Resolve a tool name against the closed set.
    pub fn lookup(&self, name: &str) -> Result<ToolName, UnknownTool> {
        name.parse()
    }

    /// Validate raw arguments against the tool's schema.
    pub fn parse(&self, tool: ToolName, raw: &Value) -> Result<ToolArgs, SchemaError> {
        ToolArgs::parse(tool, raw)
    }

    /// Domain allowlist as held at this moment.
    pub fn allowed_domains(&self) -> Vec<String> {
        self.allowed_domains.read().map(|d| d.clone()).unwrap_or_default()
    }

    /// Replace the domain allowlist and mirror it into the HTTP adapter.
    pub fn set_allowed_domains(&self, domains: Vec<String>) {
        if let Ok(mut current) = self.allowed_domains.write() {
            *current = domains;
        }
        self.sync_http_allowed_domains();
    }

    /// Ticket project allowlist as held at this moment.
    pub fn allowed_ticket_projects(&self) -> Vec<String> {
        self.allowed_ticket_projects
            .read()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Replace the ticket project allowlist.
    pub fn set_allowed_ticket_projects(&self, projects: Vec<String>) {
        if let Ok(mut current) = self.allowed_ticket_projects.write() {
            *current = projects;
        }
    }

    fn sync_http_allowed_domains(&self) {
        self.http.set_allowed_domains(&self.allowed_domains());
    }

    /// Invoke the backend for validated arguments.
    pub async fn execute(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        match args {
            ToolArgs::SearchDocs(args) => Ok(self.docs.search(&args.query)),
            ToolArgs::ReadDoc(args) => Ok(self.docs.read(&args.doc_id)),
            ToolArgs::HttpGet(args) => self.http.get(&args.url).await,
            ToolArgs::CreateTicket(args) => {
                Ok(self.tickets.create(&args.project, &args.title, &args.body))
            }
            ToolArgs::DbQueryReadonly(args) => {
                // Executor-level backstop; the policy denies writes upstream.
                let upper = args.sql.to_uppercase();
                if WRITE_KEYWORDS.iter().any(|k| upper.contains(k)) {
                    return Ok(json!({"error": "write_query_denied"}));
                }
                Ok(json!({"rows": [{"count": self.tickets.count()}]}))
            }
        }
    }
}
