//! Environment-driven settings.
//!
//! Values load once at startup from the process environment (a `.env` file
//! is honored when present) into an immutable record; tests inject their
//! own resolver instead of mutating the environment.

use std::str::FromStr;

use crate::types::Baseline;

/// Which `http_get` backend the registry mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpAdapterKind {
    /// Deterministic in-memory response table.
    Mock,
    /// Hardened network adapter.
    Real,
}

/// Immutable settings record.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// External policy engine base URL.
    pub opa_url: String,
    /// Baseline applied when a caller does not specify one.
    pub default_baseline: Baseline,
    /// Audit sink path.
    pub audit_log_path: String,
    /// Selected `http_get` backend.
    pub http_adapter: HttpAdapterKind,
    /// Per-call HTTP timeout in milliseconds.
    pub http_timeout_ms: u64,
    /// Whether the hardened adapter follows redirects.
    pub http_allow_redirects: bool,
    /// Redirect hop bound when redirects are enabled.
    pub http_max_redirects: u32,
    /// Whether the metrics exposition returns content.
    pub metrics_enabled: bool,
    /// Route at which a front-end mounts the exposition.
    pub metrics_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            opa_url: "http://localhost:8181".to_owned(),
            default_baseline: Baseline::B3,
            audit_log_path: "results/audit.jsonl".to_owned(),
            http_adapter: HttpAdapterKind::Mock,
            http_timeout_ms: 5000,
            http_allow_redirects: false,
            http_max_redirects: 0,
            metrics_enabled: true,
            metrics_path: "/metrics".to_owned(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment, honoring a `.env` file.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_resolver(|key| std::env::var(key).ok())
    }

    /// Load settings through a custom resolver (for testing).
    pub fn from_resolver(env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            opa_url: env("OPA_URL").unwrap_or(defaults.opa_url),
            default_baseline: env("DEFAULT_BASELINE")
                .and_then(|v| Baseline::from_str(&v).ok())
                .unwrap_or(defaults.default_baseline),
            audit_log_path: env("AUDIT_LOG_PATH").unwrap_or(defaults.audit_log_path),
            http_adapter: match env("HTTP_ADAPTER").as_deref() {
                Some(value) if value.eq_ignore_ascii_case("real") => HttpAdapterKind::Real,
                _ => HttpAdapterKind::Mock,
            },
            http_timeout_ms: env("HTTP_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_ms),
            http_allow_redirects: env("HTTP_ALLOW_REDIRECTS")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.http_allow_redirects),
            http_max_redirects: env("HTTP_MAX_REDIRECTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_max_redirects),
            metrics_enabled: env("METRICS_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.metrics_enabled),
            metrics_path: env("METRICS_PATH").unwrap_or(defaults.metrics_path),
        }
    }
}
