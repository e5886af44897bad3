//! In-memory metrics: decision and tool-call counters plus a fixed-bucket
//! latency histogram, with Prometheus text exposition.
//!
//! All mutation happens under a single short-held mutex; the scrape path
//! renders from a snapshot taken under the same lock.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Mutex;

/// Fixed latency bucket edges in milliseconds; observations above the last
/// edge land in `+Inf`.
pub const LATENCY_BUCKET_EDGES_MS: [f64; 10] =
    [5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0];

#[derive(Default)]
struct MetricsInner {
    decisions: BTreeMap<String, u64>,
    tool_calls: BTreeMap<String, u64>,
    latency_buckets: BTreeMap<(String, String), u64>,
}

/// Process-wide metrics collector. The only legitimate long-lived shared
/// singleton in the gateway; share it with `Arc`.
#[derive(Default)]
pub struct MetricsCollector {
    inner: Mutex<MetricsInner>,
}

impl MetricsCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one decision outcome (`allowed` / `denied` / `approval_required`).
    pub fn record_decision(&self, decision: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            let counter = inner.decisions.entry(decision.to_owned()).or_insert(0);
            *counter = counter.saturating_add(1);
        }
    }

    /// Count one call for a tool.
    pub fn record_tool_call(&self, tool: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            let counter = inner.tool_calls.entry(tool.to_owned()).or_insert(0);
            *counter = counter.saturating_add(1);
        }
    }

    /// Record one latency observation for a tool.
    pub fn observe_latency(&self, tool: &str, latency_ms: f64) {
        let bucket = Self::bucket_for(latency_ms);
        if let Ok(mut inner) = self.inner.lock() {
            let counter = inner
                .latency_buckets
                .entry((tool.to_owned(), bucket))
                .or_insert(0);
            *counter = counter.saturating_add(1);
        }
    }

    fn bucket_for(latency_ms: f64) -> String {
        for edge in LATENCY_BUCKET_EDGES_MS {
            if latency_ms <= edge {
                // Edges are integral; render without a fractional part.
                return format!("{edge:.0}");
            }
        }
        "+Inf".to_owned()
    }

    /// Render the three metric families in Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let Ok(inner) = self.inner.lock() else {
            return String::new();
        };

        let mut out = String::new();
        out.push_str("# TYPE tool_gateway_decisions_total counter\n");
        for (decision, value) in &inner.decisions {
            let _ = writeln!(out, "tool_gateway_decisions_total{{decision=\"{decision}\"}} {value}");
        }

        out.push_str("# TYPE tool_gateway_tool_calls_total counter\n");
        for (tool, value) in &inner.tool_calls {
            let _ = writeln!(out, "tool_gateway_tool_calls_total{{tool=\"{tool}\"}} {value}");
        }

        out.push_str("# TYPE tool_gateway_latency_ms_bucket counter\n");
        for ((tool, bucket), value) in &inner.latency_buckets {
            let _ = writeln!(
                out,
                "tool_gateway_latency_ms_bucket{{tool=\"{tool}\",le=\"{bucket}\"}} {value}"
            );
        }

        out
    }
}
