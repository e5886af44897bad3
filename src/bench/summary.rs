//! Benchmark summary document (schema v1.1.0) and its validator.
//!
//! Summaries are built from typed structs, so shape errors are compile
//! errors; the validator guards the value-level constraints (rate ranges,
//! hash formats, required metadata) before anything is written to disk.

use std::process::Command;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::bench::scenario::ScenarioDoc;
use crate::bench::scoring::MetricsSummary;
use crate::types::Ablation;

/// Summary schema version emitted by this crate.
pub const SCHEMA_VERSION: &str = "1.1.0";

/// Validation failure for a summary payload.
#[derive(Debug, Error)]
#[error("summary schema validation failed: {0}")]
pub struct SummaryError(#[doc = "What failed validation."] pub String);

/// Reproducibility metadata attached to every summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMeta {
    /// Git commit of the benchmarked tree, or `unknown` outside a checkout.
    pub git_commit: String,
    /// UTC timestamp of the run.
    pub timestamp_utc: String,
    /// Toolchain floor the binary was built against.
    pub runtime_version: String,
    /// OS and architecture of the run host.
    pub platform: String,
    /// Seed recorded for the run.
    pub seed: u64,
    /// Content hash of the scenario list.
    pub scenario_hash: String,
    /// Content hash of defaults plus ablation flags.
    pub config_hash: String,
    /// Active policy content hash.
    pub policy_hash: String,
}

/// Complete summary document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Schema version; always [`SCHEMA_VERSION`] when emitted here.
    pub schema_version: String,
    /// Headline metrics.
    #[serde(flatten)]
    pub metrics: MetricsSummary,
    /// Reproducibility metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<SummaryMeta>,
}

impl Summary {
    /// Assemble a summary from metrics and metadata.
    pub fn new(metrics: MetricsSummary, meta: SummaryMeta) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_owned(),
            metrics,
            meta: Some(meta),
        }
    }
}

/// Build run metadata: git commit, timestamps, platform, and the scenario /
/// config / policy hashes.
pub fn build_summary_meta(
    seed: u64,
    scenario_doc: &ScenarioDoc,
    ablation: &Ablation,
    policy_hash: &str,
) -> SummaryMeta {
    let config = serde_json::json!({
        "ablation": ablation,
        "defaults": scenario_doc.defaults,
    });
    SummaryMeta {
        git_commit: git_commit(),
        timestamp_utc: Utc::now().to_rfc3339(),
        runtime_version: format!("rust-{}", env!("CARGO_PKG_RUST_VERSION")),
        platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        seed,
        scenario_hash: sha256_json(&serde_json::json!(scenario_doc.scenarios)),
        config_hash: sha256_json(&config),
        policy_hash: policy_hash.to_owned(),
    }
}

/// Canonical JSON hash: keys serialize in sorted order, no whitespace.
pub fn sha256_json(value: &serde_json::Value) -> String {
    hex::encode(Sha256::digest(value.to_string().as_bytes()))
}

fn git_commit() -> String {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Validate a summary payload against the v1.1.0 constraints.
pub fn validate_summary(summary: &Summary) -> Result<(), SummaryError> {
    if summary.schema_version != SCHEMA_VERSION {
        return Err(SummaryError(format!(
            "schema_version must be {SCHEMA_VERSION}, got {}",
            summary.schema_version
        )));
    }

    for (name, rate) in [
        ("asr", summary.metrics.asr),
        ("leakage_rate", summary.metrics.leakage_rate),
        ("task_success_rate", summary.metrics.task_success_rate),
        ("false_positive_rate", summary.metrics.false_positive_rate),
    ] {
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(SummaryError(format!("{name} out of range: {rate}")));
        }
    }
    if !summary.metrics.latency_ms_p95.is_finite() || summary.metrics.latency_ms_p95 < 0.0 {
        return Err(SummaryError("latency_ms_p95 must be non-negative".to_owned()));
    }

    let counts = &summary.metrics.counts;
    for (name, count) in [
        ("successful_attacks", counts.successful_attacks),
        ("leakage_events", counts.leakage_events),
        ("task_successes", counts.task_successes),
        ("false_positives", counts.false_positives),
    ] {
        if count > counts.total_runs {
            return Err(SummaryError(format!("counts.{name} exceeds total_runs")));
        }
    }

    let Some(meta) = &summary.meta else {
        return Err(SummaryError("meta is required".to_owned()));
    };
    for (name, value) in [
        ("git_commit", meta.git_commit.as_str()),
        ("timestamp_utc", meta.timestamp_utc.as_str()),
        ("runtime_version", meta.runtime_version.as_str()),
        ("platform", meta.platform.as_str()),
    ] {
        if value.is_empty() {
            return Err(SummaryError(format!("meta.{name} must be non-empty")));
        }
    }
    for (name, value) in [
        ("scenario_hash", meta.scenario_hash.as_str()),
        ("config_hash", meta.config_hash.as_str()),
        ("policy_hash", meta.policy_hash.as_str()),
    ] {
        if value.len() != 64 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SummaryError(format!("meta.{name} must be a sha256 hex digest")));
        }
    }

    Ok(())
}
