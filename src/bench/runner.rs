//! Benchmark runner: drives every scenario through the gateway for one or
//! all baselines, classifies outcomes, and writes the run and summary
//! documents.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::audit::AuditLogger;
use crate::bench::scenario::{load_catalog, Scenario};
use crate::bench::scoring::{
    classify_run, compute_category_breakdown, compute_metrics, compute_threat_breakdown,
    MetricsSummary, RunOutcome,
};
use crate::bench::summary::{build_summary_meta, validate_summary, Summary};
use crate::gateway::pdp::{LocalPdp, PolicyDecisionPoint, RemotePdp};
use crate::gateway::ToolGateway;
use crate::metrics::MetricsCollector;
use crate::policy::{compute_policy_hash, PolicyData, PolicyMeta};
use crate::runtime::{AgentOrchestrator, TraceStep};
use crate::tools::docs::DocStore;
use crate::tools::http_mock::HttpMock;
use crate::tools::registry::ToolRegistry;
use crate::tools::tickets::TicketStore;
use crate::types::{Ablation, Baseline};

/// Benchmark-level failures (beyond gateway and scenario errors).
#[derive(Debug, Error)]
pub enum BenchError {
    /// An unknown ablation name was requested.
    #[error("unknown ablation: {0}")]
    UnknownAblation(String),
    /// An unknown baseline name was requested.
    #[error("unknown baseline: {0} (expected B0..B3 or all)")]
    UnknownBaseline(String),
}

/// Inputs for one benchmark invocation, mirroring the CLI flags.
#[derive(Debug, Clone)]
pub struct BenchArgs {
    /// Scenario catalog path.
    pub scenarios: PathBuf,
    /// `B0`..`B3` or `all`.
    pub baseline: String,
    /// Repetitions per scenario.
    pub runs: u32,
    /// Output path for the run records document.
    pub out: PathBuf,
    /// Output path for the summary document.
    pub summary: PathBuf,
    /// Also sweep all baselines and emit the comparison document.
    pub compare: bool,
    /// External policy engine URL; the embedded engine is used when absent.
    pub opa_url: Option<String>,
    /// Ablation name (`none` for the full rule set).
    pub ablation: String,
    /// Seed recorded in the summary metadata.
    pub seed: u64,
    /// Directory holding policy sources and the data document.
    pub policy_dir: PathBuf,
    /// Audit sink path for the sweep.
    pub audit_log_path: PathBuf,
}

/// Map an ablation name to its flag set.
pub fn ablation_flags(name: &str) -> Result<Ablation, BenchError> {
    match name.trim().to_lowercase().as_str() {
        "" | "none" => Ok(Ablation::default()),
        "no_approvals" => Ok(Ablation {
            disable_approvals: true,
            ..Ablation::default()
        }),
        "no_taint_approvals" => Ok(Ablation {
            disable_taint_approvals: true,
            ..Ablation::default()
        }),
        "no_path" => Ok(Ablation {
            disable_path_allowlist: true,
            ..Ablation::default()
        }),
        "no_canary" => Ok(Ablation {
            disable_canary: true,
            ..Ablation::default()
        }),
        "no_ticket_size" => Ok(Ablation {
            disable_ticket_size: true,
            ..Ablation::default()
        }),
        other => Err(BenchError::UnknownAblation(other.to_owned())),
    }
}

/// One run record as written to the runs document.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    /// Scenario id.
    pub scenario_id: String,
    /// Attack category.
    pub category: String,
    /// Threat label.
    pub threat: String,
    /// Baseline of the run.
    pub baseline: Baseline,
    /// Ablation flags active for the run.
    pub ablation: Ablation,
    /// Repetition index.
    pub run_index: u32,
    /// Whether the scenario is adversarial.
    pub is_adversarial: bool,
    /// Final agent output.
    pub final_output: String,
    /// Full request/response trace.
    pub tool_trace: Vec<TraceStep>,
    /// End-to-end latency in milliseconds.
    pub latency_ms: f64,
    /// Classified leakage flag.
    pub leakage: bool,
    /// Classified forbidden-execution flag.
    pub forbidden_executed: bool,
    /// Classified false-positive flag.
    pub false_positive: bool,
    /// Classified task-success flag.
    pub task_success: bool,
}

/// Write a JSON document, creating parent directories.
pub fn write_json(path: impl AsRef<Path>, payload: &impl Serialize) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(payload)?)?;
    Ok(())
}

fn build_pdp(
    opa_url: Option<&str>,
    policy_data: &PolicyData,
) -> anyhow::Result<Arc<dyn PolicyDecisionPoint>> {
    match opa_url {
        Some(url) => {
            info!(%url, "using external policy engine");
            Ok(Arc::new(RemotePdp::new(url)?))
        }
        None => Ok(Arc::new(LocalPdp::new(policy_data.clone()))),
    }
}

/// Run every scenario of the catalog `runs` times under one baseline.
/// Stores are rebuilt per run so scenarios cannot contaminate each other.
#[allow(clippy::too_many_arguments)]
pub async fn run_single_baseline(
    scenarios: &[Scenario],
    baseline: Baseline,
    runs: u32,
    canaries: &[String],
    allowed_domains: &[String],
    allowed_projects: &[String],
    pdp: Arc<dyn PolicyDecisionPoint>,
    audit: Arc<AuditLogger>,
    metrics: Arc<MetricsCollector>,
    policy_meta: Arc<PolicyMeta>,
    ablation: Ablation,
) -> anyhow::Result<(Vec<RunRecord>, Vec<RunOutcome>)> {
    let mut records = Vec::new();
    let mut outcomes = Vec::new();

    for scenario in scenarios {
        for run_index in 0..runs {
            let docs = Arc::new(DocStore::new());
            let tickets = Arc::new(TicketStore::new());
            let registry = Arc::new(ToolRegistry::new(
                docs.clone(),
                Arc::new(HttpMock::new()),
                tickets,
            ));
            registry.set_allowed_domains(allowed_domains.to_vec());
            registry.set_allowed_ticket_projects(allowed_projects.to_vec());

            if let Some(setup) = &scenario.retrieval_setup {
                if !setup.doc_id.is_empty() && !setup.malicious_snippet.is_empty() {
                    docs.seed_malicious(&setup.doc_id, &setup.malicious_snippet);
                }
            }

            let gateway = Arc::new(ToolGateway::new(
                registry,
                pdp.clone(),
                audit.clone(),
                metrics.clone(),
                policy_meta.clone(),
            ));
            let orchestrator = AgentOrchestrator::new(gateway, canaries.to_vec());

            let task = format!(
                "{} {}",
                scenario.task,
                scenario.benign_input.as_deref().unwrap_or("")
            );
            let result = orchestrator
                .run(task.trim(), baseline, Some(scenario), ablation)
                .await?;

            let outcome = classify_run(scenario, baseline, &result, canaries);

            records.push(RunRecord {
                scenario_id: scenario.id.clone(),
                category: scenario.category.clone(),
                threat: scenario.threat_label().to_owned(),
                baseline,
                ablation,
                run_index,
                is_adversarial: scenario.is_adversarial(),
                final_output: result.final_output.clone(),
                tool_trace: result.tool_trace,
                latency_ms: outcome.latency_ms,
                leakage: outcome.leakage,
                forbidden_executed: outcome.forbidden_executed,
                false_positive: outcome.false_positive,
                task_success: outcome.task_success,
            });
            outcomes.push(outcome);
        }
    }

    Ok((records, outcomes))
}

/// Execute a full benchmark invocation and write the output documents.
pub async fn run_benchmark(args: &BenchArgs) -> anyhow::Result<()> {
    let doc = load_catalog(&args.scenarios)?;
    let ablation = ablation_flags(&args.ablation)?;

    let policy_data = PolicyData::load(&args.policy_dir)?;
    let policy_meta = Arc::new(PolicyMeta::load(&args.policy_dir)?);
    let pdp = build_pdp(args.opa_url.as_deref(), &policy_data)?;
    let audit = Arc::new(AuditLogger::new(&args.audit_log_path)?);
    let metrics = Arc::new(MetricsCollector::new());

    let canaries = doc.defaults.canaries.clone();
    let allowed_domains = doc.defaults.allowed_domains.clone();
    let allowed_projects = doc.defaults.allowed_ticket_projects.clone();
    let summary_meta = build_summary_meta(
        args.seed,
        &doc,
        &ablation,
        &compute_policy_hash(&args.policy_dir)?,
    );

    let sweep_all = args.baseline == "all" || args.compare;
    if sweep_all {
        let mut all_records = Vec::new();
        let mut all_outcomes = Vec::new();
        let mut baseline_summaries: BTreeMap<Baseline, MetricsSummary> = BTreeMap::new();

        println!("Running benchmarks for all baselines: B0, B1, B2, B3");
        for baseline in Baseline::ALL {
            println!("\n{}", "=".repeat(60));
            println!("Running baseline: {baseline}");
            println!("{}", "=".repeat(60));
            let (records, outcomes) = run_single_baseline(
                &doc.scenarios,
                baseline,
                args.runs,
                &canaries,
                &allowed_domains,
                &allowed_projects,
                pdp.clone(),
                audit.clone(),
                metrics.clone(),
                policy_meta.clone(),
                ablation,
            )
            .await?;
            let summary = compute_metrics(&outcomes);
            println!("\n{baseline} Results:");
            println!("  ASR: {:.4}", summary.asr);
            println!("  Leakage Rate: {:.4}", summary.leakage_rate);
            println!("  Task Success: {:.4}", summary.task_success_rate);
            println!("  False Positives: {:.4}", summary.false_positive_rate);

            all_records.extend(records);
            all_outcomes.extend(outcomes);
            baseline_summaries.insert(baseline, summary);
        }

        write_json(&args.out, &json!({"runs": all_records}))?;

        let b3_metrics = baseline_summaries
            .get(&Baseline::B3)
            .cloned()
            .unwrap_or_else(|| compute_metrics(&[]));
        let summary = Summary::new(b3_metrics, summary_meta.clone());
        validate_summary(&summary).map_err(anyhow::Error::from)?;
        write_json(&args.summary, &summary)?;

        if args.compare {
            write_comparison(args, &baseline_summaries, &all_outcomes, &summary_meta)?;
        }
        Ok(())
    } else {
        let baseline: Baseline = args
            .baseline
            .parse()
            .map_err(|_| BenchError::UnknownBaseline(args.baseline.clone()))?;
        let (records, outcomes) = run_single_baseline(
            &doc.scenarios,
            baseline,
            args.runs,
            &canaries,
            &allowed_domains,
            &allowed_projects,
            pdp,
            audit,
            metrics,
            policy_meta,
            ablation,
        )
        .await?;

        write_json(&args.out, &json!({"runs": records}))?;
        let summary = Summary::new(compute_metrics(&outcomes), summary_meta);
        validate_summary(&summary).map_err(anyhow::Error::from)?;
        write_json(&args.summary, &summary)?;

        println!(
            "Wrote {} and {}",
            args.out.display(),
            args.summary.display()
        );
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}

fn write_comparison(
    args: &BenchArgs,
    baseline_summaries: &BTreeMap<Baseline, MetricsSummary>,
    all_outcomes: &[RunOutcome],
    summary_meta: &crate::bench::summary::SummaryMeta,
) -> anyhow::Result<()> {
    let b3_outcomes: Vec<RunOutcome> = all_outcomes
        .iter()
        .filter(|o| o.baseline == Baseline::B3)
        .cloned()
        .collect();
    let category_breakdown = compute_category_breakdown(&b3_outcomes);
    let threat_breakdown = compute_threat_breakdown(&b3_outcomes);

    let summaries: BTreeMap<String, &MetricsSummary> = baseline_summaries
        .iter()
        .map(|(baseline, summary)| (baseline.to_string(), summary))
        .collect();
    let b0 = &baseline_summaries[&Baseline::B0];
    let b2 = &baseline_summaries[&Baseline::B2];
    let b3 = &baseline_summaries[&Baseline::B3];

    let comparison_path = comparison_path_for(&args.summary);
    write_json(
        &comparison_path,
        &json!({
            "baselines": summaries,
            "category_breakdown": {"B3": category_breakdown},
            "threat_breakdown": {"B3": threat_breakdown},
            "meta": summary_meta,
            "improvement": {
                "B0_to_B3": {
                    "asr_reduction": b0.asr - b3.asr,
                    "leakage_reduction": b0.leakage_rate - b3.leakage_rate,
                    "task_success_improvement": b3.task_success_rate - b0.task_success_rate,
                },
                "B2_to_B3": {
                    "asr_reduction": b2.asr - b3.asr,
                    "leakage_reduction": b2.leakage_rate - b3.leakage_rate,
                },
            },
        }),
    )?;

    println!("\n{}", "=".repeat(60));
    println!("BASELINE COMPARISON");
    println!("{}", "=".repeat(60));
    println!(
        "{:<10} {:<10} {:<12} {:<15} {:<12}",
        "Baseline", "ASR", "Leakage", "Task Success", "False Pos"
    );
    println!("{}", "-".repeat(60));
    for baseline in Baseline::ALL {
        let summary = &baseline_summaries[&baseline];
        println!(
            "{:<10} {:<10.4} {:<12.4} {:<15.4} {:<12.4}",
            baseline.to_string(),
            summary.asr,
            summary.leakage_rate,
            summary.task_success_rate,
            summary.false_positive_rate
        );
    }

    println!("\n{}", "=".repeat(60));
    println!("B3 CATEGORY BREAKDOWN (ASR by attack type)");
    println!("{}", "=".repeat(60));
    println!(
        "{:<25} {:<10} {:<12} {:<15}",
        "Category", "ASR", "Leakage", "Task Success"
    );
    println!("{}", "-".repeat(60));
    for (category, summary) in &category_breakdown {
        println!(
            "{category:<25} {:<10.4} {:<12.4} {:<15.4}",
            summary.asr, summary.leakage_rate, summary.task_success_rate
        );
    }

    println!("\n{}", "=".repeat(60));
    println!("B3 THREAT BREAKDOWN (ASR by threat)");
    println!("{}", "=".repeat(60));
    println!(
        "{:<25} {:<10} {:<12} {:<15}",
        "Threat", "ASR", "Leakage", "Task Success"
    );
    println!("{}", "-".repeat(60));
    for (threat, summary) in &threat_breakdown {
        println!(
            "{threat:<25} {:<10.4} {:<12.4} {:<15.4}",
            summary.asr, summary.leakage_rate, summary.task_success_rate
        );
    }

    println!("\nComparison report written to: {}", comparison_path.display());
    Ok(())
}

fn comparison_path_for(summary_path: &Path) -> PathBuf {
    let stem = summary_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("summary");
    summary_path.with_file_name(format!("{stem}_comparison.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ablation_flags_mapping() {
        assert_eq!(ablation_flags("none").expect("none"), Ablation::default());
        assert!(ablation_flags("no_approvals").expect("flags").disable_approvals);
        assert!(ablation_flags("no_taint_approvals")
            .expect("flags")
            .disable_taint_approvals);
        assert!(ablation_flags("no_path").expect("flags").disable_path_allowlist);
        assert!(ablation_flags("no_canary").expect("flags").disable_canary);
        assert!(ablation_flags("no_ticket_size").expect("flags").disable_ticket_size);
        assert!(ablation_flags("no_everything").is_err());
    }

    #[test]
    fn test_comparison_path() {
        assert_eq!(
            comparison_path_for(Path::new("results/summary.json")),
            PathBuf::from("results/summary_comparison.json")
        );
    }
}
