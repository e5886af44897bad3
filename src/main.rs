#![allow(missing_docs)]

//! toolgate CLI: benchmark runner and small operational helpers for the
//! policy-mediated tool-execution gateway.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use toolgate::bench::runner::{run_benchmark, BenchArgs};
use toolgate::config::Settings;
use toolgate::logging;

#[derive(Parser)]
#[command(name = "toolgate", version, about = "Policy-mediated tool-execution gateway benchmark")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scenario benchmark for one baseline or a full sweep.
    Bench(BenchCommand),
    /// Print canary honeytokens for seeding environments.
    GenCanaries {
        /// How many tokens to print.
        #[arg(long, default_value_t = 2)]
        count: u32,
    },
}

#[derive(Args)]
struct BenchCommand {
    /// Scenario catalog (YAML).
    #[arg(long)]
    scenarios: PathBuf,

    /// Baseline to run: B0, B1, B2, B3, or all.
    #[arg(long, default_value = "B3")]
    baseline: String,

    /// Repetitions per scenario.
    #[arg(long, default_value_t = 5)]
    runs: u32,

    /// Output path for run records.
    #[arg(long)]
    out: PathBuf,

    /// Output path for the summary document.
    #[arg(long)]
    summary: PathBuf,

    /// Sweep all baselines and write the comparison report.
    #[arg(long)]
    compare: bool,

    /// External policy engine URL; omit to use the embedded rules.
    #[arg(long)]
    opa_url: Option<String>,

    /// Ablation name: none, no_approvals, no_taint_approvals, no_path,
    /// no_canary, or no_ticket_size.
    #[arg(long, default_value = "none")]
    ablation: String,

    /// Seed recorded in the summary metadata.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Directory holding policy sources and the data document.
    #[arg(long, default_value = "policies")]
    policy_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_cli();
    let cli = Cli::parse();

    match cli.command {
        Command::Bench(cmd) => {
            let settings = Settings::load();
            let args = BenchArgs {
                scenarios: cmd.scenarios,
                baseline: cmd.baseline,
                runs: cmd.runs,
                out: cmd.out,
                summary: cmd.summary,
                compare: cmd.compare,
                opa_url: cmd.opa_url,
                ablation: cmd.ablation,
                seed: cmd.seed,
                policy_dir: cmd.policy_dir,
                audit_log_path: PathBuf::from(settings.audit_log_path),
            };
            run_benchmark(&args).await
        }
        Command::GenCanaries { count } => {
            for i in 1..=count {
                println!("CANARY_KEY_{i:03}");
            }
            Ok(())
        }
    }
}
