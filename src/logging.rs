//! Structured logging setup using `tracing-subscriber`.
//!
//! Console-only: the benchmark runner is a one-shot CLI and audit has its
//! own sink. Output level is controlled by `RUST_LOG` (default: `info`).

use tracing_subscriber::EnvFilter;

/// Initialise console logging to stderr. Safe to call more than once; later
/// calls are no-ops.
pub fn init_cli() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
