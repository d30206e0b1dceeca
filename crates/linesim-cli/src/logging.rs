//! Diagnostic tracing for the `linesim` binary.
//!
//! Engine logs go to stderr, filtered through `RUST_LOG`. Simulation
//! reports go to stdout and are unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`, so micro-step bound warnings show
/// up without any configuration.
///
/// ```bash
/// RUST_LOG=linesim_core=debug linesim demo
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
