//! Diagnostics for debugging module resolution and tool dispatch.
//!
//! Output of the external tools is streamed to the terminal by
//! [`crate::io::process`]. Tracing carries summon-python's own diagnostics,
//! written to stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Falls back to `debug` when `verbose` is set, `warn` otherwise.
///
/// # Example
/// ```bash
/// RUST_LOG=summon_python=trace summon-python lint
/// ```
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
