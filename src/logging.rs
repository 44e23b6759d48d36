//! Diagnostic tracing setup.
//!
//! Diagnostics go to stderr so the `--stdio` protocol on stdout stays clean.
//! Filtering follows `RUST_LOG`; without it only warnings are shown.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// ```bash
/// RUST_LOG=ceptra=debug ceptra --stdio
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // `try_init` so a second call (tests, embedding) is a no-op.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
