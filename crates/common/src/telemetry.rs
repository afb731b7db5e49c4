//! Tracing subscriber bootstrap, shared by the gateway binary and by
//! integration tests that want readable output.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global `tracing` subscriber. `json` selects structured
/// JSON output (for log aggregation in production); otherwise output is
/// human-readable. Filter defaults to `info` and is overridable via
/// `RUST_LOG`.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        let _ = registry.with(fmt::layer().json()).try_init();
    } else {
        let _ = registry.with(fmt::layer()).try_init();
    }
}
