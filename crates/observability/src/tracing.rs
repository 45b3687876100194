//! Tracing/logging initialization.
//!
//! JSON-structured logs with env-based filtering. Correlation ids and
//! per-request spans are added at the API layer.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Filter is taken from `RUST_LOG`, defaulting to `info`.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
