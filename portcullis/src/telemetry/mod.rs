//! Structured logging setup. The gateway logs via `tracing`; this module
//! wires the process-wide subscriber once at startup.

use tracing_subscriber::EnvFilter;

/// Install a `tracing_subscriber` formatter reading its filter from
/// `RUST_LOG`, defaulting to `info` when unset.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
