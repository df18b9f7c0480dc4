//! Tracing initialization, split out from `main` so it can be reasoned
//! about (and tested) independently of process lifecycle concerns.

use tracing_subscriber::EnvFilter;

/// Install a stderr-writing subscriber honoring `RUST_LOG`, defaulting to
/// `info` when unset.
pub fn initialize_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
