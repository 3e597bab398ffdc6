//! # Telemetry
//!
//! Tracing subscriber bootstrap for binaries and tests that embed the ledger.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - every backend call
//! - `RUST_LOG=ledger_engine=trace` - engines only
//! - Default: `info,ledger_engine=debug,sqlx=warn`

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,ledger_engine=debug,sqlx=warn";

/// Installs the global fmt subscriber.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Like [`init_tracing`] but writes through the test harness capture.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
