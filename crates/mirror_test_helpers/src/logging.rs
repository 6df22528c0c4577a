//! Test logging configuration utilities
//!
//! Prevents output pollution in test runs while keeping debugging possible.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

/// Initialize tracing for tests with a custom log level
///
/// Only the first call per test binary takes effect; subsequent calls are
/// ignored.
pub fn init_test_logging(level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Suppress all but error logs for clean test output
pub fn suppress_logs() {
    init_test_logging("error");
}
