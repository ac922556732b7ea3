//! Structured logging setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the filter directive
pub const LOG_ENV: &str = "PROXIFRONT_LOG";

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber, logging to stderr.
///
/// Safe to call more than once; later calls keep the existing subscriber.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        tracing::info!("still logging");
    }
}
