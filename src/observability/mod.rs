//! Structured logging setup on the tracing ecosystem.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::{Result, TaskplaneError};

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from the configured
/// log level. Call once at startup; a second call returns an error.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = fmt().with_env_filter(filter).with_target(true);

    let result = if config.json_logging {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| TaskplaneError::config(format!("failed to install tracing subscriber: {}", e)))
}

/// Log the effective configuration once logging is up.
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        server_address = %config.server.bind_address(),
        database = "sqlite",
        log_level = %config.observability.log_level,
        json_logging = %config.observability.json_logging,
        "Taskplane configuration loaded"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn init_tracing_tolerates_repeat_calls() {
        let config = ObservabilityConfig::default();

        let first = init_tracing(&config);
        let second = init_tracing(&config);

        // Exactly one of the two calls can win the global subscriber slot;
        // other tests may have installed one already, so only the repeat-call
        // behavior is asserted.
        if first.is_ok() {
            assert!(second.is_err());
        }
    }

    #[test]
    fn log_config_info_does_not_panic() {
        let config = AppConfig::default();
        log_config_info(&config);
    }
}
