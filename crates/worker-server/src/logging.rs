//! Tracing subscriber setup

use crate::{Result, ServerError};
use tracing_subscriber::EnvFilter;
use worker_core::LoggingConfig;

/// Install the global subscriber; `RUST_LOG` wins over the configured level
pub fn init_logging(logging_config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging_config.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match logging_config.format.as_str() {
        "json" => subscriber.json().try_init(),
        _ => subscriber.try_init(),
    };

    installed.map_err(|e| ServerError::Logging(e.to_string()))
}
