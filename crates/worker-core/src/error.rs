//! Error handling for resource-worker configuration and startup
//!
//! Load-generation failures have their own taxonomy in `worker-engine`; this
//! type covers everything that can go wrong before the worker starts serving.

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for configuration and startup
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// Configuration source errors
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidConfiguration(_) => "configuration",
            Error::Config(_) => "config",
        }
    }
}
