//! # worker-metrics
//!
//! Backend-agnostic metrics publishing for resource-worker.
//!
//! A [`MetricsPublisher`] is built once at startup from configuration and
//! shared by every request handler:
//! - [`PrometheusPublisher`] keeps counters and timers in a registry that is
//!   scraped over `GET /metrics`
//! - [`StatsdPublisher`] forwards every observation to a StatsD aggregator
//!   over UDP
//!
//! Metrics are registered before the transport starts serving, then
//! incremented or observed per batch with a `label` dimension. The node name
//! is attached to every observation.

pub mod prometheus_publisher;
pub mod publisher;
pub mod statsd_publisher;

pub use prometheus_publisher::PrometheusPublisher;
pub use publisher::{create_publisher, MetricsPublisher, PublisherKind};
pub use statsd_publisher::StatsdPublisher;

/// Errors raised by metrics publishers
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Publisher configuration error: {0}")]
    Config(String),

    #[error("Metric already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Metric not registered: {0}")]
    UnknownMetric(String),

    #[error("Registry error: {0}")]
    Registry(#[from] prometheus::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MetricsError::AlreadyRegistered("request_count".to_string());
        assert_eq!(err.to_string(), "Metric already registered: request_count");

        let err = MetricsError::Config("STATSD_HOST missing".to_string());
        assert!(err.to_string().starts_with("Publisher configuration error"));
    }
}
