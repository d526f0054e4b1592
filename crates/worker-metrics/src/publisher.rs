//! Publisher trait and backend selection

use crate::{MetricsError, PrometheusPublisher, Result, StatsdPublisher};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use worker_core::MetricsConfig;

/// Metrics backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherKind {
    /// Pull-based registry scraped over HTTP
    Prometheus,

    /// Push-based UDP forwarder
    Statsd,
}

impl FromStr for PublisherKind {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "prometheus" => Ok(PublisherKind::Prometheus),
            "statsd" => Ok(PublisherKind::Statsd),
            other => Err(MetricsError::Config(format!(
                "Unrecognized stats publisher service: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PublisherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublisherKind::Prometheus => f.write_str("prometheus"),
            PublisherKind::Statsd => f.write_str("statsd"),
        }
    }
}

/// Backend-agnostic counters and timers
///
/// Registration happens once at startup; `inc` and `timing` are called
/// concurrently from request handlers. Callers log failures from `inc` and
/// `timing` and carry on.
pub trait MetricsPublisher: Send + Sync + fmt::Debug {
    /// Backend behind this publisher
    fn kind(&self) -> PublisherKind;

    /// Register a counter; registering the same name twice fails
    fn register_counter(&self, name: &str, help: &str) -> Result<()>;

    /// Register a duration timer; registering the same name twice fails
    fn register_timer(&self, name: &str, help: &str) -> Result<()>;

    /// Increment a counter by one
    fn inc(&self, metric: &str, label: &str) -> Result<()>;

    /// Record a duration
    fn timing(&self, metric: &str, label: &str, duration: Duration) -> Result<()>;

    /// Metrics in the Prometheus text format, `None` for push backends
    fn export_text(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Build the publisher selected by configuration
pub fn create_publisher(
    config: &MetricsConfig,
    node_name: &str,
) -> Result<Arc<dyn MetricsPublisher>> {
    let kind: PublisherKind = config.publisher.parse()?;
    info!(publisher = %kind, node = %node_name, "Creating metrics publisher");

    match kind {
        PublisherKind::Prometheus => Ok(Arc::new(PrometheusPublisher::new(node_name))),
        PublisherKind::Statsd => {
            let host = config
                .statsd_host
                .as_deref()
                .filter(|host| !host.is_empty())
                .ok_or_else(|| {
                    MetricsError::Config(
                        "STATSD_HOST environment variable must be defined".to_string(),
                    )
                })?;

            let publisher =
                StatsdPublisher::new(host, config.statsd_port, &config.statsd_prefix, node_name)?;
            Ok(Arc::new(publisher))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_kind_parsing() {
        assert_eq!(
            "prometheus".parse::<PublisherKind>().unwrap(),
            PublisherKind::Prometheus
        );
        assert_eq!("statsd".parse::<PublisherKind>().unwrap(), PublisherKind::Statsd);
        assert!("influx".parse::<PublisherKind>().is_err());
        assert_eq!(PublisherKind::Statsd.to_string(), "statsd");
    }

    #[test]
    fn test_create_default_publisher() {
        let publisher = create_publisher(&MetricsConfig::default(), "node-a").unwrap();
        assert_eq!(publisher.kind(), PublisherKind::Prometheus);
        assert!(publisher.export_text().unwrap().is_some());
    }

    #[test]
    fn test_create_statsd_publisher() {
        let config = MetricsConfig {
            publisher: "statsd".to_string(),
            statsd_host: Some("127.0.0.1".to_string()),
            ..Default::default()
        };

        let publisher = create_publisher(&config, "node-a").unwrap();
        assert_eq!(publisher.kind(), PublisherKind::Statsd);
        assert!(publisher.export_text().unwrap().is_none());
    }

    #[test]
    fn test_statsd_requires_host() {
        let config = MetricsConfig {
            publisher: "statsd".to_string(),
            statsd_host: None,
            ..Default::default()
        };

        let err = create_publisher(&config, "node-a").unwrap_err();
        assert!(matches!(err, MetricsError::Config(_)));
    }

    #[test]
    fn test_unknown_publisher() {
        let config = MetricsConfig {
            publisher: "graphite".to_string(),
            ..Default::default()
        };

        assert!(create_publisher(&config, "node-a").is_err());
    }
}
