//! StatsD-backed publisher

use crate::{MetricsError, MetricsPublisher, PublisherKind, Result};
use cadence::{Counted, StatsdClient, Timed, UdpMetricSink};
use std::fmt;
use std::net::UdpSocket;
use std::time::Duration;
use tracing::info;

/// Push-based publisher forwarding every observation over UDP
///
/// The socket is non-blocking, so a missing aggregator never stalls a
/// request; send errors are returned to the caller to log. Registration is
/// a no-op because StatsD needs no schema.
pub struct StatsdPublisher {
    client: StatsdClient,
    endpoint: String,
}

impl StatsdPublisher {
    /// Create a publisher sending to `host:port`, tagging every metric with `node`
    pub fn new(host: &str, port: u16, prefix: &str, node: &str) -> Result<Self> {
        let endpoint = format!("{}:{}", host, port);
        info!(address = %endpoint, "Connecting to StatsD aggregator");

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        let sink = UdpMetricSink::from(endpoint.as_str(), socket).map_err(|e| {
            MetricsError::Config(format!("Failed to create statsd client for {}: {}", endpoint, e))
        })?;

        let client = StatsdClient::builder(prefix, sink)
            .with_tag("node", node)
            .build();

        Ok(Self { client, endpoint })
    }

    /// Aggregator address this publisher sends to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for StatsdPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsdPublisher")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl MetricsPublisher for StatsdPublisher {
    fn kind(&self) -> PublisherKind {
        PublisherKind::Statsd
    }

    fn register_counter(&self, _name: &str, _help: &str) -> Result<()> {
        Ok(())
    }

    fn register_timer(&self, _name: &str, _help: &str) -> Result<()> {
        Ok(())
    }

    fn inc(&self, metric: &str, label: &str) -> Result<()> {
        self.client
            .count_with_tags(metric, 1_i64)
            .with_tag("label", label)
            .try_send()
            .map(|_| ())
            .map_err(|e| MetricsError::Export(format!("Failed to send {}: {}", metric, e)))
    }

    fn timing(&self, metric: &str, label: &str, duration: Duration) -> Result<()> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

        self.client
            .time_with_tags(metric, millis)
            .with_tag("label", label)
            .try_send()
            .map(|_| ())
            .map_err(|e| MetricsError::Export(format!("Failed to send {}: {}", metric, e)))
    }
}
