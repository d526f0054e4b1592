//! Prometheus-backed publisher

use crate::{MetricsError, MetricsPublisher, PublisherKind, Result};
use parking_lot::RwLock;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Dimensions attached to every resource-worker metric
const LABEL_NAMES: [&str; 2] = ["label", "node"];

/// Pull-based publisher backed by a private Prometheus registry
///
/// Timers are histograms of milliseconds.
pub struct PrometheusPublisher {
    registry: Registry,
    node: String,
    counters: RwLock<HashMap<String, CounterVec>>,
    timers: RwLock<HashMap<String, HistogramVec>>,
}

impl PrometheusPublisher {
    /// Create a publisher whose observations carry `node` as the node dimension
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            registry: Registry::new(),
            node: node.into(),
            counters: RwLock::new(HashMap::new()),
            timers: RwLock::new(HashMap::new()),
        }
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn duration_buckets() -> Result<Vec<f64>> {
        // 1 ms up to roughly 70 minutes
        Ok(prometheus::exponential_buckets(1.0, 4.0, 12)?)
    }
}

impl fmt::Debug for PrometheusPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusPublisher")
            .field("node", &self.node)
            .field("counters", &self.counters.read().keys().collect::<Vec<_>>())
            .field("timers", &self.timers.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MetricsPublisher for PrometheusPublisher {
    fn kind(&self) -> PublisherKind {
        PublisherKind::Prometheus
    }

    fn register_counter(&self, name: &str, help: &str) -> Result<()> {
        let mut counters = self.counters.write();
        if counters.contains_key(name) {
            return Err(MetricsError::AlreadyRegistered(name.to_string()));
        }

        let counter = CounterVec::new(Opts::new(name, help), &LABEL_NAMES)?;
        self.registry.register(Box::new(counter.clone()))?;

        // Expose the series before the first batch arrives
        counter.with_label_values(&["", self.node.as_str()]);

        counters.insert(name.to_string(), counter);
        debug!(metric = %name, "Registered counter");
        Ok(())
    }

    fn register_timer(&self, name: &str, help: &str) -> Result<()> {
        let mut timers = self.timers.write();
        if timers.contains_key(name) {
            return Err(MetricsError::AlreadyRegistered(name.to_string()));
        }

        let timer = HistogramVec::new(
            HistogramOpts::new(name, help).buckets(Self::duration_buckets()?),
            &LABEL_NAMES,
        )?;
        self.registry.register(Box::new(timer.clone()))?;
        timer.with_label_values(&["", self.node.as_str()]);

        timers.insert(name.to_string(), timer);
        debug!(metric = %name, "Registered timer");
        Ok(())
    }

    fn inc(&self, metric: &str, label: &str) -> Result<()> {
        let counters = self.counters.read();
        let counter = counters
            .get(metric)
            .ok_or_else(|| MetricsError::UnknownMetric(metric.to_string()))?;

        counter.with_label_values(&[label, self.node.as_str()]).inc();
        Ok(())
    }

    fn timing(&self, metric: &str, label: &str, duration: Duration) -> Result<()> {
        let timers = self.timers.read();
        let timer = timers
            .get(metric)
            .ok_or_else(|| MetricsError::UnknownMetric(metric.to_string()))?;

        timer
            .with_label_values(&[label, self.node.as_str()])
            .observe(duration.as_secs_f64() * 1000.0);
        Ok(())
    }

    fn export_text(&self) -> Result<Option<String>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Export(format!("Failed to encode metrics: {}", e)))?;

        String::from_utf8(buffer)
            .map(Some)
            .map_err(|e| MetricsError::Export(format!("Failed to convert metrics to string: {}", e)))
    }
}
