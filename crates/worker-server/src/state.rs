//! Shared application state

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use worker_engine::RequestDispatcher;
use worker_metrics::MetricsPublisher;

use crate::server::{REQUEST_COUNT, REQUEST_DURATION};

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RequestDispatcher>,
    pub publisher: Arc<dyn MetricsPublisher>,
    pub node_name: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        publisher: Arc<dyn MetricsPublisher>,
        node_name: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            publisher,
            node_name: node_name.into(),
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// Count the batch and record its duration; publisher failures are only logged
    pub fn record_batch(&self, label: &str, elapsed: Duration) {
        if let Err(e) = self.publisher.timing(REQUEST_DURATION, label, elapsed) {
            warn!(metric = REQUEST_DURATION, label = %label, error = %e, "Unable to record timing");
        }
        if let Err(e) = self.publisher.inc(REQUEST_COUNT, label) {
            warn!(metric = REQUEST_COUNT, label = %label, error = %e, "Unable to increment counter");
        }
    }
}
