//! HTTP routes and handlers

use crate::state::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde_json::json;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;
use worker_core::{ServerConfig, Work, NETWORK_ENDPOINT_PATH};
use worker_engine::run_batch;
use worker_metrics::PublisherKind;

/// Build the router; `/metrics` is only mounted for the Prometheus backend
///
/// The body limit applies to `/run` alone. Peer payloads are streamed and
/// may be arbitrarily large.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route(
            "/run",
            post(run_handler).layer(DefaultBodyLimit::max(config.max_request_size)),
        )
        .route(NETWORK_ENDPOINT_PATH, post(network_endpoint_handler))
        .route("/health", get(health_handler));

    if state.publisher.kind() == PublisherKind::Prometheus {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Execute a batch of resource requests
async fn run_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Unable to read run request");
            return invalid_input();
        }
    };

    let work: Work = match serde_json::from_slice(&body) {
        Ok(work) => work,
        Err(e) => {
            warn!(error = %e, "Rejecting malformed run request");
            return invalid_input();
        }
    };

    let batch_id = Uuid::new_v4();
    info!(
        batch_id = %batch_id,
        label = %work.label,
        requests = work.requests.len(),
        "Running batch"
    );

    let started = Instant::now();
    let result = run_batch(state.dispatcher.as_ref(), &work).await;
    let elapsed = started.elapsed();

    // Failed batches are counted and timed as well
    state.record_batch(&work.label, elapsed);

    match result {
        Ok(()) => {
            info!(batch_id = %batch_id, duration_ms = elapsed.as_millis() as u64, "Batch complete");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "duration": elapsed.as_secs_f64()
                })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(
                batch_id = %batch_id,
                index = e.index,
                category = e.source.category(),
                error = %e,
                "Batch failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "reason": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

fn invalid_input() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "reason": "Invalid input data"
        })),
    )
        .into_response()
}

/// Absorb a payload sent by a peer's network generator
///
/// The body is drained chunk by chunk and only its length is kept.
async fn network_endpoint_handler(body: Body) -> Response {
    let mut stream = body.into_data_stream();
    let mut length = 0usize;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => length += chunk.len(),
            Err(e) => {
                warn!(error = %e, received = length, "Unable to read network payload");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": e.to_string()
                    })),
                )
                    .into_response();
            }
        }
    }

    debug!(length = length, "Received network payload");
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "length": length
        })),
    )
        .into_response()
}

/// Prometheus metrics endpoint
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.publisher.export_text() {
        Ok(Some(metrics)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics,
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(error = %e, "Unable to export metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Liveness and network-load availability
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let network = state.dispatcher.network();

    Json(json!({
        "status": "healthy",
        "node": state.node_name,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "peers": network.peer_count(),
        "network_available": network.is_available(),
        "degraded": !network.is_available()
    }))
}
