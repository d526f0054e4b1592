//! # worker-server
//!
//! HTTP transport for resource-worker.
//!
//! This crate wires the generators, the peer ring and the metrics publisher
//! behind an axum router:
//! - `POST /run` executes a batch of resource requests
//! - `POST /network-endpoint` absorbs payloads sent by peers
//! - `GET /metrics` exposes Prometheus metrics (pull backend only)
//! - `GET /health` reports liveness and whether network load is available
//!
//! ## Example
//!
//! ```rust,no_run
//! use worker_core::Config;
//! use worker_server::HttpServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let server = HttpServer::new(config).await?;
//!     server.serve().await?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod logging;
pub mod routes;
pub mod server;
pub mod state;

pub use logging::init_logging;
pub use routes::create_router;
pub use server::{register_metrics, HttpServer, REQUEST_COUNT, REQUEST_DURATION};
pub use state::AppState;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that stop the worker from starting or serving
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] worker_core::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] worker_metrics::MetricsError),

    #[error("Load generator error: {0}")]
    Load(#[from] worker_engine::LoadError),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Server error: {0}")]
    Server(String),
}
