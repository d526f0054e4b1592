//! Worker bootstrap and HTTP serving

use crate::routes::create_router;
use crate::state::AppState;
use crate::{Result, ServerError};
use axum::Router;
use std::sync::Arc;
use tracing::{info, warn};
use worker_core::Config;
use worker_engine::{BlockIoLoad, NetworkLoad, RequestDispatcher};
use worker_metrics::{create_publisher, MetricsPublisher};
use worker_net::{build_directory, discover_peer_ring, PeerRing};

/// Batches handled, by label
pub const REQUEST_COUNT: &str = "request_count";

/// Batch durations in milliseconds, by label
pub const REQUEST_DURATION: &str = "request_duration";

/// Register the worker's metrics; any failure is fatal at startup
pub fn register_metrics(publisher: &dyn MetricsPublisher) -> Result<()> {
    publisher.register_counter(REQUEST_COUNT, "Count of requests")?;
    publisher.register_timer(REQUEST_DURATION, "Summary of request durations")?;
    Ok(())
}

/// The resource-worker HTTP server
pub struct HttpServer {
    config: Config,
    state: AppState,
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpServer {
    /// Build the publisher, discover peers and assemble the generators
    ///
    /// Blocks until the peer directory is ready. A missing ring leaves the
    /// worker running without network load.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let publisher = create_publisher(&config.metrics, &config.node.name)?;
        register_metrics(publisher.as_ref())?;

        let peers = Self::discover_peers(&config).await;
        let network = NetworkLoad::new(peers, &config.peers)?;
        let blkio = BlockIoLoad::new(&config.blkio);
        let dispatcher = RequestDispatcher::new(network, blkio);

        let state = AppState::new(Arc::new(dispatcher), publisher, config.node.name.clone());
        Ok(Self { config, state })
    }

    async fn discover_peers(config: &Config) -> Option<Arc<PeerRing>> {
        let directory = match build_directory(&config.peers) {
            Ok(Some(directory)) => directory,
            Ok(None) => {
                warn!("No peer directory configured; network requests are unavailable");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Invalid peer directory; network requests are unavailable");
                return None;
            }
        };

        match discover_peer_ring(directory.as_ref(), &config.node, config.peers.poll_interval()).await {
            Ok(ring) => Some(Arc::new(ring)),
            Err(e) => {
                warn!(error = %e, "Cannot get network peers; network requests are unavailable");
                None
            }
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone(), &self.config.server)
    }

    /// Serve until Ctrl+C
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        info!(
            address = %addr,
            node = %self.config.node.name,
            publisher = %self.state.publisher.kind(),
            network_available = self.state.dispatcher.network().is_available(),
            "resource-worker listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Server(format!("HTTP server failed: {}", e)))?;

        info!("resource-worker stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
