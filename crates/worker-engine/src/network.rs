//! Network load generator

use crate::{check_rounds, LoadError, Result};
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use worker_core::{NetworkRequest, PeerConfig, NETWORK_ENDPOINT_PATH};
use worker_net::{peer_url, PeerRing};

const CHUNK_SIZE: usize = 64 * 1024;

static ZEROS: [u8; CHUNK_SIZE] = [0; CHUNK_SIZE];

/// Body of `bytes` zeros streamed in fixed chunks, never held in memory at once
fn zero_body(bytes: usize) -> reqwest::Body {
    let chunk = Bytes::from_static(&ZEROS);
    let tail = bytes % CHUNK_SIZE;

    let chunks = std::iter::repeat(chunk.clone())
        .take(bytes / CHUNK_SIZE)
        .chain((tail > 0).then(|| chunk.slice(..tail)))
        .map(Ok::<_, io::Error>);

    reqwest::Body::wrap_stream(futures::stream::iter(chunks))
}

pub fn validate(request: &NetworkRequest) -> Result<usize> {
    let bytes = request.payload_bytes().ok_or_else(|| {
        LoadError::Validation(
            "Network request needs either a size or a bandwidth".to_string(),
        )
    })?;
    if bytes < 0 {
        return Err(LoadError::Validation(
            "Size of a network request cannot be negative!".to_string(),
        ));
    }
    check_rounds(request.rounds())?;

    usize::try_from(bytes).map_err(|_| LoadError::AllocationFailure { bytes: bytes as u64 })
}

/// Sends zero-filled payloads to peers in round-robin order
///
/// Without a peer ring every request fails with
/// [`LoadError::NetworkUnavailable`].
#[derive(Debug, Clone)]
pub struct NetworkLoad {
    client: reqwest::Client,
    peers: Option<Arc<PeerRing>>,
    peer_port: u16,
}

impl NetworkLoad {
    pub fn new(peers: Option<Arc<PeerRing>>, config: &PeerConfig) -> Result<Self> {
        Self::with_timeout(peers, config.peer_port, config.request_timeout())
    }

    pub fn with_timeout(
        peers: Option<Arc<PeerRing>>,
        peer_port: u16,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LoadError::Client)?;

        Ok(Self {
            client,
            peers,
            peer_port,
        })
    }

    /// Whether a peer ring was discovered
    pub fn is_available(&self) -> bool {
        self.peers.is_some()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.as_ref().map_or(0, |ring| ring.len())
    }

    /// Post the payload `rounds` times to the next peer, returning the bytes sent
    pub async fn run(&self, request: &NetworkRequest) -> Result<usize> {
        let bytes = validate(request)?;
        let ring = self.peers.as_ref().ok_or(LoadError::NetworkUnavailable)?;

        let peer = ring.next_peer().to_string();
        let url = peer_url(&peer, self.peer_port, NETWORK_ENDPOINT_PATH);

        for round in 0..request.rounds() {
            let response = self
                .client
                .post(&url)
                .header(CONTENT_TYPE, "text/plain")
                .header(CONTENT_LENGTH, bytes)
                .body(zero_body(bytes))
                .send()
                .await
                .map_err(|source| LoadError::TransportFailure {
                    peer: peer.clone(),
                    source,
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::PeerRejected {
                    peer,
                    status: status.as_u16(),
                });
            }

            debug!(peer = %peer, round = round, bytes = bytes, "Payload delivered");
        }

        Ok(bytes * request.rounds() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Router};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn spawn_peer(status: StatusCode) -> (SocketAddr, Arc<AtomicUsize>) {
        let received = Arc::new(AtomicUsize::new(0));
        let counter = received.clone();

        let app = Router::new().route(
            NETWORK_ENDPOINT_PATH,
            post(move |body: Bytes| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(body.len(), Ordering::SeqCst);
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (addr, received)
    }

    fn load(peers: &[String]) -> NetworkLoad {
        let ring = PeerRing::new(peers.to_vec()).unwrap();
        NetworkLoad::with_timeout(Some(Arc::new(ring)), 7998, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_posts_payload_each_round() {
        let (addr, received) = spawn_peer(StatusCode::OK).await;
        let network = load(&[addr.to_string()]);

        let request = NetworkRequest {
            size: Some(2),
            rounds: Some(3),
            ..Default::default()
        };
        let sent = network.run(&request).await.unwrap();

        assert_eq!(sent, 6000);
        assert_eq!(received.load(Ordering::SeqCst), 6000);
    }

    #[tokio::test]
    async fn test_payload_larger_than_one_chunk() {
        let (addr, received) = spawn_peer(StatusCode::OK).await;
        let network = load(&[addr.to_string()]);

        let bytes = 3 * CHUNK_SIZE + 17;
        let sent = network
            .run(&NetworkRequest::with_bandwidth(bytes as i64))
            .await
            .unwrap();

        assert_eq!(sent, bytes);
        assert_eq!(received.load(Ordering::SeqCst), bytes);
    }

    #[tokio::test]
    async fn test_huge_payload_is_not_materialized() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        // A petabyte body would abort the process if it were allocated up front
        let network = load(&[addr.to_string()]);
        let err = network
            .run(&NetworkRequest::with_bandwidth(1_000_000_000_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn test_bandwidth_wins_over_size() {
        let (addr, received) = spawn_peer(StatusCode::OK).await;
        let network = load(&[addr.to_string()]);

        let request = NetworkRequest {
            size: Some(5),
            bandwidth: Some(100),
            rounds: None,
        };
        network.run(&request).await.unwrap();

        assert_eq!(received.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn test_alternates_between_peers() {
        let (first, first_received) = spawn_peer(StatusCode::OK).await;
        let (second, second_received) = spawn_peer(StatusCode::OK).await;
        let network = load(&[first.to_string(), second.to_string()]);

        for _ in 0..3 {
            network.run(&NetworkRequest::with_bandwidth(10)).await.unwrap();
        }

        assert_eq!(first_received.load(Ordering::SeqCst), 20);
        assert_eq!(second_received.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_peer_rejection() {
        let (addr, _) = spawn_peer(StatusCode::INTERNAL_SERVER_ERROR).await;
        let network = load(&[addr.to_string()]);

        let err = network
            .run(&NetworkRequest::with_bandwidth(10))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::PeerRejected { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let network = load(&[addr.to_string()]);
        let err = network
            .run(&NetworkRequest::with_bandwidth(10))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn test_without_ring() {
        let network =
            NetworkLoad::with_timeout(None, 7998, Duration::from_secs(1)).unwrap();
        assert!(!network.is_available());

        let err = network
            .run(&NetworkRequest::with_bandwidth(10))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::NetworkUnavailable));
    }

    #[tokio::test]
    async fn test_validation() {
        let network = load(&["10.0.0.1".to_string()]);

        let err = network.run(&NetworkRequest::default()).await.unwrap_err();
        assert!(matches!(err, LoadError::Validation(_)));

        let err = network
            .run(&NetworkRequest::with_size_kb(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Validation(_)));
    }
}
