//! Startup peer ring construction

use crate::{PeerDirectory, PeerError, PeerRing, Result};
use std::time::Duration;
use tracing::{info, warn};
use worker_core::NodeConfig;

/// Wait for the directory to settle, then build the ring of every other member
///
/// Readiness is polled at a fixed interval with no bound on attempts;
/// directory errors while polling are logged and retried. Listing failures
/// and an empty member set are returned so the caller can run without a
/// ring.
pub async fn discover_peer_ring(
    directory: &dyn PeerDirectory,
    node: &NodeConfig,
    poll_interval: Duration,
) -> Result<PeerRing> {
    let source = directory.describe();
    info!(directory = %source, "Waiting for peer membership");

    let mut attempts: u64 = 0;
    loop {
        attempts += 1;
        match directory.is_ready().await {
            Ok(true) => break,
            Ok(false) => {
                info!(directory = %source, attempts = attempts, "Peer membership not ready yet");
            }
            Err(e) => {
                warn!(directory = %source, error = %e, "Unable to query peer membership");
            }
        }
        tokio::time::sleep(poll_interval).await;
    }

    let members = directory.members().await?;
    let total = members.len();
    let peers: Vec<String> = members
        .into_iter()
        .filter(|member| !node.is_self(&member.name, &member.address))
        .map(|member| member.address)
        .collect();

    if peers.is_empty() {
        warn!(directory = %source, members = total, "Directory lists no other workers");
        return Err(PeerError::NoPeers);
    }

    info!(peers = ?peers, "Peer ring built");
    PeerRing::new(peers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PeerMember, StaticPeerDirectory};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Directory that becomes ready after a number of polls
    struct SettlingDirectory {
        polls: AtomicUsize,
        ready_after: usize,
        fail_listing: bool,
    }

    impl SettlingDirectory {
        fn new(ready_after: usize) -> Self {
            Self {
                polls: AtomicUsize::new(0),
                ready_after,
                fail_listing: false,
            }
        }
    }

    #[async_trait]
    impl PeerDirectory for SettlingDirectory {
        async fn is_ready(&self) -> Result<bool> {
            let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if poll == 1 {
                return Err(PeerError::Directory("api unavailable".to_string()));
            }
            Ok(poll >= self.ready_after)
        }

        async fn members(&self) -> Result<Vec<PeerMember>> {
            if self.fail_listing {
                return Err(PeerError::Directory("listing failed".to_string()));
            }
            Ok(vec![
                PeerMember::new("worker-0", "10.0.0.1"),
                PeerMember::new("worker-1", "10.0.0.2"),
                PeerMember::new("worker-2", "10.0.0.3"),
            ])
        }

        fn describe(&self) -> String {
            "settling".to_string()
        }
    }

    fn node(hostname: &str) -> NodeConfig {
        NodeConfig {
            name: "node-a".to_string(),
            hostname: hostname.to_string(),
            address: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_ready_and_excludes_self() {
        let directory = SettlingDirectory::new(4);

        let ring = discover_peer_ring(&directory, &node("worker-1"), Duration::from_secs(3))
            .await
            .unwrap();

        assert_eq!(directory.polls.load(Ordering::SeqCst), 4);
        assert_eq!(ring.peers(), &["10.0.0.1".to_string(), "10.0.0.3".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_failure_is_reported() {
        let mut directory = SettlingDirectory::new(2);
        directory.fail_listing = true;

        let err = discover_peer_ring(&directory, &node("worker-1"), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, PeerError::Directory(_)));
    }

    #[tokio::test]
    async fn test_only_self_listed() {
        let directory = StaticPeerDirectory::from_entries(&["worker-0=10.0.0.1"]).unwrap();

        let err = discover_peer_ring(&directory, &node("worker-0"), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, PeerError::NoPeers));
    }

    #[tokio::test]
    async fn test_self_excluded_by_address() {
        let directory = StaticPeerDirectory::from_entries(&["10.0.0.1", "10.0.0.2"]).unwrap();
        let node = NodeConfig {
            address: Some("10.0.0.2".to_string()),
            ..NodeConfig::default()
        };

        let ring = discover_peer_ring(&directory, &node, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(ring.peers(), &["10.0.0.1".to_string()]);
    }
}
