//! Round-robin peer ring

use crate::{PeerError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Fixed circular sequence of peer addresses
///
/// The peer list never changes after construction; only the cursor moves.
#[derive(Debug)]
pub struct PeerRing {
    peers: Vec<String>,
    cursor: AtomicUsize,
}

impl PeerRing {
    /// Create a ring, the first call to [`next_peer`](Self::next_peer) returns `peers[0]`
    pub fn new(peers: Vec<String>) -> Result<Self> {
        if peers.is_empty() {
            return Err(PeerError::NoPeers);
        }

        Ok(Self {
            peers,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Return the current peer and advance the cursor
    pub fn next_peer(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.peers.len();
        let peer = &self.peers[index];

        debug!(peer = %peer, index = index, "Selected peer (round-robin)");
        peer
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }
}
