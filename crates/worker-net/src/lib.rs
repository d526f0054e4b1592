//! # worker-net
//!
//! Peer discovery for resource-worker.
//!
//! Network load is sent to other workers of the same deployment. This crate
//! provides:
//! - [`PeerDirectory`] backends listing deployment members (a static list
//!   from configuration, or a DNS name resolving to every member)
//! - [`PeerRing`], the fixed round-robin sequence of peers
//! - [`discover_peer_ring`], which waits for the membership to settle and
//!   builds the ring once at startup
//!
//! A worker without a ring still serves every other request kind.

use thiserror::Error;

pub mod bootstrap;
pub mod directory;
pub mod ring;
pub mod utils;

pub use bootstrap::discover_peer_ring;
pub use directory::{build_directory, DnsPeerDirectory, PeerDirectory, PeerMember, StaticPeerDirectory};
pub use ring::PeerRing;
pub use utils::peer_url;

/// Result type for peer operations
pub type Result<T> = std::result::Result<T, PeerError>;

/// Errors raised while discovering peers
#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Peer directory error: {0}")]
    Directory(String),

    #[error("DNS resolution error for {service}: {source}")]
    DnsResolution {
        service: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid peer entry: {0}")]
    InvalidEntry(String),

    #[error("No peers available")]
    NoPeers,
}
