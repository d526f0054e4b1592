//! Peer directory backends

use crate::{PeerError, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use tracing::{debug, info};
use worker_core::PeerConfig;

/// A member of the deployment as reported by a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMember {
    /// Member name, the address itself when the directory has no names
    pub name: String,

    /// Address targeted by network load (host or host:port)
    pub address: String,
}

impl PeerMember {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Source of deployment membership
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    /// Whether membership has settled and can be listed
    async fn is_ready(&self) -> Result<bool>;

    /// List every member, this worker included
    async fn members(&self) -> Result<Vec<PeerMember>>;

    /// Backend name for logging
    fn describe(&self) -> String;
}

/// Fixed member list from configuration
#[derive(Debug, Clone)]
pub struct StaticPeerDirectory {
    members: Vec<PeerMember>,
}

impl StaticPeerDirectory {
    /// Parse entries of the form `address` or `name=address`
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let members = entries
            .iter()
            .map(|entry| Self::parse_entry(entry.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { members })
    }

    fn parse_entry(entry: &str) -> Result<PeerMember> {
        let entry = entry.trim();
        match entry.split_once('=') {
            Some((name, address)) => {
                let (name, address) = (name.trim(), address.trim());
                if name.is_empty() || address.is_empty() {
                    return Err(PeerError::InvalidEntry(entry.to_string()));
                }
                Ok(PeerMember::new(name, address))
            }
            None if entry.is_empty() => Err(PeerError::InvalidEntry(entry.to_string())),
            None => Ok(PeerMember::new(entry, entry)),
        }
    }
}

#[async_trait]
impl PeerDirectory for StaticPeerDirectory {
    async fn is_ready(&self) -> Result<bool> {
        Ok(true)
    }

    async fn members(&self) -> Result<Vec<PeerMember>> {
        Ok(self.members.clone())
    }

    fn describe(&self) -> String {
        format!("static({} entries)", self.members.len())
    }
}

/// Members discovered by resolving a headless service name
///
/// Every address the name resolves to is one member. The directory is ready
/// once at least `expected_members` distinct addresses resolve.
#[derive(Debug, Clone)]
pub struct DnsPeerDirectory {
    service: String,
    expected_members: usize,
}

impl DnsPeerDirectory {
    pub fn new(service: impl Into<String>, expected_members: usize) -> Self {
        Self {
            service: service.into(),
            expected_members,
        }
    }

    async fn resolve(&self) -> Result<Vec<String>> {
        let addrs = tokio::net::lookup_host((self.service.as_str(), 0))
            .await
            .map_err(|source| PeerError::DnsResolution {
                service: self.service.clone(),
                source,
            })?;

        // Sorted so every worker builds its ring in the same order
        let unique: BTreeSet<_> = addrs.map(|addr| addr.ip()).collect();
        let resolved: Vec<String> = unique.into_iter().map(|ip| ip.to_string()).collect();

        debug!(service = %self.service, count = resolved.len(), "Resolved peer service");
        Ok(resolved)
    }
}

#[async_trait]
impl PeerDirectory for DnsPeerDirectory {
    async fn is_ready(&self) -> Result<bool> {
        let resolved = self.resolve().await?;
        Ok(resolved.len() >= self.expected_members)
    }

    async fn members(&self) -> Result<Vec<PeerMember>> {
        let resolved = self.resolve().await?;
        Ok(resolved
            .into_iter()
            .map(|address| PeerMember::new(address.clone(), address))
            .collect())
    }

    fn describe(&self) -> String {
        format!("dns({}, expecting {})", self.service, self.expected_members)
    }
}

/// Build the directory selected by configuration, `None` when no peers are configured
///
/// A DNS service takes precedence over a static list.
pub fn build_directory(config: &PeerConfig) -> Result<Option<Box<dyn PeerDirectory>>> {
    if let Some(service) = config.dns_service.as_deref().filter(|s| !s.is_empty()) {
        info!(service = %service, expected = config.expected_members, "Using DNS peer directory");
        return Ok(Some(Box::new(DnsPeerDirectory::new(
            service,
            config.expected_members,
        ))));
    }

    if !config.static_peers.is_empty() {
        let directory = StaticPeerDirectory::from_entries(&config.static_peers)?;
        info!(peers = config.static_peers.len(), "Using static peer directory");
        return Ok(Some(Box::new(directory)));
    }

    Ok(None)
}
