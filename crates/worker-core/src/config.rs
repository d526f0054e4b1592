//! Configuration management for resource-worker
//!
//! Sources are layered with the following precedence (highest first):
//! 1. Command line arguments (applied by the binary)
//! 2. Legacy environment variables (`STATS_PUBLISHER`, `NODE_NAME`, ...)
//! 3. Environment variables with the `RESOURCE_WORKER__` prefix
//! 4. Configuration file
//! 5. Defaults

use crate::{Result, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "RESOURCE_WORKER_CONFIG";

const ENV_PREFIX: &str = "RESOURCE_WORKER";
const DEFAULT_CONFIG_FILE: &str = "./resource-worker.yaml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Node identity
    pub node: NodeConfig,

    /// HTTP transport
    pub server: ServerConfig,

    /// Metrics publisher selection
    pub metrics: MetricsConfig,

    /// Peer discovery and network load
    pub peers: PeerConfig,

    /// Block I/O generator
    pub blkio: BlockIoConfig,

    /// Logging
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let fallback = std::env::var(CONFIG_PATH_ENV)
                    .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
                builder = builder.add_source(config::File::with_name(&fallback).required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("peers.static_peers")
                .try_parsing(true),
        );

        let mut parsed: Self = builder.build()?.try_deserialize()?;
        parsed.apply_legacy_env(|key| std::env::var(key).ok());
        parsed.validate()?;

        Ok(parsed)
    }

    /// Load configuration from a specific file on top of the defaults
    pub fn load_from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path.into()));

        let parsed: Self = builder.build()?.try_deserialize()?;
        parsed.validate()?;

        Ok(parsed)
    }

    /// Apply the environment variables the worker has always honoured
    ///
    /// `lookup` abstracts `std::env::var` so the mapping can be exercised
    /// without touching the process environment.
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(publisher) = lookup("STATS_PUBLISHER") {
            self.metrics.publisher = publisher;
        }
        if let Some(node_name) = lookup("NODE_NAME") {
            self.node.name = node_name;
        }
        if let Some(hostname) = lookup("HOSTNAME") {
            self.node.hostname = hostname;
        }
        if let Some(address) = lookup("POD_IP") {
            self.node.address = Some(address);
        }
        if let Some(host) = lookup("STATSD_HOST") {
            self.metrics.statsd_host = Some(host);
        }
        if let Some(port) = lookup("STATSD_PORT").and_then(|port| port.parse().ok()) {
            self.metrics.statsd_port = port;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.metrics.validate()?;
        self.peers.validate()?;

        Ok(())
    }

    /// Address the HTTP transport binds to
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind_ip, self.server.port)
    }
}

/// Node identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Cluster node name, used as the `node` metrics dimension
    pub name: String,

    /// Member name of this worker in the peer directory, excluded from the ring
    pub hostname: String,

    /// Own address in the peer directory, also excluded from the ring
    pub address: Option<String>,
}

impl NodeConfig {
    /// Whether a directory member refers to this worker
    pub fn is_self(&self, member_name: &str, member_address: &str) -> bool {
        (!self.hostname.is_empty() && member_name == self.hostname)
            || self.address.as_deref() == Some(member_address)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            hostname: String::new(),
            address: None,
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind to
    pub bind_ip: IpAddr,

    /// Listen port for `/run`, `/network-endpoint` and `/metrics`
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            max_request_size: 256 * 1024 * 1024,
        }
    }
}

/// Metrics publisher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Backend name: `prometheus` or `statsd`
    pub publisher: String,

    /// StatsD aggregator host, required for the `statsd` publisher
    pub statsd_host: Option<String>,

    /// StatsD aggregator port
    pub statsd_port: u16,

    /// Prefix prepended to every StatsD metric name
    pub statsd_prefix: String,
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        match self.publisher.as_str() {
            "prometheus" => Ok(()),
            "statsd" => {
                if self.statsd_host.as_deref().map_or(true, str::is_empty) {
                    return Err(crate::Error::config(
                        "STATSD_HOST must be defined for the statsd publisher",
                    ));
                }
                Ok(())
            }
            other => Err(crate::Error::config(format!(
                "Unrecognized stats publisher service: {}",
                other
            ))),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            publisher: "prometheus".to_string(),
            statsd_host: None,
            statsd_port: 8125,
            statsd_prefix: "hyperpilot.resource-worker-service".to_string(),
        }
    }
}

/// Peer discovery and network load configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Fixed member list, entries are `address` or `name=address`
    pub static_peers: Vec<String>,

    /// Headless service name resolved to discover members
    pub dns_service: Option<String>,

    /// Members (this node included) the directory must report before the ring is built
    pub expected_members: usize,

    /// Port targeted on every peer
    pub peer_port: u16,

    /// Delay between membership readiness polls
    pub poll_interval_ms: u64,

    /// Timeout for a single network-load POST
    pub request_timeout_seconds: u64,
}

impl PeerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(crate::Error::config("Peer poll interval must be > 0"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(crate::Error::config("Peer request timeout must be > 0"));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            static_peers: Vec::new(),
            dns_service: None,
            expected_members: 0,
            peer_port: DEFAULT_PORT,
            poll_interval_ms: 3000,
            request_timeout_seconds: 30,
        }
    }
}

/// Block I/O generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockIoConfig {
    /// Pre-existing file read by block I/O requests
    pub data_file: PathBuf,

    /// Directory for temp files, the system default when unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for BlockIoConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("testfile"),
            temp_dir: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), RUST_LOG wins when set
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 7998);
        assert_eq!(config.peers.peer_port, 7998);
        assert_eq!(config.metrics.publisher, "prometheus");
        assert_eq!(config.bind_addr().port(), 7998);
    }

    #[test]
    fn test_metrics_validation() {
        let mut metrics = MetricsConfig::default();
        assert!(metrics.validate().is_ok());

        metrics.publisher = "statsd".to_string();
        assert!(metrics.validate().is_err());

        metrics.statsd_host = Some("statsd".to_string());
        assert!(metrics.validate().is_ok());

        metrics.publisher = "graphite".to_string();
        let err = metrics.validate().unwrap_err();
        assert!(err.to_string().contains("graphite"));
    }

    #[test]
    fn test_peer_validation() {
        let mut peers = PeerConfig::default();
        assert!(peers.validate().is_ok());
        assert_eq!(peers.request_timeout(), Duration::from_secs(30));

        peers.poll_interval_ms = 0;
        assert!(peers.validate().is_err());

        peers.poll_interval_ms = 10;
        peers.request_timeout_seconds = 0;
        assert!(peers.validate().is_err());
    }

    #[test]
    fn test_legacy_env_mapping() {
        let env: HashMap<&str, &str> = [
            ("STATS_PUBLISHER", "statsd"),
            ("NODE_NAME", "node-a"),
            ("HOSTNAME", "resource-worker-0"),
            ("STATSD_HOST", "10.0.0.5"),
            ("STATSD_PORT", "9125"),
            ("POD_IP", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_legacy_env(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.metrics.publisher, "statsd");
        assert_eq!(config.node.name, "node-a");
        assert_eq!(config.node.hostname, "resource-worker-0");
        assert_eq!(config.metrics.statsd_host.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.metrics.statsd_port, 9125);
        // Empty values are ignored
        assert_eq!(config.node.address, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_self() {
        let node = NodeConfig {
            name: "node-a".to_string(),
            hostname: "resource-worker-1".to_string(),
            address: Some("10.1.0.7".to_string()),
        };

        assert!(node.is_self("resource-worker-1", "10.1.0.9"));
        assert!(node.is_self("10.1.0.7", "10.1.0.7"));
        assert!(!node.is_self("resource-worker-2", "10.1.0.8"));

        // An unset hostname never matches an unnamed member
        let anonymous = NodeConfig::default();
        assert!(!anonymous.is_self("", "10.1.0.8"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  port: 8000\npeers:\n  static_peers:\n    - 10.0.0.1\n    - worker-2=10.0.0.2\nblkio:\n  data_file: /data/testfile"
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.peers.static_peers.len(), 2);
        assert_eq!(config.blkio.data_file, PathBuf::from("/data/testfile"));
        // Untouched sections keep their defaults
        assert_eq!(config.metrics.publisher, "prometheus");
        assert_eq!(config.peers.peer_port, 7998);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, deserialized);
    }
}
