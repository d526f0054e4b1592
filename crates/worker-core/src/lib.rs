//! # worker-core
//!
//! Core types and utilities for resource-worker, a node-local synthetic
//! load generator.
//!
//! This crate provides the pieces shared by every other resource-worker
//! component:
//!
//! - Resource request descriptors (`cpu`, `mem`, `network`, `blkio`) and batches
//! - Layered configuration (defaults, YAML file, environment)
//! - The configuration error type

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::{
    BlockIoConfig, Config, LoggingConfig, MetricsConfig, NodeConfig, PeerConfig, ServerConfig,
};
pub use error::{Error, Result};
pub use types::{
    BlockIoRequest, CpuRequest, MemoryRequest, NetworkRequest, ResourceRequest, SubRequestKind,
    Work,
};

/// Port every resource-worker listens on, and targets on its peers
pub const DEFAULT_PORT: u16 = 7998;

/// Path of the endpoint that absorbs synthetic network payloads
pub const NETWORK_ENDPOINT_PATH: &str = "/network-endpoint";
