//! Load-generation error taxonomy
//!
//! Generators fail with a [`LoadError`]; the dispatcher tags it with the
//! sub-request kind and the batch executor with the request index, so a
//! batch failure reads `"<index>: <kind> request failure: <cause>"`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use worker_core::SubRequestKind;

/// Result type for generators
pub type Result<T> = std::result::Result<T, LoadError>;

/// Failure of a single generator
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{0}")]
    Validation(String),

    #[error("Unable to allocate {bytes} bytes")]
    AllocationFailure { bytes: u64 },

    #[error("Unable to send payload to peer {peer}: {source}")]
    TransportFailure {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Peer {peer} rejected payload with status {status}")]
    PeerRejected { peer: String, status: u16 },

    #[error("No peers available for network load")]
    NetworkUnavailable,

    #[error("Unable to open {}: {source}", .path.display())]
    FileOpenFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to stat {}: {source}", .path.display())]
    FileStatFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to read {}: {source}", .path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to close {}: {source}", .path.display())]
    FileCloseFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Load task failed: {0}")]
    Worker(String),
}

impl LoadError {
    /// Short name of the failure class for logging
    pub fn category(&self) -> &'static str {
        match self {
            LoadError::Validation(_) => "validation",
            LoadError::AllocationFailure { .. } => "allocation",
            LoadError::TransportFailure { .. } => "transport",
            LoadError::PeerRejected { .. } => "peer_rejected",
            LoadError::NetworkUnavailable => "network_unavailable",
            LoadError::FileOpenFailure { .. } => "file_open",
            LoadError::FileStatFailure { .. } => "file_stat",
            LoadError::ReadFailure { .. } => "read",
            LoadError::WriteFailure { .. } => "write",
            LoadError::FileCloseFailure { .. } => "file_close",
            LoadError::Client(_) => "client",
            LoadError::Worker(_) => "worker",
        }
    }
}

/// Failure of a composite request
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{kind} request failure: {source}")]
    SubRequest {
        kind: SubRequestKind,
        #[source]
        source: LoadError,
    },

    #[error("Requested resource not recognized or implemented")]
    UnrecognizedRequest,
}

impl DispatchError {
    pub fn kind(&self) -> Option<SubRequestKind> {
        match self {
            DispatchError::SubRequest { kind, .. } => Some(*kind),
            DispatchError::UnrecognizedRequest => None,
        }
    }

    /// Failure class of the underlying generator error
    pub fn category(&self) -> &'static str {
        match self {
            DispatchError::SubRequest { source, .. } => source.category(),
            DispatchError::UnrecognizedRequest => "unrecognized",
        }
    }
}

/// Failure of a batch, carrying the index of the failing request
#[derive(Error, Debug)]
#[error("{index}: {source}")]
pub struct BatchError {
    pub index: usize,
    #[source]
    pub source: DispatchError,
}
