//! # worker-engine
//!
//! Synthetic load generators and request dispatch for resource-worker.
//!
//! Each generator consumes one kind of resource on command:
//! - [`cpu`] busy-loops for a number of cycles
//! - [`memory`] allocates a buffer and walks it
//! - [`network`] posts payloads to the next peer in the ring
//! - [`blkio`] reads a data file and writes throwaway temp files
//!
//! [`RequestDispatcher`] runs the sub-requests of one composite request in a
//! fixed order and [`run_batch`] runs a whole batch, stopping at the first
//! failure.

pub mod blkio;
pub mod cpu;
pub mod dispatcher;
pub mod error;
pub mod memory;
pub mod network;

pub use blkio::{BlockIoLoad, BlockIoStats};
pub use dispatcher::{run_batch, RequestDispatcher, ResourceRunner};
pub use error::{BatchError, DispatchError, LoadError, Result};
pub use network::NetworkLoad;

/// Reject a round count below one
pub(crate) fn check_rounds(rounds: i64) -> Result<()> {
    if rounds < 1 {
        return Err(LoadError::Validation(format!(
            "Rounds must be at least 1, got {}",
            rounds
        )));
    }
    Ok(())
}
