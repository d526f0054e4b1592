//! Composite request dispatch and batch execution

use crate::{cpu, memory, BatchError, BlockIoLoad, DispatchError, LoadError, NetworkLoad};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use worker_core::{ResourceRequest, SubRequestKind, Work};

/// Executes one composite request
#[async_trait]
pub trait ResourceRunner: Send + Sync {
    async fn run(&self, request: &ResourceRequest) -> Result<(), DispatchError>;
}

/// Runs sub-requests in CPU, memory, network, block I/O order
///
/// The first failing sub-request stops the request. CPU, memory and block
/// I/O generators block and run on the blocking pool.
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    network: NetworkLoad,
    blkio: Arc<BlockIoLoad>,
}

impl RequestDispatcher {
    pub fn new(network: NetworkLoad, blkio: BlockIoLoad) -> Self {
        Self {
            network,
            blkio: Arc::new(blkio),
        }
    }

    pub fn network(&self) -> &NetworkLoad {
        &self.network
    }

    /// Execute every sub-request present in `request`
    pub async fn dispatch(&self, request: &ResourceRequest) -> Result<(), DispatchError> {
        if request.is_empty() {
            return Err(DispatchError::UnrecognizedRequest);
        }

        if let Some(cpu_request) = request.cpu.clone() {
            let iterations = blocking(move || cpu::run_cpu(&cpu_request))
                .await
                .map_err(tagged(SubRequestKind::Cpu))?;
            debug!(iterations = iterations, "CPU request complete");
        }

        if let Some(mem_request) = request.mem.clone() {
            let elements = blocking(move || memory::run_memory(&mem_request))
                .await
                .map_err(tagged(SubRequestKind::Memory))?;
            debug!(elements = elements, "Memory request complete");
        }

        if let Some(network_request) = &request.network {
            let sent = self
                .network
                .run(network_request)
                .await
                .map_err(tagged(SubRequestKind::Network))?;
            debug!(bytes = sent, "Network request complete");
        }

        if let Some(blkio_request) = request.blkio.clone() {
            let load = self.blkio.clone();
            blocking(move || load.run(&blkio_request))
                .await
                .map_err(tagged(SubRequestKind::BlockIo))?;
        }

        Ok(())
    }
}

#[async_trait]
impl ResourceRunner for RequestDispatcher {
    async fn run(&self, request: &ResourceRequest) -> Result<(), DispatchError> {
        self.dispatch(request).await
    }
}

/// Run every request of the batch in order, stopping at the first failure
///
/// Requests already executed are not rolled back.
pub async fn run_batch<R>(runner: &R, work: &Work) -> Result<(), BatchError>
where
    R: ResourceRunner + ?Sized,
{
    for (index, request) in work.requests.iter().enumerate() {
        runner
            .run(request)
            .await
            .map_err(|source| BatchError { index, source })?;
    }

    Ok(())
}

fn tagged(kind: SubRequestKind) -> impl FnOnce(LoadError) -> DispatchError {
    move |source| DispatchError::SubRequest { kind, source }
}

async fn blocking<F, T>(task: F) -> crate::Result<T>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| LoadError::Worker(e.to_string()))?
}
