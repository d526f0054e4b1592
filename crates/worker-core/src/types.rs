//! Resource request descriptors
//!
//! A [`ResourceRequest`] is a composite of up to four optional sub-requests.
//! Numeric fields are signed so that a negative value reaches validation and
//! is reported as a failed sub-request instead of a malformed body.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rounds applied when a sub-request does not specify any
pub const DEFAULT_ROUNDS: i64 = 1;

/// Bytes per KB for the legacy network `size` field
pub const NETWORK_KB: i64 = 1000;

/// Burn a number of CPU cycles, optionally jittered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuRequest {
    /// Busy-loop iterations per round
    pub cycles: i64,

    /// Jitter applied to `cycles`, in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<i64>,
}

impl CpuRequest {
    pub fn new(cycles: i64) -> Self {
        Self {
            cycles,
            noise: None,
            rounds: None,
        }
    }

    pub fn noise(&self) -> i64 {
        self.noise.unwrap_or(0)
    }

    pub fn rounds(&self) -> i64 {
        self.rounds.unwrap_or(DEFAULT_ROUNDS)
    }
}

/// Allocate and repeatedly walk a buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRequest {
    /// Buffer size in MB
    pub size: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<i64>,
}

impl MemoryRequest {
    pub fn new(size: i64) -> Self {
        Self { size, rounds: None }
    }

    pub fn rounds(&self) -> i64 {
        self.rounds.unwrap_or(DEFAULT_ROUNDS)
    }
}

/// Send a payload to the next peer in the ring
///
/// Older clients send `size` in KB, newer ones send `bandwidth` in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<i64>,
}

impl NetworkRequest {
    pub fn with_bandwidth(bytes: i64) -> Self {
        Self {
            bandwidth: Some(bytes),
            ..Default::default()
        }
    }

    pub fn with_size_kb(size: i64) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    /// Payload size in bytes; `bandwidth` takes precedence over `size`
    pub fn payload_bytes(&self) -> Option<i64> {
        self.bandwidth
            .or_else(|| self.size.map(|kb| kb.saturating_mul(NETWORK_KB)))
    }

    pub fn rounds(&self) -> i64 {
        self.rounds.unwrap_or(DEFAULT_ROUNDS)
    }
}

/// Read from the data file and write throwaway temp files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockIoRequest {
    /// Bytes to read per round, zero skips the read
    #[serde(default)]
    pub read_size: i64,

    /// Bytes to write per round, zero skips the write
    #[serde(default)]
    pub write_size: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<i64>,
}

impl BlockIoRequest {
    pub fn rounds(&self) -> i64 {
        self.rounds.unwrap_or(DEFAULT_ROUNDS)
    }
}

/// Composite request; sub-requests run in CPU, memory, network, block I/O order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<MemoryRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blkio: Option<BlockIoRequest>,
}

impl ResourceRequest {
    pub fn cpu(request: CpuRequest) -> Self {
        Self {
            cpu: Some(request),
            ..Default::default()
        }
    }

    pub fn memory(request: MemoryRequest) -> Self {
        Self {
            mem: Some(request),
            ..Default::default()
        }
    }

    pub fn network(request: NetworkRequest) -> Self {
        Self {
            network: Some(request),
            ..Default::default()
        }
    }

    pub fn block_io(request: BlockIoRequest) -> Self {
        Self {
            blkio: Some(request),
            ..Default::default()
        }
    }

    /// Kinds of the sub-requests present, in execution order
    pub fn kinds(&self) -> Vec<SubRequestKind> {
        let mut kinds = Vec::with_capacity(4);
        if self.cpu.is_some() {
            kinds.push(SubRequestKind::Cpu);
        }
        if self.mem.is_some() {
            kinds.push(SubRequestKind::Memory);
        }
        if self.network.is_some() {
            kinds.push(SubRequestKind::Network);
        }
        if self.blkio.is_some() {
            kinds.push(SubRequestKind::BlockIo);
        }
        kinds
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }
}

/// Sub-request type, used to tag failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubRequestKind {
    Cpu,
    Memory,
    Network,
    BlockIo,
}

impl SubRequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubRequestKind::Cpu => "CPU",
            SubRequestKind::Memory => "Memory",
            SubRequestKind::Network => "Network",
            SubRequestKind::BlockIo => "BlkIO",
        }
    }
}

impl fmt::Display for SubRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch of requests submitted in one `/run` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Work {
    #[serde(default)]
    pub requests: Vec<ResourceRequest>,

    /// Metrics dimension for the whole batch
    #[serde(default)]
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_parsing() {
        let work: Work = serde_json::from_str(
            r#"{"requests":[{"cpu":{"cycles":1000}},{"mem":{"size":2,"rounds":3}}],"label":"t1"}"#,
        )
        .unwrap();

        assert_eq!(work.label, "t1");
        assert_eq!(work.requests.len(), 2);
        assert_eq!(work.requests[0].cpu, Some(CpuRequest::new(1000)));
        assert_eq!(work.requests[1].mem.as_ref().unwrap().rounds(), 3);
    }

    #[test]
    fn test_defaults() {
        let cpu: CpuRequest = serde_json::from_str(r#"{"cycles":5}"#).unwrap();
        assert_eq!(cpu.noise(), 0);
        assert_eq!(cpu.rounds(), 1);

        let work: Work = serde_json::from_str(r#"{"requests":[]}"#).unwrap();
        assert!(work.label.is_empty());
    }

    #[test]
    fn test_cpu_requires_cycles() {
        assert!(serde_json::from_str::<CpuRequest>(r#"{"noise":5}"#).is_err());
    }

    #[test]
    fn test_block_io_camel_case_fields() {
        let request: ResourceRequest =
            serde_json::from_str(r#"{"blkio":{"readSize":4096,"writeSize":512}}"#).unwrap();
        let blkio = request.blkio.unwrap();
        assert_eq!(blkio.read_size, 4096);
        assert_eq!(blkio.write_size, 512);
        assert_eq!(blkio.rounds(), 1);
    }

    #[test]
    fn test_network_payload_bytes() {
        assert_eq!(NetworkRequest::with_size_kb(3).payload_bytes(), Some(3000));
        assert_eq!(NetworkRequest::with_bandwidth(100).payload_bytes(), Some(100));

        let both = NetworkRequest {
            size: Some(1),
            bandwidth: Some(42),
            rounds: None,
        };
        assert_eq!(both.payload_bytes(), Some(42));
        assert_eq!(NetworkRequest::default().payload_bytes(), None);
    }

    #[test]
    fn test_kinds_in_execution_order() {
        let request: ResourceRequest = serde_json::from_str(
            r#"{"blkio":{"writeSize":1},"cpu":{"cycles":1},"network":{"bandwidth":1}}"#,
        )
        .unwrap();

        assert_eq!(
            request.kinds(),
            vec![
                SubRequestKind::Cpu,
                SubRequestKind::Network,
                SubRequestKind::BlockIo
            ]
        );
        assert!(!request.is_empty());
        assert!(ResourceRequest::default().is_empty());
    }

    #[test]
    fn test_sub_request_kind_display() {
        assert_eq!(SubRequestKind::Memory.to_string(), "Memory");
        assert_eq!(SubRequestKind::BlockIo.to_string(), "BlkIO");
    }
}
