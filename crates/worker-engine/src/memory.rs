//! Memory load generator

use crate::{check_rounds, LoadError, Result};
use std::hint::black_box;
use worker_core::MemoryRequest;

const BYTES_PER_MB: i64 = 1024 * 1024;
const ELEMENT_BYTES: i64 = std::mem::size_of::<i64>() as i64;

pub fn validate(request: &MemoryRequest) -> Result<()> {
    if request.size <= 0 {
        return Err(LoadError::Validation(
            "Size of a memory request must be positive!".to_string(),
        ));
    }
    check_rounds(request.rounds())
}

/// Allocate `size` MB of eight-byte elements and walk them once per round
///
/// Every pass adds `1 / size` to each element, which is zero for any size
/// above one MB; the walk still touches every page. Returns the number of
/// elements allocated.
pub fn run_memory(request: &MemoryRequest) -> Result<usize> {
    validate(request)?;

    let bytes = request
        .size
        .checked_mul(BYTES_PER_MB)
        .ok_or(LoadError::AllocationFailure { bytes: u64::MAX })?;
    let alloc_failure = || LoadError::AllocationFailure { bytes: bytes as u64 };
    let elements = usize::try_from(bytes / ELEMENT_BYTES).map_err(|_| alloc_failure())?;

    let mut buffer: Vec<i64> = Vec::new();
    buffer
        .try_reserve_exact(elements)
        .map_err(|_| alloc_failure())?;
    buffer.resize(elements, 0);
    if buffer.len() != elements {
        return Err(alloc_failure());
    }

    let increment = 1 / request.size;
    for _ in 0..request.rounds() {
        for value in buffer.iter_mut() {
            *value = value.wrapping_add(increment);
        }
        black_box(&buffer);
    }

    Ok(buffer.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_exact_element_count() {
        assert_eq!(run_memory(&MemoryRequest::new(1)).unwrap(), 131_072);

        let request = MemoryRequest {
            size: 2,
            rounds: Some(3),
        };
        assert_eq!(run_memory(&request).unwrap(), 262_144);
    }

    #[test]
    fn test_non_positive_size_rejected() {
        for size in [0, -4] {
            let err = run_memory(&MemoryRequest::new(size)).unwrap_err();
            assert_eq!(err.to_string(), "Size of a memory request must be positive!");
        }
    }

    #[test]
    fn test_oversized_request_fails_allocation() {
        let err = run_memory(&MemoryRequest::new(i64::MAX)).unwrap_err();
        assert!(matches!(err, LoadError::AllocationFailure { .. }));
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let request = MemoryRequest {
            size: 1,
            rounds: Some(0),
        };
        assert!(matches!(run_memory(&request), Err(LoadError::Validation(_))));
    }
}
