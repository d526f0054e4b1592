//! CPU load generator

use crate::{check_rounds, LoadError, Result};
use rand::Rng;
use std::hint::black_box;
use worker_core::CpuRequest;

pub fn validate(request: &CpuRequest) -> Result<()> {
    if request.cycles < 0 {
        return Err(LoadError::Validation(
            "Number of cycles in a cpu request cannot be negative!".to_string(),
        ));
    }
    if !(0..=100).contains(&request.noise()) {
        return Err(LoadError::Validation(format!(
            "Noise of a cpu request must be between 0 and 100, got {}",
            request.noise()
        )));
    }
    check_rounds(request.rounds())
}

/// Multiplier applied to the requested cycles
///
/// Uniform in `[1 - noise/100, 1 + noise/100]`, exactly `1.0` without noise.
pub fn noise_ratio<R: Rng + ?Sized>(noise: i64, rng: &mut R) -> f64 {
    if noise == 0 {
        return 1.0;
    }

    let spread = noise as f64 / 100.0;
    1.0 + rng.gen_range(-spread..=spread)
}

/// Effective cycles per round once noise is applied
pub fn effective_cycles(cycles: i64, ratio: f64) -> u64 {
    if ratio == 1.0 {
        return cycles as u64;
    }
    (cycles as f64 * ratio).round().max(0.0) as u64
}

/// Burn CPU for the request, returning the number of loop iterations executed
///
/// Blocking; callers on the async runtime go through `spawn_blocking`.
pub fn run_cpu(request: &CpuRequest) -> Result<u64> {
    validate(request)?;

    // Drawn once, every round burns the same amount
    let ratio = noise_ratio(request.noise(), &mut rand::thread_rng());
    let cycles = effective_cycles(request.cycles, ratio);

    let mut iterations = 0u64;
    for _ in 0..request.rounds() {
        iterations += burn(cycles);
    }

    Ok(iterations)
}

fn burn(cycles: u64) -> u64 {
    let mut executed = 0u64;
    for _ in 0..cycles {
        executed = black_box(executed + 1);
    }
    executed
}
