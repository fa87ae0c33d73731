//! Startup CPU micro-benchmark.
//!
//! Scores the host with a small fixed arithmetic workload so results
//! gathered on different machines can be normalized afterwards. The
//! workload is seeded and deterministic; only the timing varies.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::hint::black_box;
use std::time::Instant;

/// Iterations of the scoring kernel. Takes well under a second on anything
/// built this century.
const KERNEL_ITERATIONS: usize = 1 << 21;

/// Runs the benchmark and returns a score in millions of kernel iterations
/// per second. Higher is faster.
pub fn benchmark_score(seed: u64) -> f64 {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let start = Instant::now();
    let mut acc = 0.0f64;
    for _ in 0..KERNEL_ITERATIONS {
        let x: f64 = rng.random_range(0.0..1.0);
        acc += (x * 1.5 - 0.25).abs().sqrt();
    }
    let elapsed = start.elapsed();
    black_box(acc);
    KERNEL_ITERATIONS as f64 / elapsed.as_secs_f64() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_positive_and_finite() {
        let score = benchmark_score(1234);
        assert!(score.is_finite());
        assert!(score > 0.0);
    }
}
