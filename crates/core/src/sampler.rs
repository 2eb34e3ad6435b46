//! Random sampling capability injected into the pipeline.
//!
//! Every stochastic choice a block makes (delays, split counts, destination
//! picks) goes through a [`Sampler`], so a whole run is reproducible from a
//! single seed and tests can substitute a scripted sampler.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of uniformly distributed integers.
pub trait Sampler: Send + Sync {
    /// Return an integer uniformly distributed in `[min, max]` (inclusive).
    ///
    /// Implementations must return `min` when `min >= max`.
    fn sample(&self, min: i64, max: i64) -> i64;
}

/// Default sampler: a ChaCha8 stream behind a mutex.
pub struct SeededSampler {
    rng: Mutex<ChaCha8Rng>,
}

impl SeededSampler {
    /// Create a sampler seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl Sampler for SeededSampler {
    fn sample(&self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        self.rng.lock().gen_range(min..=max)
    }
}

impl std::fmt::Debug for SeededSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededSampler").finish_non_exhaustive()
    }
}

/// Sample a duration of `mean ± half_range`, clamped at zero.
///
/// The sampler is not consulted when `half_range` is zero.
pub fn spread(sampler: &dyn Sampler, mean: u64, half_range: u64) -> u64 {
    if half_range == 0 {
        return mean;
    }
    let mean = mean as i64;
    let half_range = half_range as i64;
    sampler.sample(mean - half_range, mean + half_range).max(0) as u64
}

/// Pick `k` distinct indices out of `0..n`, returned in ascending order.
pub fn choose_distinct(sampler: &dyn Sampler, n: usize, k: usize) -> Vec<usize> {
    let k = k.min(n);
    // Partial Fisher-Yates over the index range
    let mut pool: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = sampler.sample(i as i64, (n - 1) as i64) as usize;
        pool.swap(i, j);
    }
    let mut chosen = pool[..k].to_vec();
    chosen.sort_unstable();
    chosen
}
