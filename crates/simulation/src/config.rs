//! Configuration types for a pipeline run.

use serde::Serialize;
use std::fmt;

/// How blocks are driven within one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickMode {
    /// Every block is handled concurrently on a rayon pool and the tick ends
    /// once all of them are done.
    #[default]
    Parallel,

    /// Blocks are handled one after another in registration order on the
    /// calling thread. Runs are reproducible for a given seed.
    Sequential,
}

impl fmt::Display for TickMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickMode::Parallel => f.write_str("parallel"),
            TickMode::Sequential => f.write_str("sequential"),
        }
    }
}

/// Configuration for a pipeline.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Seed of the default sampler.
    pub seed: u64,

    /// Tick scheduling mode.
    pub mode: TickMode,

    /// Worker threads for parallel ticks. `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl SimulationConfig {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            mode: TickMode::default(),
            threads: None,
        }
    }

    /// Set the sampler seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the tick mode.
    pub fn with_mode(mut self, mode: TickMode) -> Self {
        self.mode = mode;
        self
    }

    /// Use a dedicated pool of `threads` workers for parallel ticks.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(12345)
    }
}
