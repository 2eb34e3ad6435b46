//! Configuration types for the simulator.

use crate::Scenario;
use gpss_simulation::{SimulationConfig, TickMode};
use gpss_types::Tick;

/// Configuration for a scenario run.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Topology to build.
    pub scenario: Scenario,

    /// Model time to simulate. `None` uses the scenario's working day.
    pub ticks: Option<Tick>,

    /// Random seed for the pipeline sampler.
    pub seed: u64,

    /// Tick scheduling mode.
    pub mode: TickMode,

    /// Dedicated worker threads for parallel ticks.
    pub threads: Option<usize>,
}

impl SimulatorConfig {
    /// Create a new simulator configuration.
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            ticks: None,
            seed: 12345,
            mode: TickMode::default(),
            threads: None,
        }
    }

    /// Set the number of ticks to run.
    pub fn with_ticks(mut self, ticks: Tick) -> Self {
        self.ticks = Some(ticks);
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the tick mode.
    pub fn with_mode(mut self, mode: TickMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run parallel ticks on a dedicated pool.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Ticks this run will simulate.
    pub fn horizon(&self) -> Tick {
        self.ticks.unwrap_or_else(|| self.scenario.default_ticks())
    }

    /// Convert to the pipeline configuration.
    pub fn to_simulation_config(&self) -> SimulationConfig {
        let config = SimulationConfig::new(self.seed).with_mode(self.mode);
        match self.threads {
            Some(threads) => config.with_threads(threads),
            None => config,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(Scenario::Barbershop)
    }
}
