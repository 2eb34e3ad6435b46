//! Scenario runner.
//!
//! Builds the configured scenario, runs it on a background thread and stops
//! it at a tick boundary on Ctrl+C.

use crate::config::SimulatorConfig;
use crate::metrics::LifetimeSummary;
use gpss_simulation::{BuildError, PipelineReport, SimulationError};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from a simulator run.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Pipeline build error: {0}")]
    Build(#[from] BuildError),
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("Histogram error: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

/// Final report of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorReport {
    pub scenario: String,
    pub seed: u64,
    pub wall_duration: Duration,
    pub pipeline: PipelineReport,
    /// `None` when nothing was terminated.
    pub lifetimes: Option<LifetimeSummary>,
}

impl SimulatorReport {
    pub fn print_summary(&self) {
        println!("\n═══════════════════════════════════════════");
        println!("  {} ", self.scenario);
        println!("═══════════════════════════════════════════");
        println!();
        print!("{}", self.pipeline);
        println!();
        match &self.lifetimes {
            Some(lifetimes) => println!("Lifetimes: {lifetimes}"),
            None => println!("Lifetimes: n/a"),
        }
        println!(
            "Seed {} | Mode {} | Wall time {:.3}s",
            self.seed,
            self.pipeline.mode,
            self.wall_duration.as_secs_f64()
        );
        println!("═══════════════════════════════════════════\n");
    }
}

/// Runs one scenario.
pub struct Simulator {
    config: SimulatorConfig,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Run to the horizon, or until Ctrl+C.
    pub async fn run(&self) -> Result<SimulatorReport, SimulatorError> {
        let scenario = self.config.scenario;
        let ticks = self.config.horizon();
        let pipeline = Arc::new(scenario.build(self.config.to_simulation_config())?);
        info!(
            %scenario,
            ticks,
            seed = self.config.seed,
            mode = %self.config.mode,
            blocks = pipeline.blocks().count(),
            "Starting simulation"
        );

        let started = Instant::now();
        let mut handle = pipeline.start(ticks)?;
        let interrupted = tokio::select! {
            _ = handle.finished() => false,
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                    false
                }
            },
        };
        if interrupted {
            info!("Received Ctrl+C, stopping at the next tick");
            handle.stop();
        }
        handle.finished().await;
        let report = handle.wait()?;
        let wall_duration = started.elapsed();

        let lifetimes = LifetimeSummary::collect(&pipeline)?;
        info!(
            ticks = report.ticks,
            transactions = report.transactions,
            wall_ms = wall_duration.as_millis() as u64,
            "Simulation complete"
        );

        Ok(SimulatorReport {
            scenario: scenario.to_string(),
            seed: self.config.seed,
            wall_duration,
            pipeline: report,
            lifetimes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scenario;
    use gpss_simulation::TickMode;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_runs_scenario_to_horizon() {
        let config = SimulatorConfig::new(Scenario::Barbershop)
            .with_ticks(200)
            .with_seed(3)
            .with_mode(TickMode::Sequential);
        let report = Simulator::new(config).run().await.unwrap();

        assert_eq!(report.pipeline.ticks, 200);
        assert!(!report.pipeline.stopped);
        assert!(report.lifetimes.is_some());
        assert!(logs_contain("Simulation complete"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scenario"], "Barbershop");
        assert_eq!(json["pipeline"]["ticks"], 200);
    }

    #[tokio::test]
    async fn test_sequential_reports_repeat() {
        let config = SimulatorConfig::new(Scenario::Cafe)
            .with_seed(9)
            .with_mode(TickMode::Sequential);
        let first = Simulator::new(config.clone()).run().await.unwrap();
        let second = Simulator::new(config).run().await.unwrap();
        assert_eq!(first.pipeline, second.pipeline);
        assert_eq!(first.lifetimes, second.lifetimes);
    }
}
