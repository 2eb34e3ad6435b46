//! gpss Simulator
//!
//! Runs the built-in demonstration topologies on top of `gpss-simulation`.
//!
//! # Architecture
//!
//! - **Scenarios**: barbershop, cafe, water closet and restaurant topologies
//! - **Runner**: background run with a Ctrl+C stop at a tick boundary
//! - **Metrics**: lifetime percentiles of terminated transactions
//! - **Configuration**: scenario, horizon, seed and tick mode
//!
//! # Example
//!
//! ```ignore
//! use gpss_simulator::{Scenario, Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::new(Scenario::Cafe)
//!     .with_ticks(480)
//!     .with_seed(42);
//!
//! let report = Simulator::new(config).run().await?;
//! report.print_summary();
//! ```

pub mod config;
pub mod metrics;
pub mod runner;
pub mod scenarios;

pub use config::SimulatorConfig;
pub use metrics::LifetimeSummary;
pub use runner::{Simulator, SimulatorError, SimulatorReport};
pub use scenarios::Scenario;
