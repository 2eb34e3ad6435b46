//! Pipeline scheduler.
//!
//! A [`Pipeline`] owns the block registry, the model clock, the transaction id
//! allocator and the sampler, and drives every block once per tick.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Pipeline                          │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  blocks: Vec<Box<dyn Block>>   (indexed by BlockId)│ │
//! │  │  names:  IndexMap<String, BlockId>                 │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ tick t                      │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  handle_transacts(ctx) on every block              │ │
//! │  │  Parallel: rayon par_iter, joined before t + 1     │ │
//! │  │  Sequential: registration order                    │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ offers chain downstream     │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  horizon or stop: report, on_done, watch(true)     │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod builder;
mod config;
mod error;
mod handle;
mod pipeline;
mod report;

pub use builder::PipelineBuilder;
pub use config::{SimulationConfig, TickMode};
pub use error::{BuildError, SimulationError};
pub use handle::SimulationHandle;
pub use pipeline::Pipeline;
pub use report::PipelineReport;
