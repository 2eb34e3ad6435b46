//! Core abstractions for the gpss simulation engine.
//!
//! This crate defines the contract every block follows and the shared pieces
//! blocks are built from:
//!
//! - [`Block`]: the offer/tick/report capability, with [`BlockCore`] for
//!   identity and ordered routing
//! - [`TransactTable`]: the thread-safe FIFO each block keeps its
//!   transactions in
//! - [`TickContext`]: the per-tick view of the pipeline (clock, registry, id
//!   allocator, sampler)
//! - [`Sampler`]: the injected source of randomness
//! - [`BlockReport`]: statistics snapshots
//!
//! # Hand-off protocol
//!
//! ```text
//!   upstream                         downstream
//!   ────────                         ──────────
//!   handle_transacts(ctx)
//!     │ finished t
//!     ├── core.offer(&t, ctx) ─────▶ append_transact(&t, ctx)
//!     │                                │ admit: store own copy ── true
//!     │                                │ reject: no side effects ─ false
//!     ◀────────────── accepted? ───────┘
//!     │ true:  drop own copy
//!     │ false: keep t, retry next tick
//! ```
//!
//! No lock is held across an offer, so graphs may contain cycles.

mod context;
mod error;
mod report;
mod sampler;
mod table;
mod traits;

pub use context::{IdAllocator, TickContext};
pub use error::TableError;
pub use report::{
    ratio, AdvanceStats, AggregateStats, AssignStats, BifacilityStats, BlockReport, BlockStats,
    CheckStats, CountStats, FacilityStats, GeneratorStats, HolderInfo, PendingJoin, QueueStats,
    SinkStats, SplitStats,
};
pub use sampler::{choose_distinct, spread, SeededSampler, Sampler};
pub use table::TransactTable;
pub use traits::{Block, BlockCore};
