//! Shared fixtures for gpss tests.
//!
//! - [`Harness`]: a minimal block registry that hands out [`TickContext`]s, so
//!   a block can be unit tested against real neighbours without a pipeline
//! - [`ProbeBlock`]: a destination that records what it is offered and
//!   accepts or rejects on command
//! - [`MidpointSampler`] and [`ScriptedSampler`]: deterministic samplers
//!
//! [`TickContext`]: gpss_core::TickContext

mod harness;
mod probe;
mod samplers;

pub use harness::Harness;
pub use probe::ProbeBlock;
pub use samplers::{MidpointSampler, ScriptedSampler};

use gpss_types::{Tick, Transaction, TransactionId};

/// A fresh transaction with the given raw id.
pub fn transaction(id: u64, born: Tick) -> Transaction {
    Transaction::new(TransactionId(id), born)
}

/// Fragment `part` of `total` of `parent`, with the given raw id.
pub fn fragment(parent: &Transaction, id: u64, part: u32, total: u32) -> Transaction {
    parent.fragment(TransactionId(id), part, total)
}
