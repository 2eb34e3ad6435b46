//! Block variants.
//!
//! | Block | Holds | Admission | Per tick |
//! |-------|-------|-----------|----------|
//! | [`Generator`] | nothing | always rejects | creates transactions on birth ticks |
//! | [`Queue`] | unbounded FIFO | always | drains the head while downstream accepts |
//! | [`Advance`] | delayed set | always | counts down, releases finished |
//! | [`Facility`] | one | when idle | counts down service, hands off |
//! | [`BifacilityIn`] / [`BifacilityOut`] | one lease | when idle / leased id only | - |
//! | [`Split`] | nothing | when it has destinations | - |
//! | [`Aggregate`] | partial joins | per fragment | - |
//! | [`Assign`], [`Check`], [`Count`] | nothing | when downstream accepts | - |
//! | [`Sink`] | terminated | always | - |
//!
//! Blocks that hold nothing do all their work inside `append_transact`, so a
//! transaction can cross any number of them within a single tick.

mod advance;
mod aggregate;
mod assign;
mod bifacility;
mod check;
mod count;
mod facility;
mod generator;
mod queue;
mod sink;
mod split;

pub use advance::Advance;
pub use aggregate::Aggregate;
pub use assign::Assign;
pub use bifacility::{Bifacility, BifacilityIn, BifacilityOut};
pub use check::{Check, CheckFn};
pub use count::Count;
pub use facility::Facility;
pub use generator::{BirthFn, GenerationPolicy, Generator};
pub use queue::Queue;
pub use sink::Sink;
pub use split::{Split, SplitFn};

/// Parameter a resource writes with its own name while it holds a
/// transaction.
pub const FACILITY_PARAM: &str = "facility";
