//! Core types for the gpss simulation engine.
//!
//! This crate holds the plain data shared by every other crate: the
//! [`Transaction`] record that flows through a pipeline, its parameter bag,
//! and the identifier newtypes for transactions and blocks.

mod identifiers;
mod parameter;
mod transaction;

pub use identifiers::{BlockId, Tick, TransactionId};
pub use parameter::{ParamValue, Parameter};
pub use transaction::{SplitParts, Transaction};
