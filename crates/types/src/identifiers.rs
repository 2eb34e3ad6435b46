//! Domain-specific identifier types.

use serde::Serialize;
use std::fmt;

/// Simulated time, in ticks since the pipeline started.
pub type Tick = u64;

/// Transaction identifier.
///
/// Allocated by the pipeline, starting at 1. Zero is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Get the next transaction ID.
    pub fn next(self) -> Self {
        TransactionId(self.0 + 1)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction({})", self.0)
    }
}

/// Block identifier.
///
/// The index of a block in its pipeline, assigned in registration order.
/// Reports are ordered by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BlockId(pub usize);

impl BlockId {
    /// Placeholder used before a block is registered with a pipeline.
    pub const UNREGISTERED: Self = BlockId(usize::MAX);

    /// Get the raw index.
    pub fn index(&self) -> usize {
        self.0
    }

    /// Whether the block has been registered with a pipeline.
    pub fn is_registered(&self) -> bool {
        *self != Self::UNREGISTERED
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_registered() {
            write!(f, "Block({})", self.0)
        } else {
            write!(f, "Block(unregistered)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_next() {
        let id = TransactionId(41);
        assert_eq!(id.next(), TransactionId(42));
        assert_eq!(id.as_u64(), 41);
    }

    #[test]
    fn test_block_id_registration() {
        assert!(!BlockId::UNREGISTERED.is_registered());
        assert!(BlockId(0).is_registered());
        assert_eq!(BlockId(3).to_string(), "Block(3)");
        assert_eq!(BlockId::UNREGISTERED.to_string(), "Block(unregistered)");
    }
}
