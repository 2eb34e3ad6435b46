//! Per-tick view of the pipeline handed to every block.

use crate::{Block, Sampler};
use gpss_types::{BlockId, Tick, Transaction, TransactionId};
use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{warn, Span};

/// Monotonic transaction id source shared by all blocks of a pipeline.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id. The first id is 1.
    pub fn next_id(&self) -> TransactionId {
        TransactionId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}

/// Everything a block may touch while it runs within one tick.
///
/// The context borrows the frozen block registry, so blocks address their
/// destinations by [`BlockId`] and never own each other.
pub struct TickContext<'a> {
    now: Tick,
    horizon: Tick,
    blocks: &'a [Box<dyn Block>],
    names: &'a IndexMap<String, BlockId>,
    ids: &'a IdAllocator,
    sampler: &'a dyn Sampler,
    span: &'a Span,
}

impl<'a> TickContext<'a> {
    pub fn new(
        now: Tick,
        horizon: Tick,
        blocks: &'a [Box<dyn Block>],
        names: &'a IndexMap<String, BlockId>,
        ids: &'a IdAllocator,
        sampler: &'a dyn Sampler,
        span: &'a Span,
    ) -> Self {
        Self {
            now,
            horizon,
            blocks,
            names,
            ids,
            sampler,
            span,
        }
    }

    /// Current model time.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Tick at which the run ends.
    pub fn horizon(&self) -> Tick {
        self.horizon
    }

    pub fn block(&self, id: BlockId) -> Option<&'a dyn Block> {
        self.blocks.get(id.index()).map(|b| b.as_ref())
    }

    pub fn block_by_name(&self, name: &str) -> Option<&'a dyn Block> {
        self.names.get(name).and_then(|&id| self.block(id))
    }

    /// Offer a transaction to a block. Returns whether it was accepted.
    pub fn offer(&self, to: BlockId, transaction: &Transaction) -> bool {
        match self.block(to) {
            Some(block) => block.append_transact(transaction, self),
            None => {
                warn!(%to, transaction = %transaction.id(), "Offer to unknown block");
                false
            }
        }
    }

    /// Allocate a fresh transaction id.
    pub fn next_transaction_id(&self) -> TransactionId {
        self.ids.next_id()
    }

    pub fn sampler(&self) -> &'a dyn Sampler {
        self.sampler
    }

    /// Span of the owning pipeline.
    pub fn span(&self) -> &'a Span {
        self.span
    }
}
