//! The block capability shared by every block variant.

use crate::{BlockReport, TickContext};
use gpss_types::{BlockId, Tick, Transaction};
use std::any::Any;
use tracing::trace;

/// A processing node of a pipeline.
///
/// Blocks are driven by the pipeline and by each other through two entry
/// points:
///
/// - **`append_transact`**: an upstream block offers a transaction. The block
///   either admits it (storing its own copy, returning `true`) or rejects it.
///   Rejection must leave no trace: no counters, no held copy, no claimed
///   capacity.
/// - **`handle_transacts`**: the pipeline calls this exactly once per tick.
///   The block advances what it holds and offers finished transactions to its
///   destinations.
///
/// Both may run concurrently with other blocks' ticks, and `append_transact`
/// may be called while the block's own `handle_transacts` is running. State
/// lives behind interior locks, and no lock is held while offering downstream
/// so cyclic topologies cannot deadlock.
///
/// # Example
///
/// ```ignore
/// impl Block for Passthrough {
///     fn core(&self) -> &BlockCore { &self.core }
///     fn core_mut(&mut self) -> &mut BlockCore { &mut self.core }
///
///     fn append_transact(&self, t: &Transaction, ctx: &TickContext<'_>) -> bool {
///         self.core.offer(t, ctx).is_some()
///     }
///
///     fn report(&self, _ticks: Tick) -> BlockReport {
///         BlockReport::passive(&self.core)
///     }
///
///     fn as_any(&self) -> &dyn Any { self }
/// }
/// ```
pub trait Block: Send + Sync + 'static {
    /// Shared name, id and routing state.
    fn core(&self) -> &BlockCore;

    /// Mutable access to the routing state, only available while wiring.
    fn core_mut(&mut self) -> &mut BlockCore;

    /// Offer a transaction to this block.
    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool;

    /// Advance held transactions by one tick.
    fn handle_transacts(&self, _ctx: &TickContext<'_>) {}

    /// Snapshot of accumulated counters. Never mutates simulation state.
    ///
    /// `ticks` is the elapsed model time used for time averages.
    fn report(&self, ticks: Tick) -> BlockReport;

    /// Number of transactions currently inside the block.
    fn held(&self) -> usize {
        0
    }

    /// Whether the block currently holds nothing.
    fn is_empty(&self) -> bool {
        self.held() == 0
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn id(&self) -> BlockId {
        self.core().id()
    }

    /// Downcasting hook for callers that need a concrete block type.
    fn as_any(&self) -> &dyn Any;
}

/// State every block carries: identity and ordered routing.
#[derive(Debug, Clone)]
pub struct BlockCore {
    name: String,
    id: BlockId,
    destinations: Vec<BlockId>,
    fallback: Option<BlockId>,
}

impl BlockCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: BlockId::UNREGISTERED,
            destinations: Vec::new(),
            fallback: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn set_id(&mut self, id: BlockId) {
        self.id = id;
    }

    /// Destinations in the order they are tried.
    pub fn destinations(&self) -> &[BlockId] {
        &self.destinations
    }

    pub fn set_destinations(&mut self, destinations: Vec<BlockId>) {
        self.destinations = destinations;
    }

    pub fn fallback(&self) -> Option<BlockId> {
        self.fallback
    }

    pub fn set_fallback(&mut self, fallback: Option<BlockId>) {
        self.fallback = fallback;
    }

    /// Offer a transaction to each destination in declared order.
    ///
    /// Stops at the first destination that accepts and returns it; `None`
    /// means every destination rejected.
    pub fn offer(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> Option<BlockId> {
        let accepted = self
            .destinations
            .iter()
            .copied()
            .find(|&to| ctx.offer(to, transaction));

        match accepted {
            Some(to) => trace!(
                tick = ctx.now(),
                from = %self.name,
                %to,
                transaction = %transaction.id(),
                "Handed off"
            ),
            None => trace!(
                tick = ctx.now(),
                from = %self.name,
                transaction = %transaction.id(),
                "No destination accepted"
            ),
        }
        accepted
    }

    /// Offer a transaction to a single destination.
    pub fn offer_to(&self, to: BlockId, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        let accepted = ctx.offer(to, transaction);
        trace!(
            tick = ctx.now(),
            from = %self.name,
            %to,
            transaction = %transaction.id(),
            accepted,
            "Offered"
        );
        accepted
    }
}
