//! Join the fragments of a split transaction back together.

use gpss_core::{
    AggregateStats, Block, BlockCore, BlockReport, BlockStats, PendingJoin, TickContext,
    TransactTable,
};
use gpss_types::{SplitParts, Tick, Transaction, TransactionId};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Merges fragments sharing a parent into one transaction.
///
/// The first fragment of a parent is held under the parent's id. Every later
/// fragment folds its advance time in (keeping the maximum) and the merged
/// transaction is forwarded, with split metadata cleared, once all parts have
/// arrived. If that final hand-off is rejected the join is restored to its
/// previous state and the last fragment is rejected, so it is retried from
/// upstream.
///
/// Transactions that are not fragments pass straight through.
pub struct Aggregate {
    core: BlockCore,
    table: TransactTable,
    /// Outstanding parts per parent. Its lock serialises joins.
    pending: Mutex<IndexMap<TransactionId, u32>>,
    aggregated: AtomicU64,
}

impl Aggregate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: BlockCore::new(name),
            table: TransactTable::new(),
            pending: Mutex::new(IndexMap::new()),
            aggregated: AtomicU64::new(0),
        }
    }

    /// Parts still missing for `parent`, if a join is open.
    pub fn remaining(&self, parent: TransactionId) -> Option<u32> {
        self.pending.lock().get(&parent).copied()
    }

    fn forward(&self, merged: &Transaction, ctx: &TickContext<'_>) -> bool {
        if self.core.offer(merged, ctx).is_none() {
            return false;
        }
        self.aggregated.fetch_add(1, Ordering::Relaxed);
        debug!(
            tick = ctx.now(),
            aggregate = %self.core.name(),
            transaction = %merged.id(),
            advance = merged.advance(),
            "Aggregated"
        );
        true
    }

    fn join(&self, fragment: &Transaction, parts: SplitParts, ctx: &TickContext<'_>) -> bool {
        let parent = parts.parent_id;
        let mut pending = self.pending.lock();

        let Some(&remaining) = pending.get(&parent) else {
            let mut record = fragment.clone().with_id(parent);
            record.set_parts(None);
            record.set_holder(self.core.name());
            let remaining = parts.total_parts.saturating_sub(1);
            if remaining == 0 {
                drop(pending);
                return self.forward(&record, ctx);
            }
            if self.table.push(record).is_err() {
                return false;
            }
            pending.insert(parent, remaining);
            trace!(tick = ctx.now(), aggregate = %self.core.name(), %parent, remaining, "Join opened");
            return true;
        };

        let remaining = remaining - 1;
        if remaining > 0 {
            self.table
                .update(parent, |record| record.merge_advance(fragment.advance()));
            pending.insert(parent, remaining);
            trace!(tick = ctx.now(), aggregate = %self.core.name(), %parent, remaining, "Part joined");
            return true;
        }

        // Last part: take the join out and forward it without holding the lock
        let Some(before) = self.table.remove(parent) else {
            pending.shift_remove(&parent);
            return false;
        };
        pending.shift_remove(&parent);
        drop(pending);

        let mut merged = before.clone();
        merged.merge_advance(fragment.advance());
        if self.forward(&merged, ctx) {
            return true;
        }

        let mut pending = self.pending.lock();
        if self.table.push(before).is_ok() {
            pending.insert(parent, 1);
        }
        false
    }
}

impl Block for Aggregate {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        match transaction.parts() {
            Some(parts) => self.join(transaction, parts, ctx),
            None => self.core.offer(transaction, ctx).is_some(),
        }
    }

    fn report(&self, _ticks: Tick) -> BlockReport {
        let mut pending: Vec<PendingJoin> = self
            .pending
            .lock()
            .iter()
            .map(|(&parent_id, &remaining)| PendingJoin {
                parent_id,
                remaining,
            })
            .collect();
        pending.sort_by_key(|join| join.parent_id);
        BlockReport::new(
            &self.core,
            BlockStats::Aggregate(AggregateStats {
                aggregated: self.aggregated.load(Ordering::Relaxed),
                pending,
            }),
        )
    }

    fn held(&self) -> usize {
        self.table.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
