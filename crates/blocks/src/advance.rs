//! Timed delay.

use gpss_core::{
    ratio, spread, AdvanceStats, Block, BlockCore, BlockReport, BlockStats, TickContext,
    TransactTable,
};
use gpss_types::{Tick, Transaction};
use parking_lot::Mutex;
use std::any::Any;
use tracing::{trace, warn};

#[derive(Debug, Default)]
struct AdvanceCounters {
    entries: u64,
    sum_advance: u64,
}

/// Holds every arriving transaction for `interval ± half_range` ticks.
///
/// Unlimited capacity. Finished transactions that no destination accepts stay
/// in the block and are offered again on the next tick.
pub struct Advance {
    core: BlockCore,
    interval: Tick,
    half_range: Tick,
    table: TransactTable,
    counters: Mutex<AdvanceCounters>,
}

impl Advance {
    pub fn new(name: impl Into<String>, interval: Tick, half_range: Tick) -> Self {
        Self {
            core: BlockCore::new(name),
            interval,
            half_range,
            table: TransactTable::new(),
            counters: Mutex::new(AdvanceCounters::default()),
        }
    }
}

impl Block for Advance {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        let delay = spread(ctx.sampler(), self.interval, self.half_range);
        let mut transaction = transaction.clone();
        transaction.set_holder(self.core.name());
        transaction.set_ticks(delay);

        let id = transaction.id();
        if let Err(e) = self.table.push(transaction) {
            warn!(advance = %self.core.name(), error = %e, "Rejected transaction");
            return false;
        }
        let mut counters = self.counters.lock();
        counters.entries += 1;
        counters.sum_advance += delay;
        trace!(tick = ctx.now(), advance = %self.core.name(), %id, delay, "Delaying");
        true
    }

    fn handle_transacts(&self, ctx: &TickContext<'_>) {
        self.table.update_all(|t| t.dec_ticks());
        for transaction in self.table.snapshot() {
            if !transaction.is_finished() {
                continue;
            }
            if self.core.offer(&transaction, ctx).is_some() {
                self.table.remove(transaction.id());
            }
        }
    }

    fn report(&self, _ticks: Tick) -> BlockReport {
        let counters = self.counters.lock();
        BlockReport::new(
            &self.core,
            BlockStats::Advance(AdvanceStats {
                entries: counters.entries,
                current_content: self.table.len(),
                average_advance: ratio(counters.sum_advance as f64, counters.entries as f64),
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
