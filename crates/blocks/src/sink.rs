//! Terminal block.

use gpss_core::{
    ratio, Block, BlockCore, BlockReport, BlockStats, SinkStats, TickContext, TransactTable,
};
use gpss_types::{Tick, Transaction};
use parking_lot::Mutex;
use std::any::Any;
use tracing::trace;

#[derive(Debug, Default)]
struct SinkCounters {
    killed: u64,
    sum_life: u64,
    sum_advance: u64,
}

/// Terminates every transaction it receives.
///
/// Accepts unconditionally and kills at admission, so a transaction's life
/// ends on the tick it arrives. Terminated transactions are retained for
/// inspection. A transaction that was already killed is accepted but not
/// counted again.
pub struct Sink {
    core: BlockCore,
    table: TransactTable,
    counters: Mutex<SinkCounters>,
}

impl Sink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: BlockCore::new(name),
            table: TransactTable::new(),
            counters: Mutex::new(SinkCounters::default()),
        }
    }

    /// Terminated transactions in arrival order.
    pub fn terminated(&self) -> Vec<Transaction> {
        self.table.snapshot()
    }

    pub fn killed(&self) -> u64 {
        self.counters.lock().killed
    }
}

impl Block for Sink {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        let mut counters = self.counters.lock();
        if self.table.contains(transaction.id()) {
            return true;
        }

        let mut dead = transaction.clone();
        dead.set_holder(self.core.name());
        if dead.kill(ctx.now()) {
            counters.killed += 1;
            counters.sum_life += dead.life().unwrap_or(0);
            counters.sum_advance += dead.advance();
            trace!(
                tick = ctx.now(),
                sink = %self.core.name(),
                transaction = %dead.id(),
                life = dead.life(),
                "Terminated"
            );
        }
        // Cannot collide: the id was checked under the counters lock
        let _ = self.table.push(dead);
        true
    }

    fn report(&self, _ticks: Tick) -> BlockReport {
        let counters = self.counters.lock();
        BlockReport::new(
            &self.core,
            BlockStats::Sink(SinkStats {
                killed: counters.killed,
                average_life: ratio(counters.sum_life as f64, counters.killed as f64),
                average_advance: ratio(counters.sum_advance as f64, counters.killed as f64),
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

#[cfg(test)]
mod tests {
    use super::*;
    use gpss_test_helpers::{transaction, Harness};

    #[test]
    fn test_kills_at_admission() {
        let mut harness = Harness::new();
        let sink = harness.add(Sink::new("exit"));

        let mut t = transaction(1, 2);
        t.set_ticks(3);
        assert!(harness.offer(7, sink, &t));
        assert!(harness.offer(9, sink, &transaction(2, 9)));

        let dead = harness.get::<Sink>(sink).terminated();
        assert_eq!(dead.len(), 2);
        assert_eq!(dead[0].rip(), Some(7));
        assert_eq!(dead[0].life(), Some(5));
        assert_eq!(dead[0].holder(), "exit");

        match harness.block(sink).report(10).stats {
            BlockStats::Sink(stats) => {
                assert_eq!(stats.killed, 2);
                assert_eq!(stats.average_life, Some(2.5));
                assert_eq!(stats.average_advance, Some(1.5));
            }
            other => panic!("unexpected stats {other:?}"),
        }
    }

    #[test]
    fn test_killed_transaction_not_counted_twice() {
        let mut harness = Harness::new();
        let sink = harness.add(Sink::new("exit"));
        let other = harness.add(Sink::new("other"));

        let mut t = transaction(1, 0);
        assert!(t.kill(3));
        assert!(harness.offer(5, sink, &t));
        assert_eq!(harness.get::<Sink>(sink).killed(), 0);
        assert_eq!(harness.get::<Sink>(sink).terminated()[0].rip(), Some(3));

        // Re-offering the same id is accepted and ignored
        let fresh = transaction(2, 0);
        assert!(harness.offer(5, other, &fresh));
        assert!(harness.offer(6, other, &fresh));
        assert_eq!(harness.get::<Sink>(other).killed(), 1);
        assert_eq!(harness.block(other).held(), 1);
    }

    #[test]
    fn test_report_before_any_kill() {
        let mut harness = Harness::new();
        let sink = harness.add(Sink::new("exit"));
        match harness.block(sink).report(0).stats {
            BlockStats::Sink(stats) => {
                assert_eq!(stats.killed, 0);
                assert_eq!(stats.average_life, None);
            }
            other => panic!("unexpected stats {other:?}"),
        }
    }
}
