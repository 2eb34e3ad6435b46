//! Unbounded FIFO waiting line.

use gpss_core::{
    ratio, Block, BlockCore, BlockReport, BlockStats, QueueStats, TickContext, TransactTable,
};
use gpss_types::{Tick, Transaction};
use parking_lot::Mutex;
use std::any::Any;
use tracing::{trace, warn};

#[derive(Debug, Default)]
struct QueueCounters {
    max_content: usize,
    total_entries: u64,
    zero_entries: u64,
    /// Sum of queue time of every transaction that left.
    sum_wait: u64,
    /// Sum over ticks of the content after draining.
    sum_content: u64,
}

/// Holds transactions until a destination accepts them.
///
/// An arrival at an empty queue first tries to pass straight through (a zero
/// entry). Otherwise it joins the tail. The queue never rejects.
pub struct Queue {
    core: BlockCore,
    table: TransactTable,
    counters: Mutex<QueueCounters>,
}

impl Queue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: BlockCore::new(name),
            table: TransactTable::new(),
            counters: Mutex::new(QueueCounters::default()),
        }
    }

    /// Current number of waiting transactions.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Waiting transactions, head first.
    pub fn waiting(&self) -> Vec<Transaction> {
        self.table.snapshot()
    }
}

impl Block for Queue {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        let mut transaction = transaction.clone();
        transaction.set_holder(self.core.name());

        // Only an empty queue may be bypassed, or FIFO order would break
        if self.table.is_empty() && self.core.offer(&transaction, ctx).is_some() {
            let mut counters = self.counters.lock();
            counters.total_entries += 1;
            counters.zero_entries += 1;
            return true;
        }

        transaction.reset_queue_time();
        let id = transaction.id();
        if let Err(e) = self.table.push(transaction) {
            warn!(queue = %self.core.name(), error = %e, "Rejected transaction");
            return false;
        }
        let content = self.table.len();
        let mut counters = self.counters.lock();
        counters.total_entries += 1;
        counters.max_content = counters.max_content.max(content);
        trace!(tick = ctx.now(), queue = %self.core.name(), %id, content, "Enqueued");
        true
    }

    fn handle_transacts(&self, ctx: &TickContext<'_>) {
        // Drain the head while downstream accepts
        while let Some(head) = self.table.peek_first() {
            if self.core.offer(&head, ctx).is_none() {
                break;
            }
            self.table.remove(head.id());
            self.counters.lock().sum_wait += head.time_in_queue();
        }

        self.table.update_all(|t| t.inc_queue_time());
        let content = self.table.len() as u64;
        self.counters.lock().sum_content += content;
    }

    fn report(&self, ticks: Tick) -> BlockReport {
        let counters = self.counters.lock();
        let waited = counters.total_entries - counters.zero_entries;
        BlockReport::new(
            &self.core,
            BlockStats::Queue(QueueStats {
                max_content: counters.max_content,
                total_entries: counters.total_entries,
                zero_entries: counters.zero_entries,
                current_content: self.table.len(),
                zero_entry_percent: ratio(
                    100.0 * counters.zero_entries as f64,
                    counters.total_entries as f64,
                ),
                average_content: ratio(counters.sum_content as f64, ticks as f64),
                average_wait: ratio(counters.sum_wait as f64, counters.total_entries as f64),
                average_wait_nonzero: ratio(counters.sum_wait as f64, waited as f64),
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
    use gpss_test_helpers::{transaction, Harness, ProbeBlock};
    use gpss_types::{BlockId, TransactionId};

    fn setup() -> (Harness, BlockId, BlockId) {
        let mut harness = Harness::new();
        let queue = harness.add(Queue::new("queue"));
        let probe = harness.add(ProbeBlock::rejecting("probe"));
        harness.connect(queue, &[probe]);
        (harness, queue, probe)
    }

    fn stats(harness: &Harness, queue: BlockId, ticks: Tick) -> QueueStats {
        match harness.block(queue).report(ticks).stats {
            BlockStats::Queue(stats) => stats,
            other => panic!("unexpected stats {other:?}"),
        }
    }

    #[test]
    fn test_zero_entry_when_downstream_free() {
        let (harness, queue, probe) = setup();
        harness.get::<ProbeBlock>(probe).set_accepting(true);

        assert!(harness.offer(0, queue, &transaction(1, 0)));
        assert!(harness.get::<Queue>(queue).is_empty());

        let stats = stats(&harness, queue, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.zero_entries, 1);
        assert_eq!(stats.zero_entry_percent, Some(100.0));
        assert_eq!(stats.average_wait_nonzero, None);
    }

    #[test]
    fn test_always_accepts_and_keeps_fifo() {
        let (harness, queue, probe) = setup();
        for id in 1..=3 {
            assert!(harness.offer(0, queue, &transaction(id, 0)));
        }
        harness.tick(0);
        harness.tick(1);

        let probe_block = harness.get::<ProbeBlock>(probe);
        // Each tick only the head is tried: 1 on arrival, then 1, 1
        assert_eq!(
            probe_block.offered(),
            vec![TransactionId(1), TransactionId(1), TransactionId(1)]
        );

        probe_block.set_accepting(true);
        harness.tick(2);
        assert_eq!(
            probe_block.accepted_ids(),
            vec![TransactionId(1), TransactionId(2), TransactionId(3)]
        );
        assert_eq!(harness.get::<Queue>(queue).len(), 0);
    }

    #[test]
    fn test_arrival_behind_waiting_head_does_not_bypass() {
        let (harness, queue, probe) = setup();
        assert!(harness.offer(0, queue, &transaction(1, 0)));
        harness.get::<ProbeBlock>(probe).set_accepting(true);

        // Head is still waiting, so the newcomer must queue up behind it
        assert!(harness.offer(0, queue, &transaction(2, 0)));
        assert!(harness.get::<ProbeBlock>(probe).accepted_ids().is_empty());
        let ids: Vec<_> = harness
            .get::<Queue>(queue)
            .waiting()
            .iter()
            .map(|t| t.id())
            .collect();
        assert_eq!(ids, vec![TransactionId(1), TransactionId(2)]);
    }

    #[test]
    fn test_wait_and_content_statistics() {
        let (harness, queue, probe) = setup();
        assert!(harness.offer(0, queue, &transaction(1, 0)));
        assert!(harness.offer(0, queue, &transaction(2, 0)));
        harness.tick(0);
        harness.tick(1);
        harness.tick(2);

        let waiting = harness.get::<Queue>(queue).waiting();
        assert!(waiting.iter().all(|t| t.time_in_queue() == 3));
        assert!(waiting.iter().all(|t| t.advance() == 3));

        harness.get::<ProbeBlock>(probe).set_accepting(true);
        harness.tick(3);

        let stats = stats(&harness, queue, 4);
        assert_eq!(stats.max_content, 2);
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.zero_entries, 0);
        assert_eq!(stats.current_content, 0);
        // Content 2, 2, 2, 0 over four ticks
        assert_eq!(stats.average_content, Some(1.5));
        assert_eq!(stats.average_wait, Some(3.0));
        assert_eq!(stats.average_wait_nonzero, Some(3.0));
    }

    #[test]
    fn test_wait_recorded_on_departure() {
        let (harness, queue, probe) = setup();
        assert!(harness.offer(0, queue, &transaction(1, 0)));
        harness.tick(0);
        harness.tick(1);
        harness.get::<ProbeBlock>(probe).set_accepting(true);
        harness.tick(2);

        harness.get::<ProbeBlock>(probe).set_accepting(false);
        assert!(harness.offer(3, queue, &transaction(2, 3)));
        harness.tick(3);
        harness.tick(4);
        assert_eq!(harness.get::<Queue>(queue).waiting()[0].time_in_queue(), 2);

        let stats = stats(&harness, queue, 5);
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.current_content, 1);
        // Only the departed transaction's two ticks are summed
        assert_eq!(stats.average_wait, Some(1.0));
        assert_eq!(stats.average_wait_nonzero, Some(1.0));
    }

    #[test]
    fn test_report_on_idle_queue() {
        let (harness, queue, _) = setup();
        let stats = stats(&harness, queue, 0);
        assert_eq!(stats.average_content, None);
        assert_eq!(stats.average_wait, None);
        assert_eq!(stats.zero_entry_percent, None);
    }
}
