//! Fan a transaction out into fragments.

use gpss_core::{
    choose_distinct, ratio, spread, Block, BlockCore, BlockReport, BlockStats, Sampler,
    SplitStats, TickContext,
};
use gpss_types::{Tick, Transaction};
use parking_lot::Mutex;
use std::any::Any;
use tracing::{trace, warn};

/// Picks destination indices for the fragments of one transaction.
///
/// Arguments are the transaction, the number of destinations and the
/// sampler. Indices out of range and repeats are ignored. A plan that
/// leaves no valid index makes the split reject the transaction.
pub type SplitFn = Box<dyn Fn(&Transaction, usize, &dyn Sampler) -> Vec<usize> + Send + Sync>;

/// `count ± half_range` fragments, clamped to `[1, destinations]`: every
/// destination when the count covers them all, a random subset otherwise.
fn default_plan(
    count: u64,
    half_range: u64,
) -> impl Fn(&Transaction, usize, &dyn Sampler) -> Vec<usize> + Send + Sync + 'static {
    move |_, destinations, sampler| {
        let k = (spread(sampler, count, half_range) as usize).clamp(1, destinations.max(1));
        if k >= destinations {
            (0..destinations).collect()
        } else {
            choose_distinct(sampler, destinations, k)
        }
    }
}

#[derive(Debug, Default)]
struct SplitCounters {
    inputs: u64,
    fragments: u64,
    lost: u64,
}

/// Splits every arriving transaction into `count ± half_range` fragments.
///
/// The fragment count is clamped to `[1, destinations]`. Each fragment gets a
/// fresh id and `parts = (i, K, parent)` and is offered once, to its own
/// destination only. Fragments that destination rejects are lost, so split
/// targets are normally queues.
pub struct Split {
    core: BlockCore,
    plan: SplitFn,
    counters: Mutex<SplitCounters>,
}

impl Split {
    pub fn new(name: impl Into<String>, count: u64, half_range: u64) -> Self {
        Self {
            core: BlockCore::new(name),
            plan: Box::new(default_plan(count, half_range)),
            counters: Mutex::new(SplitCounters::default()),
        }
    }

    /// Replace the destination selection.
    pub fn with_split_fn(
        mut self,
        plan: impl Fn(&Transaction, usize, &dyn Sampler) -> Vec<usize> + Send + Sync + 'static,
    ) -> Self {
        self.plan = Box::new(plan);
        self
    }

    fn targets(&self, transaction: &Transaction, sampler: &dyn Sampler) -> Vec<usize> {
        let destinations = self.core.destinations().len();
        let mut chosen: Vec<usize> = (self.plan)(transaction, destinations, sampler)
            .into_iter()
            .filter(|&i| i < destinations)
            .collect();
        chosen.sort_unstable();
        chosen.dedup();
        chosen
    }
}

impl Block for Split {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        if self.core.destinations().is_empty() {
            return false;
        }

        let targets = self.targets(transaction, ctx.sampler());
        if targets.is_empty() {
            warn!(
                tick = ctx.now(),
                split = %self.core.name(),
                transaction = %transaction.id(),
                "Split plan chose no destination, rejected"
            );
            return false;
        }
        let total = targets.len() as u32;
        let mut lost = 0;
        for (i, &index) in targets.iter().enumerate() {
            let mut fragment =
                transaction.fragment(ctx.next_transaction_id(), i as u32 + 1, total);
            fragment.set_holder(self.core.name());
            let to = self.core.destinations()[index];
            if !self.core.offer_to(to, &fragment, ctx) {
                lost += 1;
                warn!(
                    tick = ctx.now(),
                    split = %self.core.name(),
                    fragment = %fragment.id(),
                    %to,
                    "Fragment rejected, dropped"
                );
            }
        }

        let mut counters = self.counters.lock();
        counters.inputs += 1;
        counters.fragments += u64::from(total);
        counters.lost += lost;
        trace!(
            tick = ctx.now(),
            split = %self.core.name(),
            parent = %transaction.id(),
            total,
            "Split"
        );
        true
    }

    fn report(&self, _ticks: Tick) -> BlockReport {
        let counters = self.counters.lock();
        BlockReport::new(
            &self.core,
            BlockStats::Split(SplitStats {
                inputs: counters.inputs,
                fragments: counters.fragments,
                lost: counters.lost,
                average_fragments: ratio(counters.fragments as f64, counters.inputs as f64),
            }),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpss_test_helpers::{transaction, Harness, ProbeBlock, ScriptedSampler};
    use gpss_types::{BlockId, SplitParts, TransactionId};

    fn setup(harness: &mut Harness, split: Split, destinations: usize) -> (BlockId, Vec<BlockId>) {
        let split = harness.add(split);
        let probes: Vec<BlockId> = (0..destinations)
            .map(|i| harness.add(ProbeBlock::new(format!("dst{i}"))))
            .collect();
        harness.connect(split, &probes);
        (split, probes)
    }

    fn accepted(harness: &Harness, probe: BlockId) -> Vec<Transaction> {
        harness.get::<ProbeBlock>(probe).accepted()
    }

    #[test]
    fn test_one_fragment_per_destination() {
        let mut harness = Harness::new();
        let (split, probes) = setup(&mut harness, Split::new("orders", 3, 0), 3);
        let mut parent = transaction(100, 0);
        parent.set_ticks(4);
        assert!(harness.offer(0, split, &parent));

        for (i, &probe) in probes.iter().enumerate() {
            let fragments = accepted(&harness, probe);
            assert_eq!(fragments.len(), 1);
            let fragment = &fragments[0];
            assert_eq!(
                fragment.parts(),
                Some(SplitParts {
                    part: i as u32 + 1,
                    total_parts: 3,
                    parent_id: TransactionId(100),
                })
            );
            assert_eq!(fragment.advance(), 4);
            assert_ne!(fragment.id(), TransactionId(100));
        }
        assert_eq!(harness.ids_issued(), 3);
    }

    #[test]
    fn test_count_clamped_to_destinations() {
        let mut harness = Harness::new();
        let (split, probes) = setup(&mut harness, Split::new("orders", 7, 0), 2);
        assert!(harness.offer(0, split, &transaction(1, 0)));
        assert!(probes
            .iter()
            .all(|&p| accepted(&harness, p)[0].parts().unwrap().total_parts == 2));

        let mut harness = Harness::new();
        let (split, probes) = setup(&mut harness, Split::new("orders", 0, 0), 2);
        assert!(harness.offer(0, split, &transaction(1, 0)));
        let total: usize = probes.iter().map(|&p| accepted(&harness, p).len()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_subset_of_destinations() {
        // Count draws 2, then the partial shuffle swaps in index 2
        let sampler = ScriptedSampler::new([2, 2, 1]);
        let mut harness = Harness::with_sampler(sampler);
        let (split, probes) = setup(&mut harness, Split::new("orders", 2, 1), 3);
        assert!(harness.offer(0, split, &transaction(1, 0)));

        let counts: Vec<usize> = probes.iter().map(|&p| accepted(&harness, p).len()).collect();
        assert_eq!(counts.iter().sum::<usize>(), 2);
        let parts: Vec<u32> = probes
            .iter()
            .flat_map(|&p| accepted(&harness, p))
            .map(|t| t.parts().unwrap().part)
            .collect();
        assert_eq!(parts, vec![1, 2]);
    }

    #[test]
    fn test_rejected_fragment_is_lost() {
        let mut harness = Harness::new();
        let (split, probes) = setup(&mut harness, Split::new("orders", 2, 0), 2);
        harness.get::<ProbeBlock>(probes[1]).set_accepting(false);
        assert!(harness.offer(0, split, &transaction(1, 0)));
        assert!(harness.offer(1, split, &transaction(2, 1)));

        match harness.block(split).report(2).stats {
            BlockStats::Split(stats) => {
                assert_eq!(stats.inputs, 2);
                assert_eq!(stats.fragments, 4);
                assert_eq!(stats.lost, 2);
                assert_eq!(stats.average_fragments, Some(2.0));
            }
            other => panic!("unexpected stats {other:?}"),
        }
        // Each fragment was offered exactly once
        assert_eq!(harness.get::<ProbeBlock>(probes[1]).offered().len(), 2);
    }

    #[test]
    fn test_custom_split_fn() {
        let mut harness = Harness::new();
        let custom = Split::new("orders", 1, 0).with_split_fn(|t: &Transaction, _, _| {
            if t.bool_param("big").unwrap_or(false) {
                vec![0, 1, 1, 9]
            } else {
                vec![1]
            }
        });
        let (split, probes) = setup(&mut harness, custom, 2);

        let mut big = transaction(1, 0);
        big.set_param("big", Some(true.into()));
        assert!(harness.offer(0, split, &big));
        assert!(harness.offer(0, split, &transaction(2, 0)));

        assert_eq!(accepted(&harness, probes[0]).len(), 1);
        assert_eq!(accepted(&harness, probes[1]).len(), 2);
    }

    #[test]
    fn test_empty_plan_rejects() {
        let mut harness = Harness::new();
        let custom = Split::new("orders", 1, 0).with_split_fn(|_, _, _| vec![]);
        let (split, probes) = setup(&mut harness, custom, 2);
        let out_of_range = Split::new("drinks", 1, 0).with_split_fn(|_, _, _| vec![5]);
        let (other, _) = setup(&mut harness, out_of_range, 1);

        for i in 0..3 {
            assert!(!harness.offer(i, split, &transaction(i + 1, i)));
        }
        assert!(!harness.offer(3, other, &transaction(4, 3)));
        assert!(probes.iter().all(|&p| accepted(&harness, p).is_empty()));
        assert_eq!(harness.ids_issued(), 0);

        match harness.block(split).report(3).stats {
            BlockStats::Split(stats) => {
                assert_eq!(stats.inputs, 0);
                assert_eq!(stats.fragments, 0);
                assert_eq!(stats.lost, 0);
                assert_eq!(stats.average_fragments, None);
            }
            other => panic!("unexpected stats {other:?}"),
        }
    }

    #[test]
    fn test_without_destinations_rejects() {
        let mut harness = Harness::new();
        let split = harness.add(Split::new("orders", 2, 0));
        assert!(!harness.offer(0, split, &transaction(1, 0)));
        assert_eq!(harness.ids_issued(), 0);
    }
}
