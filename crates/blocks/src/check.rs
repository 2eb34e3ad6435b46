//! Conditional router.

use gpss_core::{Block, BlockCore, BlockReport, BlockStats, CheckStats, TickContext};
use gpss_types::{Parameter, Tick, Transaction};
use parking_lot::Mutex;
use std::any::Any;
use tracing::trace;

/// Routing predicate. The context gives access to other blocks, so a check
/// can look at e.g. the length of a queue.
pub type CheckFn = Box<dyn Fn(&Transaction, &TickContext<'_>) -> bool + Send + Sync>;

#[derive(Debug, Default)]
struct CheckCounters {
    true_outcomes: u64,
    false_outcomes: u64,
    rejected: u64,
}

/// Routes a transaction by a predicate.
///
/// True sends it to the normal destinations. False sends it to the fallback
/// destination when one is wired, and rejects it otherwise so it stays
/// upstream. The default predicate holds when every configured parameter
/// matches the transaction's value (an unset parameter must be absent).
pub struct Check {
    core: BlockCore,
    predicate: CheckFn,
    counters: Mutex<CheckCounters>,
}

impl Check {
    /// A check comparing the given parameters.
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self::with_predicate(name, move |t, _| {
            parameters
                .iter()
                .all(|p| t.param(&p.name) == p.value.as_ref())
        })
    }

    /// A check with a custom predicate.
    pub fn with_predicate(
        name: impl Into<String>,
        predicate: impl Fn(&Transaction, &TickContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            core: BlockCore::new(name),
            predicate: Box::new(predicate),
            counters: Mutex::new(CheckCounters::default()),
        }
    }
}

impl Block for Check {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        let outcome = (self.predicate)(transaction, ctx);
        let accepted = if outcome {
            self.core.offer(transaction, ctx).is_some()
        } else {
            match self.core.fallback() {
                Some(fallback) => self.core.offer_to(fallback, transaction, ctx),
                None => false,
            }
        };

        let mut counters = self.counters.lock();
        match (accepted, outcome) {
            (true, true) => counters.true_outcomes += 1,
            (true, false) => counters.false_outcomes += 1,
            (false, _) => counters.rejected += 1,
        }
        trace!(
            tick = ctx.now(),
            check = %self.core.name(),
            transaction = %transaction.id(),
            outcome,
            accepted,
            "Checked"
        );
        accepted
    }

    fn report(&self, _ticks: Tick) -> BlockReport {
        let counters = self.counters.lock();
        BlockReport::new(
            &self.core,
            BlockStats::Check(CheckStats {
                true_outcomes: counters.true_outcomes,
                false_outcomes: counters.false_outcomes,
                rejected: counters.rejected,
            }),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
