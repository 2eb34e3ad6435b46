//! Shared up/down counter.

use gpss_core::{Block, BlockCore, BlockReport, BlockStats, CountStats, TickContext};
use gpss_types::{Tick, Transaction};
use std::any::Any;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Pass-through block that moves a shared counter by a fixed delta.
///
/// Counts come in pairs sharing one cell, typically placed around a section
/// of the model to track how many transactions are inside it. The delta is
/// applied only after a downstream block accepted.
pub struct Count {
    core: BlockCore,
    value: Arc<AtomicI64>,
    delta: i64,
    passed: AtomicU64,
}

impl Count {
    /// Create the `{name}_INC` and `{name}_DEC` halves.
    pub fn pair(name: &str, increment: i64, decrement: i64) -> (Count, Count) {
        let value = Arc::new(AtomicI64::new(0));
        let inc = Count {
            core: BlockCore::new(format!("{name}_INC")),
            value: Arc::clone(&value),
            delta: increment,
            passed: AtomicU64::new(0),
        };
        let dec = Count {
            core: BlockCore::new(format!("{name}_DEC")),
            value,
            delta: decrement,
            passed: AtomicU64::new(0),
        };
        (inc, dec)
    }

    /// Current value of the shared cell.
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}

impl Block for Count {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        if self.core.offer(transaction, ctx).is_none() {
            return false;
        }
        let value = self.value.fetch_add(self.delta, Ordering::SeqCst) + self.delta;
        self.passed.fetch_add(1, Ordering::Relaxed);
        trace!(tick = ctx.now(), count = %self.core.name(), value, "Counted");
        true
    }

    fn report(&self, _ticks: Tick) -> BlockReport {
        BlockReport::new(
            &self.core,
            BlockStats::Count(CountStats {
                value: self.value(),
                delta: self.delta,
                passed: self.passed.load(Ordering::Relaxed),
            }),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
