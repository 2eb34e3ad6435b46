//! Parameter writes on the way through.

use gpss_core::{AssignStats, Block, BlockCore, BlockReport, BlockStats, TickContext};
use gpss_types::{Parameter, Tick, Transaction};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Applies parameter writes and deletes, then passes the transaction on.
///
/// Holds nothing. The writes are made on the copy offered downstream, so they
/// only persist if a destination accepts.
pub struct Assign {
    core: BlockCore,
    parameters: Vec<Parameter>,
    assigned: AtomicU64,
}

impl Assign {
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            core: BlockCore::new(name),
            parameters,
            assigned: AtomicU64::new(0),
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

impl Block for Assign {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        let mut assigned = transaction.clone();
        assigned.apply(&self.parameters);
        if self.core.offer(&assigned, ctx).is_none() {
            return false;
        }
        self.assigned.fetch_add(1, Ordering::Relaxed);
        trace!(
            tick = ctx.now(),
            assign = %self.core.name(),
            transaction = %transaction.id(),
            "Assigned"
        );
        true
    }

    fn report(&self, _ticks: Tick) -> BlockReport {
        BlockReport::new(
            &self.core,
            BlockStats::Assign(AssignStats {
                assigned: self.assigned.load(Ordering::Relaxed),
            }),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
