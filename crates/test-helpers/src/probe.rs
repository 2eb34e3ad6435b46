//! A scriptable destination block.

use gpss_core::{Block, BlockCore, BlockReport, TickContext};
use gpss_types::{Tick, Transaction, TransactionId};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};

/// Records every offer it sees and keeps accepted transactions.
///
/// Accepts by default; flip with [`ProbeBlock::set_accepting`].
pub struct ProbeBlock {
    core: BlockCore,
    accepting: AtomicBool,
    offered: Mutex<Vec<TransactionId>>,
    accepted: Mutex<Vec<(Tick, Transaction)>>,
}

impl ProbeBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: BlockCore::new(name),
            accepting: AtomicBool::new(true),
            offered: Mutex::new(Vec::new()),
            accepted: Mutex::new(Vec::new()),
        }
    }

    /// A probe that starts out rejecting.
    pub fn rejecting(name: impl Into<String>) -> Self {
        let probe = Self::new(name);
        probe.set_accepting(false);
        probe
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Ids of every offer, accepted or not, in arrival order.
    pub fn offered(&self) -> Vec<TransactionId> {
        self.offered.lock().clone()
    }

    /// Accepted transactions as they arrived.
    pub fn accepted(&self) -> Vec<Transaction> {
        self.accepted.lock().iter().map(|(_, t)| t.clone()).collect()
    }

    /// Accepted ids in arrival order.
    pub fn accepted_ids(&self) -> Vec<TransactionId> {
        self.accepted.lock().iter().map(|(_, t)| t.id()).collect()
    }

    /// Ticks at which each accepted transaction arrived.
    pub fn arrival_ticks(&self) -> Vec<Tick> {
        self.accepted.lock().iter().map(|(tick, _)| *tick).collect()
    }
}

impl Block for ProbeBlock {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        self.offered.lock().push(transaction.id());
        if !self.accepting.load(Ordering::SeqCst) {
            return false;
        }
        self.accepted.lock().push((ctx.now(), transaction.clone()));
        true
    }

    fn report(&self, _ticks: Tick) -> BlockReport {
        BlockReport::passive(&self.core)
    }

    fn held(&self) -> usize {
        self.accepted.lock().len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
