//! Single-capacity resource with a service time.

use crate::FACILITY_PARAM;
use gpss_core::{
    ratio, spread, Block, BlockCore, BlockReport, BlockStats, FacilityStats, HolderInfo,
    TickContext, TransactTable,
};
use gpss_types::{ParamValue, Tick, Transaction};
use parking_lot::Mutex;
use std::any::Any;
use tracing::debug;

#[derive(Debug, Default)]
struct FacilityState {
    entries: u64,
    sum_service: u64,
    /// Value of the facility parameter the holder arrived with.
    saved_param: Option<ParamValue>,
}

/// A resource that serves one transaction at a time.
///
/// While a transaction is held its `facility` parameter names this facility;
/// the value it arrived with is restored on the way out, so facilities can
/// nest. A served transaction that nobody downstream accepts keeps the
/// facility occupied until a later hand-off succeeds.
pub struct Facility {
    core: BlockCore,
    interval: Tick,
    half_range: Tick,
    table: TransactTable,
    state: Mutex<FacilityState>,
}

impl Facility {
    pub fn new(name: impl Into<String>, interval: Tick, half_range: Tick) -> Self {
        Self {
            core: BlockCore::new(name),
            interval,
            half_range,
            table: TransactTable::new(),
            state: Mutex::new(FacilityState::default()),
        }
    }

    /// The transaction currently being served.
    pub fn holder(&self) -> Option<Transaction> {
        self.table.peek_first()
    }
}

impl Block for Facility {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        // State lock first, table lock nested inside the claim
        let mut state = self.state.lock();
        let mut service = 0;
        let mut saved = None;
        let admitted = self.table.push_if_empty(|| {
            service = spread(ctx.sampler(), self.interval, self.half_range);
            let mut held = transaction.clone();
            held.set_holder(self.core.name());
            saved = held.param(FACILITY_PARAM).cloned();
            held.set_param(FACILITY_PARAM, Some(self.core.name().into()));
            held.set_ticks(service);
            held
        });
        if !admitted {
            return false;
        }

        state.entries += 1;
        state.sum_service += service;
        state.saved_param = saved;
        debug!(
            tick = ctx.now(),
            facility = %self.core.name(),
            transaction = %transaction.id(),
            service,
            "Seized"
        );
        true
    }

    fn handle_transacts(&self, ctx: &TickContext<'_>) {
        self.table.update_all(|t| t.dec_ticks());
        let Some(held) = self.table.peek_first() else {
            return;
        };
        if !held.is_finished() {
            return;
        }

        let mut leaving = held;
        leaving.set_param(FACILITY_PARAM, self.state.lock().saved_param.clone());
        if self.core.offer(&leaving, ctx).is_some() {
            self.table.remove(leaving.id());
            debug!(
                tick = ctx.now(),
                facility = %self.core.name(),
                transaction = %leaving.id(),
                "Released"
            );
        }
    }

    fn report(&self, ticks: Tick) -> BlockReport {
        let state = self.state.lock();
        BlockReport::new(
            &self.core,
            BlockStats::Facility(FacilityStats {
                entries: state.entries,
                average_service: ratio(state.sum_service as f64, state.entries as f64),
                utilization_percent: ratio(100.0 * state.sum_service as f64, ticks as f64),
                holder: self.table.peek_first().map(|t| HolderInfo {
                    id: t.id(),
                    parts: t.parts(),
                }),
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
