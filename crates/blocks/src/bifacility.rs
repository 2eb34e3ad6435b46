//! Single-capacity resource whose seize and release are separate blocks.
//!
//! ```text
//!   ──▶ BifacilityIn ──▶ ... any blocks ... ──▶ BifacilityOut ──▶
//!          │ claim                                  │ release
//!          └────────────── Arc<Mutex<Lease>> ───────┘
//! ```
//!
//! The two halves share a lease record rather than a transaction table: the
//! leased transaction travels through the blocks in between as usual, and the
//! lease only remembers which id holds the resource.

use crate::FACILITY_PARAM;
use gpss_core::{
    ratio, BifacilityStats, Block, BlockCore, BlockReport, BlockStats, HolderInfo, TickContext,
};
use gpss_types::{ParamValue, SplitParts, Tick, Transaction, TransactionId};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
struct LeaseHolder {
    id: TransactionId,
    parts: Option<SplitParts>,
    since: Tick,
    saved_param: Option<ParamValue>,
}

#[derive(Debug, Default)]
struct Lease {
    holder: Option<LeaseHolder>,
    entries: u64,
    releases: u64,
    sum_hold: u64,
}

/// Constructor for the paired halves.
pub struct Bifacility;

impl Bifacility {
    /// Create the in and out halves of a bifacility.
    ///
    /// The in half is named `name`, the out half `{name}_OUT`.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(name: impl Into<String>) -> (BifacilityIn, BifacilityOut) {
        let name = name.into();
        let lease = Arc::new(Mutex::new(Lease::default()));
        let out = BifacilityOut {
            core: BlockCore::new(format!("{name}_OUT")),
            facility: name.clone(),
            lease: Arc::clone(&lease),
        };
        let input = BifacilityIn {
            core: BlockCore::new(name),
            lease,
        };
        (input, out)
    }
}

/// Seizing half: admits one transaction at a time and forwards it at once.
pub struct BifacilityIn {
    core: BlockCore,
    lease: Arc<Mutex<Lease>>,
}

impl BifacilityIn {
    /// Id of the transaction holding the lease.
    pub fn holder(&self) -> Option<TransactionId> {
        self.lease.lock().holder.as_ref().map(|h| h.id)
    }
}

impl Block for BifacilityIn {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        {
            let mut lease = self.lease.lock();
            if lease.holder.is_some() {
                return false;
            }
            lease.holder = Some(LeaseHolder {
                id: transaction.id(),
                parts: transaction.parts(),
                since: ctx.now(),
                saved_param: transaction.param(FACILITY_PARAM).cloned(),
            });
        }

        let mut leased = transaction.clone();
        leased.set_holder(self.core.name());
        leased.set_param(FACILITY_PARAM, Some(self.core.name().into()));

        // The lease lock is released: the transaction may reach the out half
        // within this very call
        if self.core.offer(&leased, ctx).is_none() {
            let mut lease = self.lease.lock();
            if lease.holder.as_ref().is_some_and(|h| h.id == transaction.id()) {
                lease.holder = None;
            }
            return false;
        }

        self.lease.lock().entries += 1;
        debug!(
            tick = ctx.now(),
            facility = %self.core.name(),
            transaction = %transaction.id(),
            "Seized"
        );
        true
    }

    fn report(&self, ticks: Tick) -> BlockReport {
        let lease = self.lease.lock();
        BlockReport::new(
            &self.core,
            BlockStats::Bifacility(BifacilityStats {
                entries: lease.entries,
                releases: lease.releases,
                average_hold: ratio(lease.sum_hold as f64, lease.releases as f64),
                utilization_percent: ratio(100.0 * lease.sum_hold as f64, ticks as f64),
                holder: lease.holder.as_ref().map(|h| HolderInfo {
                    id: h.id,
                    parts: h.parts,
                }),
            }),
        )
    }

    fn held(&self) -> usize {
        usize::from(self.lease.lock().holder.is_some())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Releasing half: accepts only the transaction that holds the lease.
pub struct BifacilityOut {
    core: BlockCore,
    facility: String,
    lease: Arc<Mutex<Lease>>,
}

impl BifacilityOut {
    /// Name of the in half this block releases.
    pub fn facility(&self) -> &str {
        &self.facility
    }
}

impl Block for BifacilityOut {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn append_transact(&self, transaction: &Transaction, ctx: &TickContext<'_>) -> bool {
        let id = transaction.id();
        let saved = {
            let lease = self.lease.lock();
            match &lease.holder {
                Some(holder) if holder.id == id => holder.saved_param.clone(),
                _ => return false,
            }
        };

        let mut released = transaction.clone();
        released.set_holder(self.core.name());
        released.set_param(FACILITY_PARAM, saved);
        if self.core.offer(&released, ctx).is_none() {
            return false;
        }

        let mut lease = self.lease.lock();
        let since = match &lease.holder {
            Some(holder) if holder.id == id => Some(holder.since),
            _ => None,
        };
        if let Some(since) = since {
            lease.holder = None;
            lease.releases += 1;
            lease.sum_hold += ctx.now().saturating_sub(since);
        }
        debug!(tick = ctx.now(), facility = %self.facility, transaction = %id, "Released");
        true
    }

    /// Figures are reported by the in half.
    fn report(&self, _ticks: Tick) -> BlockReport {
        BlockReport::passive(&self.core)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
