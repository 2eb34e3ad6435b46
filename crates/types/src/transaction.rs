//! The unit of flow moving through a pipeline.

use crate::{ParamValue, Parameter, Tick, TransactionId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Split metadata of a fragment produced by a Split block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitParts {
    /// 1-based index of this fragment.
    pub part: u32,
    /// Number of fragments the parent was split into.
    pub total_parts: u32,
    /// ID of the transaction that was split.
    pub parent_id: TransactionId,
}

impl fmt::Display for SplitParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} of {}", self.part, self.total_parts, self.parent_id)
    }
}

/// A transaction (job, customer, task) flowing between blocks.
///
/// Exactly one block owns a transaction at any time. Blocks offer a borrowed
/// transaction downstream; the accepting block keeps its own copy and the
/// offering block drops the original only after acceptance, so a rejected
/// offer never changes the transaction.
///
/// Once [`kill`](Self::kill) has been called the transaction is terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    id: TransactionId,
    born: Tick,
    rip: Option<Tick>,
    ticks: u64,
    advance: u64,
    time_in_queue: u64,
    holder: String,
    parts: Option<SplitParts>,
    params: BTreeMap<String, ParamValue>,
}

impl Transaction {
    /// Create a transaction born at `born`.
    pub fn new(id: TransactionId, born: Tick) -> Self {
        Self {
            id,
            born,
            rip: None,
            ticks: 0,
            advance: 0,
            time_in_queue: 0,
            holder: String::new(),
            parts: None,
            params: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Return the same transaction under a different identity.
    pub fn with_id(mut self, id: TransactionId) -> Self {
        self.id = id;
        self
    }

    /// Create a fragment of this transaction.
    ///
    /// The fragment shares the parameters and timing counters of its parent
    /// but carries a fresh identity and the given split position.
    pub fn fragment(&self, id: TransactionId, part: u32, total_parts: u32) -> Self {
        let mut fragment = self.clone();
        fragment.id = id;
        fragment.parts = Some(SplitParts {
            part,
            total_parts,
            parent_id: self.id,
        });
        fragment
    }

    pub fn born(&self) -> Tick {
        self.born
    }

    /// Tick at which the transaction was killed, if it has been.
    pub fn rip(&self) -> Option<Tick> {
        self.rip
    }

    pub fn is_killed(&self) -> bool {
        self.rip.is_some()
    }

    /// Kill the transaction at `now`.
    ///
    /// Returns `false` (and leaves `rip` untouched) if it was already killed.
    pub fn kill(&mut self, now: Tick) -> bool {
        if self.rip.is_some() {
            return false;
        }
        debug_assert!(now >= self.born, "transaction killed before it was born");
        self.rip = Some(now);
        true
    }

    /// Lifetime `rip - born`, or `None` while alive.
    pub fn life(&self) -> Option<Tick> {
        self.rip.map(|rip| rip.saturating_sub(self.born))
    }

    /// Remaining hold time.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Start a hold of `interval` ticks, adding it to the advance time.
    pub fn set_ticks(&mut self, interval: u64) {
        self.ticks = interval;
        self.advance += interval;
    }

    /// Count one tick of hold time down, saturating at zero.
    pub fn dec_ticks(&mut self) {
        self.ticks = self.ticks.saturating_sub(1);
    }

    /// Whether the current hold has elapsed.
    pub fn is_finished(&self) -> bool {
        self.ticks == 0
    }

    /// Cumulative time spent in held states.
    pub fn advance(&self) -> u64 {
        self.advance
    }

    /// Keep the later of two advance times.
    pub fn merge_advance(&mut self, other: u64) {
        self.advance = self.advance.max(other);
    }

    pub fn time_in_queue(&self) -> u64 {
        self.time_in_queue
    }

    pub fn reset_queue_time(&mut self) {
        self.time_in_queue = 0;
    }

    /// Account one tick of waiting in a queue.
    pub fn inc_queue_time(&mut self) {
        self.time_in_queue += 1;
        self.advance += 1;
    }

    /// Name of the block currently holding the transaction.
    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn set_holder(&mut self, holder: &str) {
        holder.clone_into(&mut self.holder);
    }

    pub fn parts(&self) -> Option<SplitParts> {
        self.parts
    }

    pub fn set_parts(&mut self, parts: Option<SplitParts>) {
        self.parts = parts;
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Write a parameter. `None` deletes it.
    pub fn set_param(&mut self, name: &str, value: Option<ParamValue>) {
        match value {
            Some(value) => {
                self.params.insert(name.to_owned(), value);
            }
            None => {
                self.params.remove(name);
            }
        }
    }

    /// Apply a list of parameter writes in order.
    pub fn apply(&mut self, parameters: &[Parameter]) {
        for p in parameters {
            self.set_param(&p.name, p.value.clone());
        }
    }

    /// Integer parameter.
    ///
    /// # Panics
    ///
    /// Panics if the parameter exists with a different type.
    pub fn int_param(&self, name: &str) -> Option<i64> {
        match self.param(name)? {
            ParamValue::Int(v) => Some(*v),
            other => type_mismatch(self.id, name, "int", other),
        }
    }

    /// Float parameter.
    ///
    /// # Panics
    ///
    /// Panics if the parameter exists with a different type.
    pub fn float_param(&self, name: &str) -> Option<f64> {
        match self.param(name)? {
            ParamValue::Float(v) => Some(*v),
            other => type_mismatch(self.id, name, "float", other),
        }
    }

    /// String parameter.
    ///
    /// # Panics
    ///
    /// Panics if the parameter exists with a different type.
    pub fn str_param(&self, name: &str) -> Option<&str> {
        match self.param(name)? {
            ParamValue::Str(v) => Some(v),
            other => type_mismatch(self.id, name, "string", other),
        }
    }

    /// Boolean parameter.
    ///
    /// # Panics
    ///
    /// Panics if the parameter exists with a different type.
    pub fn bool_param(&self, name: &str) -> Option<bool> {
        match self.param(name)? {
            ParamValue::Bool(v) => Some(*v),
            other => type_mismatch(self.id, name, "bool", other),
        }
    }
}

fn type_mismatch(id: TransactionId, name: &str, expected: &str, found: &ParamValue) -> ! {
    panic!(
        "{id}: parameter {name:?} is {}, expected {expected}",
        found.type_name()
    )
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} born={} advance={} holder={:?} ticks={} queue={}",
            self.id, self.born, self.advance, self.holder, self.ticks, self.time_in_queue
        )?;
        if let Some(parts) = self.parts {
            write!(f, " part={parts}")?;
        }
        Ok(())
    }
}
