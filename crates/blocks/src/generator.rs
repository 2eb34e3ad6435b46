//! Transaction source.

use gpss_core::{
    spread, Block, BlockCore, BlockReport, BlockStats, GeneratorStats, Sampler, TickContext,
};
use gpss_types::{Tick, Transaction};
use parking_lot::Mutex;
use std::any::Any;
use tracing::{debug, trace, warn};

/// Computes the delay until the next birth.
pub type BirthFn = Box<dyn Fn(&dyn Sampler) -> Tick + Send + Sync>;

/// How many transactions a birth tick produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerationPolicy {
    /// One transaction per birth tick.
    #[default]
    Single,
    /// Up to `size` transactions per birth tick, bounded by the count cap.
    Burst { size: u32 },
}

#[derive(Debug, Default)]
struct GeneratorState {
    /// `None` until the first tick schedules the first birth.
    next_birth: Option<Tick>,
    generated: u64,
    lost: u64,
}

/// Creates transactions at sampled intervals and offers them downstream.
///
/// The first birth happens at `start + delay`, where the default delay is
/// `interval ± half_range`. After every birth tick the next birth is
/// resampled relative to the current tick, at least one tick ahead. A
/// transaction no destination accepts is lost: it is counted and dropped,
/// never buffered. Its id stays consumed, so placed transactions may have
/// gaps in their ids.
///
/// With a non-zero `count` the generator stops once that many transactions
/// have been placed.
pub struct Generator {
    core: BlockCore,
    start: Tick,
    count: u64,
    policy: GenerationPolicy,
    birth: BirthFn,
    state: Mutex<GeneratorState>,
}

impl Generator {
    /// Create a generator with mean inter-birth time `interval` and the
    /// given half-range. The generator is unlimited and starts at tick 0.
    pub fn new(name: impl Into<String>, interval: Tick, half_range: Tick) -> Self {
        Self {
            core: BlockCore::new(name),
            start: 0,
            count: 0,
            policy: GenerationPolicy::default(),
            birth: Box::new(move |sampler: &dyn Sampler| spread(sampler, interval, half_range)),
            state: Mutex::new(GeneratorState::default()),
        }
    }

    /// Delay the first birth by `start` ticks.
    pub fn with_start(mut self, start: Tick) -> Self {
        self.start = start;
        self
    }

    /// Stop after `count` transactions have been placed. Zero is unlimited.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn with_policy(mut self, policy: GenerationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the inter-birth delay function.
    pub fn with_birth_fn(
        mut self,
        birth: impl Fn(&dyn Sampler) -> Tick + Send + Sync + 'static,
    ) -> Self {
        self.birth = Box::new(birth);
        self
    }

    /// Transactions placed so far.
    pub fn generated(&self) -> u64 {
        self.state.lock().generated
    }

    /// Transactions nobody accepted.
    pub fn lost(&self) -> u64 {
        self.state.lock().lost
    }

    fn exhausted(&self, state: &GeneratorState) -> bool {
        self.count != 0 && state.generated >= self.count
    }

    /// Number of transactions to create on this birth tick.
    fn batch_size(&self, state: &GeneratorState) -> u64 {
        let batch = match self.policy {
            GenerationPolicy::Single => 1,
            GenerationPolicy::Burst { size } => u64::from(size.max(1)),
        };
        if self.count == 0 {
            batch
        } else {
            batch.min(self.count - state.generated)
        }
    }

    fn birth(&self, ctx: &TickContext<'_>) -> bool {
        let id = ctx.next_transaction_id();
        let mut transaction = Transaction::new(id, ctx.now());
        transaction.set_holder(self.core.name());

        let placed = self.core.offer(&transaction, ctx).is_some();
        let mut state = self.state.lock();
        if placed {
            state.generated += 1;
            trace!(tick = ctx.now(), generator = %self.core.name(), %id, "Generated");
        } else {
            state.lost += 1;
            warn!(
                tick = ctx.now(),
                generator = %self.core.name(),
                %id,
                "No destination accepted new transaction, dropped"
            );
        }
        placed
    }
}

impl Block for Generator {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    /// Generators have no inputs.
    fn append_transact(&self, _transaction: &Transaction, _ctx: &TickContext<'_>) -> bool {
        false
    }

    fn handle_transacts(&self, ctx: &TickContext<'_>) {
        let now = ctx.now();
        let batch = {
            let mut state = self.state.lock();
            if self.exhausted(&state) {
                return;
            }
            let next = *state
                .next_birth
                .get_or_insert_with(|| now + self.start + (self.birth)(ctx.sampler()));
            if next > now {
                return;
            }
            self.batch_size(&state)
        };

        for _ in 0..batch {
            self.birth(ctx);
        }

        let mut state = self.state.lock();
        if self.exhausted(&state) {
            debug!(
                tick = now,
                generator = %self.core.name(),
                generated = state.generated,
                "Generation limit reached"
            );
            state.next_birth = None;
            return;
        }
        let delay = (self.birth)(ctx.sampler()).max(1);
        state.next_birth = Some(now + delay);
    }

    fn report(&self, _ticks: Tick) -> BlockReport {
        let state = self.state.lock();
        BlockReport::new(
            &self.core,
            BlockStats::Generator(GeneratorStats {
                generated: state.generated,
                lost: state.lost,
                next_birth: if self.exhausted(&state) {
                    None
                } else {
                    state.next_birth
                },
            }),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
