//! The tick scheduler.

use crate::{PipelineReport, SimulationConfig, SimulationError, SimulationHandle, TickMode};
use gpss_core::{Block, IdAllocator, Sampler, TickContext};
use gpss_types::{BlockId, Tick, Transaction};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, info_span, trace, Span};

pub(crate) type DoneCallback = Box<dyn FnOnce(&PipelineReport) + Send>;

struct Completion {
    /// Set once the pending callbacks have been taken for the final report.
    completed: bool,
    pending: Vec<DoneCallback>,
}

/// Publishes completion when a run exits, including by unwinding.
struct DoneGuard<'a> {
    pipeline: &'a Pipeline,
}

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.pipeline.completion.lock().completed = true;
        self.pipeline.done.send_replace(true);
    }
}

/// A frozen block registry plus the clock that drives it.
///
/// Each tick every block's `handle_transacts` runs once; the clock advances
/// only after all of them have returned. Built by
/// [`PipelineBuilder`](crate::PipelineBuilder). A pipeline runs once.
pub struct Pipeline {
    name: String,
    blocks: Vec<Box<dyn Block>>,
    names: IndexMap<String, BlockId>,
    config: SimulationConfig,
    sampler: Arc<dyn Sampler>,
    ids: IdAllocator,
    pool: Option<rayon::ThreadPool>,

    /// Current tick while running, elapsed ticks afterwards.
    clock: AtomicU64,
    horizon: AtomicU64,
    started: AtomicBool,
    stop_requested: AtomicBool,
    stopped_early: AtomicBool,

    done: watch::Sender<bool>,
    completion: Mutex<Completion>,
    span: Span,
}

impl Pipeline {
    pub(crate) fn new(
        name: String,
        blocks: Vec<Box<dyn Block>>,
        names: IndexMap<String, BlockId>,
        config: SimulationConfig,
        sampler: Arc<dyn Sampler>,
        pool: Option<rayon::ThreadPool>,
        on_done: Vec<DoneCallback>,
    ) -> Self {
        let span = info_span!("pipeline", name = %name);
        let (done, _) = watch::channel(false);
        Self {
            name,
            blocks,
            names,
            config,
            sampler,
            ids: IdAllocator::new(),
            pool,
            clock: AtomicU64::new(0),
            horizon: AtomicU64::new(Tick::MAX),
            started: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            stopped_early: AtomicBool::new(false),
            done,
            completion: Mutex::new(Completion {
                completed: false,
                pending: on_done,
            }),
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current model time.
    pub fn now(&self) -> Tick {
        self.clock.load(Ordering::Acquire)
    }

    pub fn block(&self, id: BlockId) -> Option<&dyn Block> {
        self.blocks.get(id.index()).map(|b| b.as_ref())
    }

    pub fn block_by_name(&self, name: &str) -> Option<&dyn Block> {
        self.id_of(name).and_then(|id| self.block(id))
    }

    pub fn id_of(&self, name: &str) -> Option<BlockId> {
        self.names.get(name).copied()
    }

    /// Borrow a block as its concrete type.
    pub fn block_as<T: Block>(&self, id: BlockId) -> Option<&T> {
        self.block(id)?.as_any().downcast_ref::<T>()
    }

    /// Blocks in registration order.
    pub fn blocks(&self) -> impl Iterator<Item = &dyn Block> {
        self.blocks.iter().map(|b| b.as_ref())
    }

    /// Run `ticks` ticks on the calling thread and return the final report.
    ///
    /// Returns early, at a tick boundary, once [`stop`](Self::stop) has been
    /// called.
    pub fn run(&self, ticks: Tick) -> Result<PipelineReport, SimulationError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SimulationError::AlreadyStarted(self.name.clone()));
        }
        self.horizon.store(ticks, Ordering::Release);
        let _done = DoneGuard { pipeline: self };

        let report = {
            let _guard = self.span.enter();
            info!(
                ticks,
                mode = %self.config.mode,
                blocks = self.blocks.len(),
                "Simulation started"
            );

            let mut now = 0;
            while now < ticks {
                if self.stop_requested.load(Ordering::Acquire) {
                    self.stopped_early.store(true, Ordering::Release);
                    info!(tick = now, "Simulation stopped");
                    break;
                }
                self.clock.store(now, Ordering::Release);
                self.tick(&self.context(now, ticks));
                now += 1;
            }
            self.clock.store(now, Ordering::Release);

            let report = self.report();
            info!(
                ticks = report.ticks,
                transactions = report.transactions,
                "Simulation finished"
            );
            report
        };

        let callbacks = {
            let mut completion = self.completion.lock();
            completion.completed = true;
            std::mem::take(&mut completion.pending)
        };
        for callback in callbacks {
            callback(&report);
        }
        Ok(report)
    }

    /// Run on a background thread.
    pub fn start(self: &Arc<Self>, ticks: Tick) -> Result<SimulationHandle, SimulationError> {
        if self.started.load(Ordering::Acquire) {
            return Err(SimulationError::AlreadyStarted(self.name.clone()));
        }
        let pipeline = Arc::clone(self);
        let thread = std::thread::Builder::new()
            .name(format!("gpss-{}", self.name))
            .spawn(move || pipeline.run(ticks))?;
        Ok(SimulationHandle::new(Arc::clone(self), thread))
    }

    /// Ask a running simulation to halt at the next tick boundary.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Completion signal. Turns `true` once the run has finished.
    pub fn done(&self) -> watch::Receiver<bool> {
        self.done.subscribe()
    }

    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// Register a callback for the final report. Runs immediately when the
    /// simulation has already completed, including from within another
    /// completion callback.
    pub fn on_done(&self, callback: impl FnOnce(&PipelineReport) + Send + 'static) {
        {
            let mut completion = self.completion.lock();
            if !completion.completed {
                completion.pending.push(Box::new(callback));
                return;
            }
        }
        callback(&self.report());
    }

    /// Offer an external transaction to a block at the current tick.
    pub fn inject(&self, to: BlockId, transaction: &Transaction) -> Result<bool, SimulationError> {
        let block = self
            .blocks
            .get(to.index())
            .ok_or(SimulationError::UnknownBlock(to))?;
        let _guard = self.span.enter();
        let ctx = self.context(self.now(), self.horizon.load(Ordering::Acquire));
        let accepted = block.append_transact(transaction, &ctx);
        trace!(tick = ctx.now(), %to, transaction = %transaction.id(), accepted, "Injected");
        Ok(accepted)
    }

    /// A fresh transaction born now, with an id from the pipeline's allocator.
    pub fn new_transaction(&self) -> Transaction {
        Transaction::new(self.ids.next_id(), self.now())
    }

    /// Statistics of every block, ordered by block id.
    pub fn report(&self) -> PipelineReport {
        let ticks = self.now();
        PipelineReport {
            name: self.name.clone(),
            ticks,
            mode: self.config.mode,
            transactions: self.ids.issued(),
            stopped: self.stopped_early.load(Ordering::Acquire),
            blocks: self.blocks.iter().map(|b| b.report(ticks)).collect(),
        }
    }

    fn context(&self, now: Tick, horizon: Tick) -> TickContext<'_> {
        TickContext::new(
            now,
            horizon,
            &self.blocks,
            &self.names,
            &self.ids,
            self.sampler.as_ref(),
            &self.span,
        )
    }

    fn tick(&self, ctx: &TickContext<'_>) {
        trace!(tick = ctx.now(), "Tick");
        match self.config.mode {
            TickMode::Sequential => {
                for block in &self.blocks {
                    block.handle_transacts(ctx);
                }
            }
            TickMode::Parallel => {
                // Returns once every block is done: the tick barrier
                let fan_out = || {
                    self.blocks.par_iter().for_each(|block| {
                        let _guard = ctx.span().enter();
                        block.handle_transacts(ctx);
                    })
                };
                match &self.pool {
                    Some(pool) => pool.install(fan_out),
                    None => fan_out(),
                }
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("blocks", &self.blocks.len())
            .field("now", &self.now())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineBuilder;
    use gpss_test_helpers::{transaction, ProbeBlock};
    use std::sync::atomic::AtomicUsize;
    use tracing_test::traced_test;

    fn single_probe(mode: TickMode) -> (Pipeline, BlockId) {
        let mut builder =
            PipelineBuilder::new("probe").with_config(SimulationConfig::default().with_mode(mode));
        let probe = builder.add(ProbeBlock::new("probe")).unwrap();
        (builder.build().unwrap(), probe)
    }

    #[test]
    #[traced_test]
    fn test_run_advances_clock() {
        let (pipeline, _) = single_probe(TickMode::Parallel);
        let report = pipeline.run(7).unwrap();
        assert_eq!(report.ticks, 7);
        assert!(!report.stopped);
        assert_eq!(pipeline.now(), 7);
        assert!(pipeline.is_done());
        assert!(logs_contain("Simulation finished"));
    }

    #[test]
    fn test_runs_only_once() {
        let (pipeline, _) = single_probe(TickMode::Sequential);
        pipeline.run(1).unwrap();
        assert!(matches!(
            pipeline.run(1),
            Err(SimulationError::AlreadyStarted(_))
        ));
    }

    #[test]
    fn test_stop_before_run_halts_at_zero() {
        let (pipeline, _) = single_probe(TickMode::Sequential);
        pipeline.stop();
        let report = pipeline.run(100).unwrap();
        assert_eq!(report.ticks, 0);
        assert!(report.stopped);
    }

    #[test]
    fn test_on_done_callbacks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (pipeline, _) = single_probe(TickMode::Sequential);
        let seen = Arc::clone(&calls);
        pipeline.on_done(move |report| {
            assert_eq!(report.ticks, 3);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        pipeline.run(3).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Late registration fires at once
        let seen = Arc::clone(&calls);
        pipeline.on_done(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_registered_during_completion_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Arc::new(single_probe(TickMode::Sequential).0);
        let inner = Arc::clone(&pipeline);
        let seen = Arc::clone(&calls);
        pipeline.on_done(move |_| {
            let seen = Arc::clone(&seen);
            inner.on_done(move |report| {
                assert_eq!(report.ticks, 3);
                seen.fetch_add(1, Ordering::SeqCst);
            });
        });
        pipeline.run(3).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_done_published_after_panic() {
        let (pipeline, _) = single_probe(TickMode::Sequential);
        let run = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _done = DoneGuard {
                pipeline: &pipeline,
            };
            panic!("block failed");
        }));
        assert!(run.is_err());
        assert!(pipeline.is_done());

        // Late registration still fires
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        pipeline.on_done(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inject() {
        let (pipeline, probe) = single_probe(TickMode::Sequential);
        let t = pipeline.new_transaction();
        assert!(pipeline.inject(probe, &t).unwrap());
        assert!(pipeline.inject(probe, &transaction(99, 0)).unwrap());
        assert_eq!(pipeline.block_as::<ProbeBlock>(probe).unwrap().accepted().len(), 2);
        assert!(matches!(
            pipeline.inject(BlockId(5), &t),
            Err(SimulationError::UnknownBlock(_))
        ));
        assert_eq!(pipeline.report().transactions, 1);
    }

    #[test]
    fn test_dedicated_pool() {
        let mut builder = PipelineBuilder::new("pool")
            .with_config(SimulationConfig::default().with_threads(2));
        builder.add(ProbeBlock::new("a")).unwrap();
        builder.add(ProbeBlock::new("b")).unwrap();
        let pipeline = builder.build().unwrap();
        assert_eq!(pipeline.run(5).unwrap().blocks.len(), 2);
    }
}
