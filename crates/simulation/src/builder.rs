//! Wiring blocks into a pipeline.

use crate::pipeline::{DoneCallback, Pipeline};
use crate::{BuildError, PipelineReport, SimulationConfig, TickMode};
use gpss_core::{Block, Sampler, SeededSampler};
use gpss_types::BlockId;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Registers blocks and their routes, then freezes them into a [`Pipeline`].
///
/// Blocks can be wired explicitly with [`connect`](Self::connect) or chained
/// in stages: every block of a stage routes to every block of the next one.
///
/// ```ignore
/// let mut builder = PipelineBuilder::new("barbershop");
/// builder.then(Generator::new("clients", 18, 6))?;
/// builder.then(Queue::new("chairs"))?;
/// builder.then(Facility::new("master", 16, 4))?;
/// builder.then(Sink::new("out"))?;
/// let pipeline = builder.build()?;
/// ```
pub struct PipelineBuilder {
    name: String,
    config: SimulationConfig,
    sampler: Option<Arc<dyn Sampler>>,
    blocks: Vec<Box<dyn Block>>,
    names: IndexMap<String, BlockId>,
    last_stage: Vec<BlockId>,
    on_done: Vec<DoneCallback>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: SimulationConfig::default(),
            sampler: None,
            blocks: Vec::new(),
            names: IndexMap::new(),
            last_stage: Vec::new(),
            on_done: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default seeded sampler.
    pub fn with_sampler(mut self, sampler: impl Sampler + 'static) -> Self {
        self.sampler = Some(Arc::new(sampler));
        self
    }

    /// Register a block without wiring it. Names must be unique.
    pub fn add(&mut self, block: impl Block) -> Result<BlockId, BuildError> {
        self.add_boxed(Box::new(block))
    }

    pub fn add_boxed(&mut self, mut block: Box<dyn Block>) -> Result<BlockId, BuildError> {
        if self.names.contains_key(block.name()) {
            return Err(BuildError::DuplicateName(block.name().to_owned()));
        }
        let id = BlockId(self.blocks.len());
        block.core_mut().set_id(id);
        self.names.insert(block.name().to_owned(), id);
        debug!(pipeline = %self.name, block = %block.name(), %id, "Block registered");
        self.blocks.push(block);
        Ok(id)
    }

    /// Append `to` to the destinations of `from`, keeping declaration order.
    pub fn connect(&mut self, from: BlockId, to: &[BlockId]) -> Result<(), BuildError> {
        for &id in to {
            self.check(id)?;
        }
        let core = self.block_mut(from)?.core_mut();
        let mut destinations = core.destinations().to_vec();
        destinations.extend_from_slice(to);
        core.set_destinations(destinations);
        Ok(())
    }

    pub fn connect_by_name(&mut self, from: &str, to: &[&str]) -> Result<(), BuildError> {
        let from = self.id_of(from)?;
        let to = to
            .iter()
            .map(|name| self.id_of(name))
            .collect::<Result<Vec<_>, _>>()?;
        self.connect(from, &to)
    }

    /// Route the false outcome of a check (or any block that honours a
    /// fallback) to `to`.
    pub fn set_fallback(&mut self, from: BlockId, to: BlockId) -> Result<(), BuildError> {
        self.check(to)?;
        self.block_mut(from)?.core_mut().set_fallback(Some(to));
        Ok(())
    }

    /// Register a stage of blocks and route the previous stage to all of them.
    pub fn stage(
        &mut self,
        blocks: impl IntoIterator<Item = Box<dyn Block>>,
    ) -> Result<Vec<BlockId>, BuildError> {
        let ids = blocks
            .into_iter()
            .map(|block| self.add_boxed(block))
            .collect::<Result<Vec<_>, _>>()?;
        for from in std::mem::take(&mut self.last_stage) {
            self.connect(from, &ids)?;
        }
        self.last_stage = ids.clone();
        Ok(ids)
    }

    /// Single-block stage.
    pub fn then(&mut self, block: impl Block) -> Result<BlockId, BuildError> {
        let ids = self.stage([Box::new(block) as Box<dyn Block>])?;
        Ok(ids[0])
    }

    /// Route the last stage back to an already registered block.
    pub fn loop_to(&mut self, to: BlockId) -> Result<(), BuildError> {
        if self.last_stage.is_empty() {
            return Err(BuildError::NoStage);
        }
        for from in self.last_stage.clone() {
            self.connect(from, &[to])?;
        }
        Ok(())
    }

    /// Register a callback run with the final report when the run completes.
    pub fn on_done(&mut self, callback: impl FnOnce(&PipelineReport) + Send + 'static) {
        self.on_done.push(Box::new(callback));
    }

    pub fn id_of(&self, name: &str) -> Result<BlockId, BuildError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| BuildError::UnknownName(name.to_owned()))
    }

    /// Freeze the registry.
    pub fn build(self) -> Result<Pipeline, BuildError> {
        if self.blocks.is_empty() {
            return Err(BuildError::Empty);
        }
        let pool = match (self.config.mode, self.config.threads) {
            (TickMode::Parallel, Some(threads)) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("gpss-tick-{i}"))
                    .build()?,
            ),
            _ => None,
        };
        let sampler = self
            .sampler
            .unwrap_or_else(|| Arc::new(SeededSampler::new(self.config.seed)));

        Ok(Pipeline::new(
            self.name,
            self.blocks,
            self.names,
            self.config,
            sampler,
            pool,
            self.on_done,
        ))
    }

    fn check(&self, id: BlockId) -> Result<(), BuildError> {
        if id.index() < self.blocks.len() {
            Ok(())
        } else {
            Err(BuildError::UnknownBlock(id))
        }
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut Box<dyn Block>, BuildError> {
        self.blocks
            .get_mut(id.index())
            .ok_or(BuildError::UnknownBlock(id))
    }
}
