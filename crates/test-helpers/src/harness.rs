//! Minimal block registry for unit tests.

use crate::MidpointSampler;
use gpss_core::{Block, IdAllocator, Sampler, TickContext};
use gpss_types::{BlockId, Tick, Transaction};
use indexmap::IndexMap;
use tracing::Span;

/// Owns a handful of blocks and builds tick contexts over them.
///
/// Unlike a pipeline it has no clock: tests pass the tick explicitly, and
/// [`Harness::tick`] handles blocks in registration order.
pub struct Harness {
    blocks: Vec<Box<dyn Block>>,
    names: IndexMap<String, BlockId>,
    ids: IdAllocator,
    sampler: Box<dyn Sampler>,
    span: Span,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// A harness whose sampler always picks the midpoint.
    pub fn new() -> Self {
        Self::with_sampler(MidpointSampler)
    }

    pub fn with_sampler(sampler: impl Sampler + 'static) -> Self {
        Self {
            blocks: Vec::new(),
            names: IndexMap::new(),
            ids: IdAllocator::new(),
            sampler: Box::new(sampler),
            span: Span::none(),
        }
    }

    /// Register a block and return its id.
    pub fn add(&mut self, block: impl Block) -> BlockId {
        self.add_boxed(Box::new(block))
    }

    pub fn add_boxed(&mut self, mut block: Box<dyn Block>) -> BlockId {
        let id = BlockId(self.blocks.len());
        block.core_mut().set_id(id);
        self.names.insert(block.name().to_owned(), id);
        self.blocks.push(block);
        id
    }

    pub fn connect(&mut self, from: BlockId, to: &[BlockId]) {
        self.blocks[from.index()]
            .core_mut()
            .set_destinations(to.to_vec());
    }

    pub fn set_fallback(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.index()].core_mut().set_fallback(Some(to));
    }

    /// Context for tick `now` with a horizon far in the future.
    pub fn ctx(&self, now: Tick) -> TickContext<'_> {
        TickContext::new(
            now,
            Tick::MAX,
            &self.blocks,
            &self.names,
            &self.ids,
            self.sampler.as_ref(),
            &self.span,
        )
    }

    /// Offer a transaction to a block at tick `now`.
    pub fn offer(&self, now: Tick, to: BlockId, transaction: &Transaction) -> bool {
        self.ctx(now).offer(to, transaction)
    }

    /// Handle every block once, in registration order.
    pub fn tick(&self, now: Tick) {
        let ctx = self.ctx(now);
        for block in &self.blocks {
            block.handle_transacts(&ctx);
        }
    }

    /// Run ticks `from..to`.
    pub fn run(&self, from: Tick, to: Tick) {
        for now in from..to {
            self.tick(now);
        }
    }

    /// Number of transaction ids allocated through this harness.
    pub fn ids_issued(&self) -> u64 {
        self.ids.issued()
    }

    /// Borrow a block as its concrete type.
    ///
    /// # Panics
    ///
    /// Panics if the id is unknown or the block has a different type.
    pub fn get<T: Block>(&self, id: BlockId) -> &T {
        self.blocks[id.index()]
            .as_any()
            .downcast_ref::<T>()
            .unwrap_or_else(|| panic!("{id} is not a {}", std::any::type_name::<T>()))
    }

    pub fn block(&self, id: BlockId) -> &dyn Block {
        self.blocks[id.index()].as_ref()
    }
}
