//! Errors from building and running pipelines.

use gpss_types::BlockId;
use thiserror::Error;

/// Errors raised while wiring a pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("a block named {0:?} is already registered")]
    DuplicateName(String),

    #[error("unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("no block named {0:?}")]
    UnknownName(String),

    #[error("no stage to loop from")]
    NoStage,

    #[error("pipeline has no blocks")]
    Empty,

    #[error("failed to build tick thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors raised by run control.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("pipeline {0:?} has already been started")]
    AlreadyStarted(String),

    #[error("unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("simulation thread panicked")]
    WorkerPanicked,

    #[error("failed to spawn simulation thread: {0}")]
    Spawn(#[from] std::io::Error),
}
