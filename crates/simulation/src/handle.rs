//! Control of a simulation running on a background thread.

use crate::{Pipeline, PipelineReport, SimulationError};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::watch;

/// Returned by [`Pipeline::start`].
pub struct SimulationHandle {
    pipeline: Arc<Pipeline>,
    done: watch::Receiver<bool>,
    thread: JoinHandle<Result<PipelineReport, SimulationError>>,
}

impl SimulationHandle {
    pub(crate) fn new(
        pipeline: Arc<Pipeline>,
        thread: JoinHandle<Result<PipelineReport, SimulationError>>,
    ) -> Self {
        let done = pipeline.done();
        Self {
            pipeline,
            done,
            thread,
        }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Halt at the next tick boundary.
    pub fn stop(&self) {
        self.pipeline.stop();
    }

    /// Completion signal, usable from async code.
    pub fn done(&self) -> watch::Receiver<bool> {
        self.done.clone()
    }

    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// Wait asynchronously until the run has completed.
    ///
    /// Also resolves when the simulation thread panicked; [`wait`](Self::wait)
    /// then reports [`SimulationError::WorkerPanicked`].
    pub async fn finished(&mut self) {
        let _ = self.done.wait_for(|done| *done).await;
    }

    /// Block until the simulation thread exits and return its report.
    pub fn wait(self) -> Result<PipelineReport, SimulationError> {
        self.thread
            .join()
            .map_err(|_| SimulationError::WorkerPanicked)?
    }
}
