//! Whole-pipeline report.

use crate::TickMode;
use gpss_core::BlockReport;
use gpss_types::Tick;
use serde::Serialize;
use std::fmt;

/// Snapshot of every block of a pipeline, ordered by block id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub name: String,
    /// Model time elapsed.
    pub ticks: Tick,
    pub mode: TickMode,
    /// Transaction ids issued so far, fragments included. Lost generator
    /// births keep their ids, so this can exceed the transactions placed.
    pub transactions: u64,
    /// Whether the run was stopped before its horizon.
    pub stopped: bool,
    pub blocks: Vec<BlockReport>,
}

impl PipelineReport {
    pub fn block(&self, name: &str) -> Option<&BlockReport> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline {:?}", self.name)?;
        write!(f, "Simulation time {}", self.ticks)?;
        if self.stopped {
            f.write_str(" (stopped)")?;
        }
        writeln!(f)?;
        for block in &self.blocks {
            writeln!(f, "{block}")?;
        }
        Ok(())
    }
}
