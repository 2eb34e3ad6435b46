//! Lifetime distribution of terminated transactions.

use gpss_blocks::Sink;
use gpss_simulation::Pipeline;
use hdrhistogram::Histogram;
use serde::Serialize;
use std::fmt;

/// Percentiles of transaction life (ticks from birth to termination),
/// across every sink of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifetimeSummary {
    pub samples: u64,
    pub min: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub max: u64,
    pub mean: f64,
}

impl LifetimeSummary {
    /// Summarise the given lives. `None` when there are none.
    pub fn from_lives(
        lives: impl IntoIterator<Item = u64>,
    ) -> Result<Option<Self>, hdrhistogram::CreationError> {
        let mut histogram = Histogram::<u64>::new(3)?;
        for life in lives {
            // Auto-resizing histogram: recording cannot go out of range
            let _ = histogram.record(life);
        }
        if histogram.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            samples: histogram.len(),
            min: histogram.min(),
            p50: histogram.value_at_quantile(0.50),
            p90: histogram.value_at_quantile(0.90),
            p99: histogram.value_at_quantile(0.99),
            max: histogram.max(),
            mean: histogram.mean(),
        }))
    }

    /// Collect the lives held by every sink of `pipeline`.
    pub fn collect(pipeline: &Pipeline) -> Result<Option<Self>, hdrhistogram::CreationError> {
        let lives = pipeline
            .blocks()
            .filter_map(|block| block.as_any().downcast_ref::<Sink>())
            .flat_map(|sink| sink.terminated())
            .filter_map(|t| t.life());
        Self::from_lives(lives)
    }
}

impl fmt::Display for LifetimeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "samples={} min={} p50={} p90={} p99={} max={} mean={:.2}",
            self.samples, self.min, self.p50, self.p90, self.p99, self.max, self.mean
        )
    }
}
