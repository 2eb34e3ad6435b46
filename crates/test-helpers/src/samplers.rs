//! Deterministic samplers.

use gpss_core::Sampler;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Always returns the middle of the range, so `spread(mean, h)` is `mean`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MidpointSampler;

impl Sampler for MidpointSampler {
    fn sample(&self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        min + (max - min) / 2
    }
}

/// Replays a script of values, clamped into the requested range.
///
/// Once the script runs out it returns `min`.
#[derive(Debug, Default)]
pub struct ScriptedSampler {
    script: Mutex<VecDeque<i64>>,
}

impl ScriptedSampler {
    pub fn new(script: impl IntoIterator<Item = i64>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    /// Values not consumed yet.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl Sampler for ScriptedSampler {
    fn sample(&self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        match self.script.lock().pop_front() {
            Some(v) => v.clamp(min, max),
            None => min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint() {
        assert_eq!(MidpointSampler.sample(2, 8), 5);
        assert_eq!(MidpointSampler.sample(3, 3), 3);
    }

    #[test]
    fn test_script_clamps_and_drains() {
        let sampler = ScriptedSampler::new([4, 100, -7]);
        assert_eq!(sampler.sample(0, 10), 4);
        assert_eq!(sampler.sample(0, 10), 10);
        assert_eq!(sampler.sample(0, 10), 0);
        assert_eq!(sampler.remaining(), 0);
        assert_eq!(sampler.sample(2, 10), 2);
    }
}
