//! Per-block statistics snapshots.
//!
//! Every block produces a [`BlockReport`] on demand. Reports are plain data:
//! they serialize with serde for machine consumption and implement `Display`
//! for the human-readable summary printed by the CLI. Averages whose
//! denominator is zero are `None`, rendered as `n/a` (or `null` in JSON).

use crate::BlockCore;
use gpss_types::{BlockId, SplitParts, TransactionId};
use serde::Serialize;
use std::fmt;

/// `numerator / denominator`, or `None` when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Statistics of one block, tagged with its identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockReport {
    pub id: BlockId,
    pub name: String,
    pub stats: BlockStats,
}

impl BlockReport {
    pub fn new(core: &BlockCore, stats: BlockStats) -> Self {
        Self {
            id: core.id(),
            name: core.name().to_owned(),
            stats,
        }
    }

    /// Report for a block that keeps no statistics.
    pub fn passive(core: &BlockCore) -> Self {
        Self::new(core, BlockStats::Passive)
    }
}

/// Variant-specific counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockStats {
    Generator(GeneratorStats),
    Queue(QueueStats),
    Advance(AdvanceStats),
    Facility(FacilityStats),
    Bifacility(BifacilityStats),
    Split(SplitStats),
    Aggregate(AggregateStats),
    Assign(AssignStats),
    Check(CheckStats),
    Count(CountStats),
    Sink(SinkStats),
    /// Blocks without counters of their own (e.g. the out half of a
    /// bifacility, whose figures live on the in half).
    Passive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratorStats {
    /// Transactions placed downstream.
    pub generated: u64,
    /// Transactions no destination accepted.
    pub lost: u64,
    /// Tick of the next scheduled birth, `None` once the cap is reached.
    pub next_birth: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStats {
    pub max_content: usize,
    pub total_entries: u64,
    pub zero_entries: u64,
    pub current_content: usize,
    pub zero_entry_percent: Option<f64>,
    pub average_content: Option<f64>,
    /// Wait is recorded when a transaction leaves, so transactions still
    /// queued count as entries but add no wait.
    pub average_wait: Option<f64>,
    /// Average wait counting only transactions that actually waited.
    pub average_wait_nonzero: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvanceStats {
    pub entries: u64,
    pub current_content: usize,
    pub average_advance: Option<f64>,
}

/// The transaction occupying a single-capacity resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolderInfo {
    pub id: TransactionId,
    pub parts: Option<SplitParts>,
}

impl fmt::Display for HolderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parts {
            Some(parts) => write!(f, "{} ({parts})", self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityStats {
    pub entries: u64,
    pub average_service: Option<f64>,
    pub utilization_percent: Option<f64>,
    pub holder: Option<HolderInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BifacilityStats {
    pub entries: u64,
    pub releases: u64,
    pub average_hold: Option<f64>,
    pub utilization_percent: Option<f64>,
    pub holder: Option<HolderInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitStats {
    pub inputs: u64,
    pub fragments: u64,
    /// Fragments their destination rejected.
    pub lost: u64,
    pub average_fragments: Option<f64>,
}

/// A join still waiting for fragments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingJoin {
    pub parent_id: TransactionId,
    pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    pub aggregated: u64,
    pub pending: Vec<PendingJoin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignStats {
    pub assigned: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckStats {
    pub true_outcomes: u64,
    pub false_outcomes: u64,
    /// False outcomes with no fallback destination.
    pub rejected: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountStats {
    /// Shared counter value.
    pub value: i64,
    pub delta: i64,
    pub passed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinkStats {
    pub killed: u64,
    pub average_life: Option<f64>,
    pub average_advance: Option<f64>,
}

/// Displays an optional average with two decimals.
struct Avg(Option<f64>);

impl fmt::Display for Avg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.2}"),
            None => f.write_str("n/a"),
        }
    }
}

struct Holder<'a>(&'a Option<HolderInfo>);

impl fmt::Display for Holder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(holder) => write!(f, "{holder}"),
            None => f.write_str("none"),
        }
    }
}

impl fmt::Display for BlockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: ", self.name, self.id.index())?;
        match &self.stats {
            BlockStats::Generator(s) => {
                write!(f, "generator generated={} lost={}", s.generated, s.lost)?;
                if let Some(next) = s.next_birth {
                    write!(f, " next_birth={next}")?;
                }
                Ok(())
            }
            BlockStats::Queue(s) => write!(
                f,
                "queue max={} entries={} zero_entries={} ({}%) current={} \
                 avg_content={} avg_wait={} avg_wait_nonzero={}",
                s.max_content,
                s.total_entries,
                s.zero_entries,
                Avg(s.zero_entry_percent),
                s.current_content,
                Avg(s.average_content),
                Avg(s.average_wait),
                Avg(s.average_wait_nonzero),
            ),
            BlockStats::Advance(s) => write!(
                f,
                "advance entries={} current={} avg_advance={}",
                s.entries,
                s.current_content,
                Avg(s.average_advance)
            ),
            BlockStats::Facility(s) => write!(
                f,
                "facility entries={} avg_service={} utilization={}% holder={}",
                s.entries,
                Avg(s.average_service),
                Avg(s.utilization_percent),
                Holder(&s.holder)
            ),
            BlockStats::Bifacility(s) => write!(
                f,
                "bifacility entries={} releases={} avg_hold={} utilization={}% holder={}",
                s.entries,
                s.releases,
                Avg(s.average_hold),
                Avg(s.utilization_percent),
                Holder(&s.holder)
            ),
            BlockStats::Split(s) => write!(
                f,
                "split inputs={} fragments={} lost={} avg_fragments={}",
                s.inputs,
                s.fragments,
                s.lost,
                Avg(s.average_fragments)
            ),
            BlockStats::Aggregate(s) => {
                write!(
                    f,
                    "aggregate aggregated={} pending={}",
                    s.aggregated,
                    s.pending.len()
                )?;
                for join in &s.pending {
                    write!(f, " {}:{}", join.parent_id.0, join.remaining)?;
                }
                Ok(())
            }
            BlockStats::Assign(s) => write!(f, "assign assigned={}", s.assigned),
            BlockStats::Check(s) => write!(
                f,
                "check true={} false={} rejected={}",
                s.true_outcomes, s.false_outcomes, s.rejected
            ),
            BlockStats::Count(s) => write!(
                f,
                "count value={} delta={:+} passed={}",
                s.value, s.delta, s.passed
            ),
            BlockStats::Sink(s) => write!(
                f,
                "sink killed={} avg_life={} avg_advance={}",
                s.killed,
                Avg(s.average_life),
                Avg(s.average_advance)
            ),
            BlockStats::Passive => f.write_str("passive"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(name: &str, id: usize) -> BlockCore {
        let mut core = BlockCore::new(name);
        core.set_id(BlockId(id));
        core
    }

    #[test]
    fn test_ratio_guards_zero() {
        assert_eq!(ratio(10.0, 4.0), Some(2.5));
        assert_eq!(ratio(10.0, 0.0), None);
    }

    #[test]
    fn test_display_renders_missing_averages() {
        let report = BlockReport::new(
            &core("chairs", 1),
            BlockStats::Queue(QueueStats {
                max_content: 0,
                total_entries: 0,
                zero_entries: 0,
                current_content: 0,
                zero_entry_percent: None,
                average_content: Some(0.0),
                average_wait: None,
                average_wait_nonzero: None,
            }),
        );
        let text = report.to_string();
        assert!(text.starts_with("chairs [1]: queue"));
        assert!(text.contains("avg_wait=n/a"));
        assert!(text.contains("avg_content=0.00"));
    }

    #[test]
    fn test_display_facility_holder() {
        let report = BlockReport::new(
            &core("barber", 2),
            BlockStats::Facility(FacilityStats {
                entries: 3,
                average_service: Some(5.0),
                utilization_percent: Some(75.0),
                holder: Some(HolderInfo {
                    id: TransactionId(4),
                    parts: None,
                }),
            }),
        );
        assert_eq!(
            report.to_string(),
            "barber [2]: facility entries=3 avg_service=5.00 utilization=75.00% holder=Transaction(4)"
        );
    }

    #[test]
    fn test_serialize_tags_kind() {
        let report = BlockReport::new(
            &core("exit", 3),
            BlockStats::Sink(SinkStats {
                killed: 2,
                average_life: Some(1.5),
                average_advance: None,
            }),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["name"], "exit");
        assert_eq!(json["id"], 3);
        assert_eq!(json["stats"]["kind"], "sink");
        assert_eq!(json["stats"]["killed"], 2);
        assert!(json["stats"]["average_advance"].is_null());

        let passive = serde_json::to_value(BlockReport::passive(&core("out", 4))).unwrap();
        assert_eq!(passive["stats"]["kind"], "passive");
    }
}
