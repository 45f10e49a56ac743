// =============================================================================
// Signals Module
// =============================================================================
//
// The aggregation engine:
// - Signal records and strategy inputs (validation)
// - Alignment & weight normalisation onto a common timestamp axis
// - Aggregation policies: weighted average, majority vote, consensus
// - Aggregated output with run metadata
// - Per-run diagnostics sink

pub mod aggregator;
pub mod alignment;
pub mod diagnostics;
pub mod record;
pub mod vote;
pub mod weighted_score;

pub use aggregator::{
    policy_for, AggregatedSeries, AggregatedSignal, AggregationConfig, AggregationPolicy,
    RunMetadata, SignalAggregator,
};
pub use alignment::{align, AlignedTable, StrategyWeight};
pub use diagnostics::{Diagnostic, RunDiagnostics, Severity};
pub use record::{SignalRecord, StrategyInput};
pub use vote::{Consensus, MajorityVote, VoteCount};
pub use weighted_score::{RowScore, WeightedScorer};
