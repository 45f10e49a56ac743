// =============================================================================
// Signal Aggregator — policy contract, dispatch, and aggregated output
// =============================================================================
//
// One run:
//   1. Validate run configuration (threshold, method).
//   2. Align every strategy series onto a common axis and resolve weights.
//   3. Apply the selected policy row by row.
//   4. Wrap the rows with run metadata.
//
// The aggregator keeps no state between runs; every run owns its inputs,
// its diagnostics sink, and its output.
// =============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigurationError, Result};
use crate::signals::alignment::{align, AlignedTable, StrategyWeight};
use crate::signals::diagnostics::RunDiagnostics;
use crate::signals::record::StrategyInput;
use crate::signals::vote::{Consensus, MajorityVote};
use crate::signals::weighted_score::WeightedScorer;
use crate::types::{AggregationMethod, Signal, Timestamp};

// =============================================================================
// Output model
// =============================================================================

fn is_false(value: &bool) -> bool {
    !*value
}

/// One row of the unified decision stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedSignal {
    pub timestamp: Timestamp,
    /// Continuous score before thresholding (weighted average only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_value: Option<f64>,
    pub binary_signal: Signal,
    /// Strategies with a defined signal here, in registration order.
    pub contributing_strategies: Vec<String>,
    pub policy: AggregationMethod,
    /// Set when the weighted score could not be computed (zero weight pool).
    #[serde(default, skip_serializing_if = "is_false")]
    pub strength_undefined: bool,
}

/// Rows compare on `(timestamp, binary_signal, aggregate_value)` only.
impl PartialEq for AggregatedSignal {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.binary_signal == other.binary_signal
            && self.aggregate_value == other.aggregate_value
    }
}

/// Describes how an aggregated series was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub policy: AggregationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_threshold: Option<f64>,
    pub weights: Vec<StrategyWeight>,
    pub input_strategies: usize,
    pub output_rows: usize,
}

/// Read-only result of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSeries {
    rows: Vec<AggregatedSignal>,
    metadata: RunMetadata,
}

impl AggregatedSeries {
    pub fn rows(&self) -> &[AggregatedSignal] {
        &self.rows
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, timestamp: Timestamp) -> Option<&AggregatedSignal> {
        self.rows
            .binary_search_by_key(&timestamp, |row| row.timestamp)
            .ok()
            .map(|idx| &self.rows[idx])
    }

    /// Count of BUY / HOLD / SELL rows, in that order.
    pub fn signal_counts(&self) -> (usize, usize, usize) {
        self.rows.iter().fold((0, 0, 0), |(b, h, s), row| match row.binary_signal {
            Signal::Buy => (b + 1, h, s),
            Signal::Hold => (b, h + 1, s),
            Signal::Sell => (b, h, s + 1),
        })
    }

    pub fn into_rows(self) -> Vec<AggregatedSignal> {
        self.rows
    }
}

// =============================================================================
// Policy contract
// =============================================================================

/// A pure combination function over an aligned table.
///
/// Implementations must be deterministic and emit exactly one row per
/// timestamp of the table, in table order.
pub trait AggregationPolicy: Send + Sync {
    fn method(&self) -> AggregationMethod;

    fn combine(&self, table: &AlignedTable) -> Vec<AggregatedSignal>;
}

/// Build the policy object for a method.
pub fn policy_for(method: AggregationMethod, signal_threshold: f64) -> Box<dyn AggregationPolicy> {
    match method {
        AggregationMethod::WeightedAverage => Box::new(WeightedScorer::new(signal_threshold)),
        AggregationMethod::MajorityVote => Box::new(MajorityVote),
        AggregationMethod::Consensus => Box::new(Consensus),
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// Validated, read-only configuration for aggregation runs.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    pub method: AggregationMethod,
    pub signal_threshold: f64,
    /// Run-level weight overrides keyed by strategy id.
    pub weights: HashMap<String, f64>,
}

impl AggregationConfig {
    pub fn new(method: AggregationMethod) -> Self {
        Self {
            method,
            signal_threshold: 0.0,
            weights: HashMap::new(),
        }
    }

    pub fn with_threshold(mut self, signal_threshold: f64) -> Self {
        self.signal_threshold = signal_threshold;
        self
    }

    pub fn with_weight(mut self, strategy_id: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(strategy_id.into(), weight);
        self
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self::new(AggregationMethod::WeightedAverage)
    }
}

pub struct SignalAggregator {
    config: AggregationConfig,
    policy: Box<dyn AggregationPolicy>,
}

impl SignalAggregator {
    pub fn new(config: AggregationConfig) -> Result<Self> {
        if !config.signal_threshold.is_finite() || config.signal_threshold < 0.0 {
            return Err(ConfigurationError::InvalidThreshold(config.signal_threshold).into());
        }
        let policy = policy_for(config.method, config.signal_threshold);
        Ok(Self { config, policy })
    }

    /// Build from a method name as it appears in configuration.
    pub fn from_method_name(name: &str, signal_threshold: f64) -> Result<Self> {
        let method = name.parse::<AggregationMethod>()?;
        Self::new(AggregationConfig::new(method).with_threshold(signal_threshold))
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn method(&self) -> AggregationMethod {
        self.policy.method()
    }

    /// Run one aggregation with a fresh diagnostics sink.
    pub fn aggregate(&self, inputs: &[StrategyInput]) -> Result<AggregatedSeries> {
        self.aggregate_with(inputs, &RunDiagnostics::new())
    }

    /// Run one aggregation, attributing diagnostics to the given sink.
    ///
    /// All-or-nothing: on error no rows are returned.
    pub fn aggregate_with(
        &self,
        inputs: &[StrategyInput],
        diagnostics: &RunDiagnostics,
    ) -> Result<AggregatedSeries> {
        let method = self.policy.method();
        let table = align(
            inputs,
            &self.config.weights,
            method.uses_weights(),
            diagnostics,
        )?;

        let rows = self.policy.combine(&table);

        let metadata = RunMetadata {
            policy: method,
            signal_threshold: method.uses_weights().then_some(self.config.signal_threshold),
            weights: table.weights().to_vec(),
            input_strategies: table.strategy_count(),
            output_rows: rows.len(),
        };

        diagnostics.span().in_scope(|| {
            info!(
                policy = %method,
                strategies = metadata.input_strategies,
                rows = metadata.output_rows,
                "aggregation complete"
            );
        });

        Ok(AggregatedSeries { rows, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AggregationError;
    use crate::signals::record::SignalRecord;

    fn series(id: &str, rows: &[(Timestamp, Signal)]) -> StrategyInput {
        StrategyInput::new(
            id,
            rows.iter()
                .map(|&(ts, s)| SignalRecord::new(id, ts, s))
                .collect(),
        )
    }

    fn run(method: AggregationMethod, inputs: &[StrategyInput]) -> AggregatedSeries {
        SignalAggregator::new(AggregationConfig::new(method))
            .unwrap()
            .aggregate(inputs)
            .unwrap()
    }

    #[test]
    fn negative_threshold_rejected() {
        let err = SignalAggregator::new(AggregationConfig::default().with_threshold(-0.1))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            AggregationError::Configuration(ConfigurationError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn unknown_method_name_rejected() {
        let err = SignalAggregator::from_method_name("average", 0.0).err().unwrap();
        assert_eq!(
            err,
            AggregationError::Configuration(ConfigurationError::UnknownMethod("average".into()))
        );
    }

    #[test]
    fn metadata_describes_the_run() {
        let inputs = [
            series("a", &[(1, Signal::Buy), (2, Signal::Buy)]),
            series("b", &[(2, Signal::Sell)]).with_weight(2.0),
        ];
        let out = SignalAggregator::new(AggregationConfig::default().with_threshold(0.1))
            .unwrap()
            .aggregate(&inputs)
            .unwrap();
        let meta = out.metadata();
        assert_eq!(meta.policy, AggregationMethod::WeightedAverage);
        assert_eq!(meta.signal_threshold, Some(0.1));
        assert_eq!(meta.input_strategies, 2);
        assert_eq!(meta.output_rows, 2);
        assert_eq!(meta.weights[1].weight, 2.0);

        let voted = run(AggregationMethod::Consensus, &inputs);
        assert_eq!(voted.metadata().signal_threshold, None);
    }

    #[test]
    fn vote_policies_omit_aggregate_value() {
        let inputs = [
            series("a", &[(1, Signal::Buy)]),
            series("b", &[(1, Signal::Buy)]),
        ];
        for method in [AggregationMethod::MajorityVote, AggregationMethod::Consensus] {
            let out = run(method, &inputs);
            assert_eq!(out.rows()[0].aggregate_value, None);
            assert_eq!(out.rows()[0].binary_signal, Signal::Buy);
            assert_eq!(out.rows()[0].policy, method);
        }
    }

    #[test]
    fn vote_policies_accept_all_zero_weights() {
        let inputs = [series("a", &[(1, Signal::Sell)]).with_weight(0.0)];
        let out = run(AggregationMethod::MajorityVote, &inputs);
        assert_eq!(out.rows()[0].binary_signal, Signal::Sell);
    }

    #[test]
    fn lookup_and_counts() {
        let inputs = [series(
            "a",
            &[(10, Signal::Buy), (20, Signal::Hold), (30, Signal::Sell), (40, Signal::Buy)],
        )];
        let out = run(AggregationMethod::Consensus, &inputs);
        assert_eq!(out.get(30).unwrap().binary_signal, Signal::Sell);
        assert!(out.get(25).is_none());
        assert_eq!(out.signal_counts(), (2, 1, 1));
    }

    #[test]
    fn equality_ignores_contributors() {
        let a = AggregatedSignal {
            timestamp: 1,
            aggregate_value: Some(0.5),
            binary_signal: Signal::Buy,
            contributing_strategies: vec!["x".into()],
            policy: AggregationMethod::WeightedAverage,
            strength_undefined: false,
        };
        let mut b = a.clone();
        b.contributing_strategies.clear();
        assert_eq!(a, b);
        b.aggregate_value = Some(0.4);
        assert_ne!(a, b);
    }

    #[test]
    fn diagnostics_are_scoped_to_the_run() {
        let aggregator = SignalAggregator::new(AggregationConfig::default()).unwrap();
        let first = RunDiagnostics::with_run_id("first");
        let second = RunDiagnostics::with_run_id("second");

        aggregator
            .aggregate_with(&[series("a", &[(1, Signal::Buy)]), series("b", &[])], &first)
            .unwrap();
        aggregator
            .aggregate_with(&[series("a", &[(1, Signal::Buy)])], &second)
            .unwrap();

        assert_eq!(first.warnings().len(), 1);
        assert!(second.warnings().is_empty());
    }
}
