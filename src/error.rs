// =============================================================================
// Aggregation error taxonomy
// =============================================================================
//
// Two families, both fatal to the run that raised them:
//   - ConfigurationError  — the run was set up wrong (no strategies, unknown
//                           method, negative weight, ...).
//   - DataIntegrityError  — a strategy handed over a malformed series.
//
// Degenerate-but-valid inputs (zero contributing weight at a timestamp, a
// strategy absent for its warm-up window) are NOT errors; they show up in the
// aggregated output instead.
// =============================================================================

use thiserror::Error;

use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("no strategies supplied to the aggregation run")]
    NoStrategies,

    #[error("unknown aggregation method: {0}")]
    UnknownMethod(String),

    #[error("strategy {strategy_id} has negative weight {weight}")]
    NegativeWeight { strategy_id: String, weight: f64 },

    #[error("strategy {strategy_id} has non-finite weight {weight}")]
    NonFiniteWeight { strategy_id: String, weight: f64 },

    #[error("sum of strategy weights is zero")]
    ZeroWeightSum,

    #[error("sum of strategy weights is not finite")]
    NonFiniteWeightSum,

    #[error("strategy id {0} registered more than once")]
    DuplicateStrategy(String),

    #[error("signal threshold must be finite and >= 0, got {0}")]
    InvalidThreshold(f64),

    #[error("no strategy registered under kind {0}")]
    UnknownStrategy(String),

    #[error("invalid parameters for strategy {strategy_id}: {reason}")]
    InvalidParameters { strategy_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataIntegrityError {
    #[error(
        "strategy {strategy_id}: timestamp {current} at row {index} is earlier than previous {previous}"
    )]
    NonMonotonicTimestamp {
        strategy_id: String,
        index: usize,
        previous: Timestamp,
        current: Timestamp,
    },

    #[error("strategy {strategy_id}: duplicate timestamp {timestamp} at row {index}")]
    DuplicateTimestamp {
        strategy_id: String,
        index: usize,
        timestamp: Timestamp,
    },

    #[error("strategy {strategy_id}: signal {value} at {timestamp} is outside {{-1, 0, 1}}")]
    SignalOutOfRange {
        strategy_id: String,
        timestamp: Timestamp,
        value: i8,
    },

    #[error("series for strategy {expected} contains a record from {found}")]
    ForeignRecord { expected: String, found: String },
}

/// Any failure of an aggregation run. No partial output accompanies it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("data integrity error: {0}")]
    DataIntegrity(#[from] DataIntegrityError),
}

pub type Result<T> = std::result::Result<T, AggregationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offending_values() {
        let err = AggregationError::from(DataIntegrityError::DuplicateTimestamp {
            strategy_id: "rsi".into(),
            index: 3,
            timestamp: 1_700_000,
        });
        let msg = err.to_string();
        assert!(msg.contains("rsi"));
        assert!(msg.contains("1700000"));

        let err = AggregationError::from(ConfigurationError::NegativeWeight {
            strategy_id: "macd".into(),
            weight: -0.5,
        });
        assert!(err.to_string().starts_with("configuration error"));
    }
}
