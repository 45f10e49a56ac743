// =============================================================================
// Signal Records — the unit exchanged between strategies and the aggregator
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::DataIntegrityError;
use crate::types::{Signal, Timestamp};

fn default_weight() -> f64 {
    1.0
}

/// One row of one strategy's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub timestamp: Timestamp,
    /// Indicator output the decision was derived from (strategy-specific units).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<f64>,
    /// -1 sell, 0 hold, +1 buy. Kept as a raw integer until validated.
    pub binary_signal: i8,
    pub strategy_id: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl SignalRecord {
    pub fn new(strategy_id: impl Into<String>, timestamp: Timestamp, signal: Signal) -> Self {
        Self {
            timestamp,
            raw_value: None,
            binary_signal: signal.value(),
            strategy_id: strategy_id.into(),
            weight: default_weight(),
        }
    }

    pub fn with_raw_value(mut self, raw_value: f64) -> Self {
        self.raw_value = Some(raw_value);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// A strategy's full series as handed to one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInput {
    pub strategy_id: String,
    pub records: Vec<SignalRecord>,
    /// Optional per-input weight override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl StrategyInput {
    pub fn new(strategy_id: impl Into<String>, records: Vec<SignalRecord>) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            records,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Weight embedded in the series itself, if it has any rows.
    pub fn embedded_weight(&self) -> Option<f64> {
        self.records.first().map(|r| r.weight)
    }

    /// Check ordering, ownership and signal range, and return the series as
    /// `(timestamp, signal)` pairs.
    ///
    /// Nothing is repaired: out-of-order rows are reported, never sorted.
    pub fn validated(&self) -> Result<Vec<(Timestamp, Signal)>, DataIntegrityError> {
        let mut out = Vec::with_capacity(self.records.len());
        let mut previous: Option<Timestamp> = None;

        for (index, record) in self.records.iter().enumerate() {
            if record.strategy_id != self.strategy_id {
                return Err(DataIntegrityError::ForeignRecord {
                    expected: self.strategy_id.clone(),
                    found: record.strategy_id.clone(),
                });
            }

            if let Some(prev) = previous {
                if record.timestamp == prev {
                    return Err(DataIntegrityError::DuplicateTimestamp {
                        strategy_id: self.strategy_id.clone(),
                        index,
                        timestamp: record.timestamp,
                    });
                }
                if record.timestamp < prev {
                    return Err(DataIntegrityError::NonMonotonicTimestamp {
                        strategy_id: self.strategy_id.clone(),
                        index,
                        previous: prev,
                        current: record.timestamp,
                    });
                }
            }
            previous = Some(record.timestamp);

            let signal = Signal::try_from(record.binary_signal).map_err(|value| {
                DataIntegrityError::SignalOutOfRange {
                    strategy_id: self.strategy_id.clone(),
                    timestamp: record.timestamp,
                    value,
                }
            })?;
            out.push((record.timestamp, signal));
        }

        Ok(out)
    }
}
