// =============================================================================
// Weighted Average Policy
// =============================================================================
//
//   aggregate_value[t] = Σ w[s]·signal[s,t] / Σ w[s]     over contributors s at t
//
// Absent strategies add to neither the numerator nor the denominator, so a
// strategy's silence never dilutes the weight pool. The score is therefore
// bounded to [-1, +1] without rescaling the weights themselves.
//
// A zero weight pool at `t` (all contributors weigh 0) yields an undefined
// score: the row is still emitted, as HOLD, with `strength_undefined` set.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::signals::aggregator::{AggregatedSignal, AggregationPolicy};
use crate::signals::alignment::{AlignedTable, StrategyWeight};
use crate::types::{AggregationMethod, Signal};

/// Numerator / denominator of one row, kept apart for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowScore {
    pub weighted_sum: f64,
    pub weight_pool: f64,
}

impl RowScore {
    /// The normalised score, or `None` when the pool is empty or the
    /// division does not yield a finite number.
    pub fn value(&self) -> Option<f64> {
        if self.weight_pool > 0.0 {
            let score = self.weighted_sum / self.weight_pool;
            score.is_finite().then_some(score)
        } else {
            None
        }
    }
}

/// The weighted-average scorer.
#[derive(Debug, Clone)]
pub struct WeightedScorer {
    /// Deadband around zero; |score| must strictly exceed it to act.
    pub signal_threshold: f64,
}

impl WeightedScorer {
    pub fn new(signal_threshold: f64) -> Self {
        Self { signal_threshold }
    }

    /// Score one aligned row against the run's weight vector.
    pub fn score_row(&self, row: &[Option<Signal>], weights: &[StrategyWeight]) -> RowScore {
        let mut weighted_sum = 0.0;
        let mut weight_pool = 0.0;

        for (cell, weight) in row.iter().zip(weights) {
            if let Some(signal) = cell {
                weighted_sum += weight.weight * f64::from(signal.value());
                weight_pool += weight.weight;
            }
        }

        RowScore {
            weighted_sum,
            weight_pool,
        }
    }

    pub fn decide(&self, score: Option<f64>) -> Signal {
        match score {
            Some(value) => Signal::from_score(value, self.signal_threshold),
            None => Signal::Hold,
        }
    }
}

impl Default for WeightedScorer {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl AggregationPolicy for WeightedScorer {
    fn method(&self) -> AggregationMethod {
        AggregationMethod::WeightedAverage
    }

    fn combine(&self, table: &AlignedTable) -> Vec<AggregatedSignal> {
        table
            .rows()
            .map(|(timestamp, row)| {
                let score = self.score_row(row, table.weights()).value();
                AggregatedSignal {
                    timestamp,
                    aggregate_value: score,
                    binary_signal: self.decide(score),
                    contributing_strategies: table.contributors(row),
                    policy: AggregationMethod::WeightedAverage,
                    strength_undefined: score.is_none(),
                }
            })
            .collect()
    }
}
