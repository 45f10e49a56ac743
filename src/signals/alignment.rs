// =============================================================================
// Alignment & Normalization Stage
// =============================================================================
//
// Turns N heterogeneous strategy series into one table:
//
//   timestamp axis = sorted union of every strategy's timestamps
//   cell[t][s]     = Some(signal) if strategy s emitted a row at t, else None
//
// A strategy with a warm-up window (or gaps) is simply absent on those rows;
// absence never becomes a Hold.
//
// Weights are resolved once per run and validated (finite, >= 0). They are
// NOT rescaled to sum to 1; scoring policies normalise at scoring time so
// callers can still reason about absolute contribution magnitudes.
//
// Weight precedence:
//   run-level override  >  input override  >  first record's weight  >  1.0
// =============================================================================

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::signals::diagnostics::RunDiagnostics;
use crate::signals::record::StrategyInput;
use crate::types::{Signal, Timestamp};

/// A strategy's finalised weight for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeight {
    pub strategy_id: String,
    pub weight: f64,
}

/// Timestamp-indexed table of defined/absent signals plus the weight vector.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    timestamps: Vec<Timestamp>,
    weights: Vec<StrategyWeight>,
    /// Row-major: `cells[row][strategy]`.
    cells: Vec<Vec<Option<Signal>>>,
}

impl AlignedTable {
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Strategies in registration order with their resolved weights.
    pub fn weights(&self) -> &[StrategyWeight] {
        &self.weights
    }

    pub fn strategy_ids(&self) -> impl Iterator<Item = &str> {
        self.weights.iter().map(|w| w.strategy_id.as_str())
    }

    pub fn strategy_count(&self) -> usize {
        self.weights.len()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn row(&self, index: usize) -> &[Option<Signal>] {
        &self.cells[index]
    }

    /// Iterate `(timestamp, row)` pairs in ascending time order.
    pub fn rows(&self) -> impl Iterator<Item = (Timestamp, &[Option<Signal>])> {
        self.timestamps
            .iter()
            .copied()
            .zip(self.cells.iter().map(Vec::as_slice))
    }

    /// Strategies with a defined signal on the given row, in registration order.
    pub fn contributors(&self, row: &[Option<Signal>]) -> Vec<String> {
        row.iter()
            .zip(&self.weights)
            .filter(|(cell, _)| cell.is_some())
            .map(|(_, w)| w.strategy_id.clone())
            .collect()
    }
}

fn check_weight(strategy_id: &str, weight: f64) -> std::result::Result<(), ConfigurationError> {
    if !weight.is_finite() {
        return Err(ConfigurationError::NonFiniteWeight {
            strategy_id: strategy_id.to_string(),
            weight,
        });
    }
    if weight < 0.0 {
        return Err(ConfigurationError::NegativeWeight {
            strategy_id: strategy_id.to_string(),
            weight,
        });
    }
    Ok(())
}

/// Build the aligned table for one run.
///
/// `require_weight_pool` enables the zero-total-weight check; it is only
/// meaningful for policies that read weights.
///
/// # Errors
/// - `ConfigurationError` — empty input, duplicate ids, bad weights, zero
///   or overflowing weight pool.
/// - `DataIntegrityError` — any malformed series (checked before anything
///   is built).
pub fn align(
    inputs: &[StrategyInput],
    overrides: &HashMap<String, f64>,
    require_weight_pool: bool,
    diagnostics: &RunDiagnostics,
) -> Result<AlignedTable> {
    if inputs.is_empty() {
        return Err(ConfigurationError::NoStrategies.into());
    }

    // --- Registration checks --------------------------------------------------
    let mut seen = HashSet::with_capacity(inputs.len());
    for input in inputs {
        if !seen.insert(input.strategy_id.as_str()) {
            return Err(ConfigurationError::DuplicateStrategy(input.strategy_id.clone()).into());
        }
    }

    let mut override_ids: Vec<&String> = overrides.keys().collect();
    override_ids.sort();
    for id in override_ids {
        check_weight(id, overrides[id])?;
        if !seen.contains(id.as_str()) {
            diagnostics.warn(
                Some(id.as_str()),
                "weight override for a strategy not in this run; ignored",
            );
        }
    }

    // --- Weights ----------------------------------------------------------------
    let mut weights = Vec::with_capacity(inputs.len());
    for input in inputs {
        let weight = overrides
            .get(&input.strategy_id)
            .copied()
            .or(input.weight)
            .or_else(|| input.embedded_weight())
            .unwrap_or(1.0);
        check_weight(&input.strategy_id, weight)?;

        if input.records.iter().any(|r| r.weight != input.records[0].weight) {
            diagnostics.warn(
                Some(input.strategy_id.as_str()),
                "records carry differing weights; the first record's weight applies",
            );
        }

        weights.push(StrategyWeight {
            strategy_id: input.strategy_id.clone(),
            weight,
        });
    }

    if require_weight_pool {
        // Every per-row pool is a subset of this total, so a finite total
        // keeps every row score finite.
        let total: f64 = weights.iter().map(|w| w.weight).sum();
        if total == 0.0 {
            return Err(ConfigurationError::ZeroWeightSum.into());
        }
        if !total.is_finite() {
            return Err(ConfigurationError::NonFiniteWeightSum.into());
        }
    }

    // --- Series validation ------------------------------------------------------
    let mut series = Vec::with_capacity(inputs.len());
    for input in inputs {
        let rows = input.validated()?;
        if rows.is_empty() {
            diagnostics.warn(
                Some(input.strategy_id.as_str()),
                "strategy produced no rows; treated as absent throughout",
            );
        }
        series.push(rows);
    }

    // --- Timestamp axis ---------------------------------------------------------
    let axis: BTreeSet<Timestamp> = series
        .iter()
        .flat_map(|rows| rows.iter().map(|(ts, _)| *ts))
        .collect();
    let timestamps: Vec<Timestamp> = axis.into_iter().collect();

    let mut cells = vec![vec![None; inputs.len()]; timestamps.len()];
    for (col, rows) in series.iter().enumerate() {
        // Both sides are strictly increasing, so one forward cursor suffices.
        let mut cursor = 0;
        for &(ts, signal) in rows {
            while timestamps[cursor] < ts {
                cursor += 1;
            }
            cells[cursor][col] = Some(signal);
        }
    }

    diagnostics.debug(
        None,
        format!(
            "aligned {} strategies onto {} timestamps",
            inputs.len(),
            timestamps.len()
        ),
    );

    Ok(AlignedTable {
        timestamps,
        weights,
        cells,
    })
}
