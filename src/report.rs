// =============================================================================
// Run Envelope — Auditable record of one aggregation run
// =============================================================================
//
// Wraps the aggregated series with the identity of the run, a per-strategy
// summary and the decision counts, ready to be written out as JSON.
//
// `id` and `created_at` live only here; the series itself stays a pure
// function of its inputs.
// =============================================================================

use serde::Serialize;

use crate::signals::{AggregatedSignal, AggregatedSeries, RunDiagnostics, RunMetadata};
use crate::strategies::Strategy;
use crate::types::SignalType;

/// What one strategy contributed to the run.
#[derive(Debug, Clone, Serialize)]
pub struct StrategySummary {
    pub id: String,
    pub kind: String,
    pub signal_type: SignalType,
    pub description: String,
    pub weight: f64,
    /// Records the strategy produced (bars after its warm-up).
    pub rows: usize,
}

impl StrategySummary {
    pub fn from_strategy(strategy: &dyn Strategy, rows: usize) -> Self {
        Self {
            id: strategy.id().to_string(),
            kind: strategy.kind().to_string(),
            signal_type: strategy.signal_type(),
            description: strategy.describe(),
            weight: strategy.weight(),
            rows,
        }
    }
}

/// Complete record of an aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunEnvelope {
    /// Run id, shared with the `aggregation_run` tracing span.
    pub id: String,

    /// ISO 8601 timestamp of when the envelope was created.
    pub created_at: String,

    pub metadata: RunMetadata,

    pub buy_count: usize,
    pub hold_count: usize,
    pub sell_count: usize,

    pub strategies: Vec<StrategySummary>,

    /// Warnings raised while the run executed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    pub series: Vec<AggregatedSignal>,
}

impl RunEnvelope {
    pub fn new(
        series: AggregatedSeries,
        strategies: Vec<StrategySummary>,
        diagnostics: &RunDiagnostics,
    ) -> Self {
        let (buy_count, hold_count, sell_count) = series.signal_counts();
        let metadata = series.metadata().clone();
        Self {
            id: diagnostics.run_id().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            metadata,
            buy_count,
            hold_count,
            sell_count,
            strategies,
            warnings: diagnostics
                .warnings()
                .into_iter()
                .map(|d| match d.strategy_id {
                    Some(id) => format!("[{id}] {}", d.message),
                    None => d.message,
                })
                .collect(),
            series: series.into_rows(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
