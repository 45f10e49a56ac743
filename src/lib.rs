// =============================================================================
// Confluence — multi-strategy signal aggregation
// =============================================================================
//
// Strategies turn an OHLCV history into per-bar BUY / HOLD / SELL series;
// the aggregator aligns those series on a common timestamp axis and combines
// them with a weighted-average, majority-vote or consensus policy.
// =============================================================================

pub mod error;
pub mod indicators;
pub mod market_data;
pub mod report;
pub mod runtime_config;
pub mod signals;
pub mod strategies;
pub mod types;

pub use error::{AggregationError, ConfigurationError, DataIntegrityError, Result};
pub use signals::{
    AggregatedSeries, AggregatedSignal, AggregationConfig, RunDiagnostics, SignalAggregator,
    SignalRecord, StrategyInput,
};
pub use types::{AggregationMethod, Signal, SignalType, Timestamp};
