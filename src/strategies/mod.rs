// =============================================================================
// Strategy Adapters
// =============================================================================
//
// A strategy turns a price history into a Signal Record series aligned to the
// bar timestamps. Strategies are capability objects, not a class hierarchy:
// anything that can describe itself and produce a series implements
// `Strategy`. Concrete adapters are constructed by name through the explicit
// `StrategyRegistry`.
//
// Bars inside an indicator's warm-up window produce no record at all, so the
// aggregator sees the strategy as absent there rather than neutral.
// =============================================================================

pub mod bollinger;
pub mod fibonacci;
pub mod ichimoku;
pub mod ma_crossover;
pub mod macd;
pub mod registry;
pub mod rsi;
pub mod volume_profile;

use serde::de::DeserializeOwned;

use crate::error::ConfigurationError;
use crate::market_data::Candle;
use crate::signals::{SignalRecord, StrategyInput};
use crate::types::{Signal, SignalType};

pub use bollinger::BollingerBandsStrategy;
pub use fibonacci::FibonacciRetracementStrategy;
pub use ichimoku::IchimokuCloudStrategy;
pub use ma_crossover::MovingAverageCrossover;
pub use macd::MacdStrategy;
pub use registry::{StrategyContext, StrategyRegistry};
pub use rsi::RsiStrategy;
pub use volume_profile::VolumeProfileStrategy;

/// Capability contract for every signal producer.
pub trait Strategy: Send + Sync {
    /// Identifier unique within one aggregation run.
    fn id(&self) -> &str;

    /// Registry key this strategy was built from.
    fn kind(&self) -> &'static str;

    fn signal_type(&self) -> SignalType;

    /// Human-readable description including the active parameters.
    fn describe(&self) -> String;

    fn weight(&self) -> f64;

    /// One record per bar that has a defined indicator reading.
    fn produce(&self, candles: &[Candle]) -> Vec<SignalRecord>;

    /// Package the produced series for the aggregator.
    fn run(&self, candles: &[Candle]) -> StrategyInput {
        StrategyInput::new(self.id(), self.produce(candles))
    }
}

/// Zip bars with per-bar `(raw_value, signal)` readings, skipping the warm-up.
pub(crate) fn build_records<I>(
    id: &str,
    weight: f64,
    candles: &[Candle],
    readings: I,
) -> Vec<SignalRecord>
where
    I: IntoIterator<Item = Option<(f64, Signal)>>,
{
    candles
        .iter()
        .zip(readings)
        .filter_map(|(candle, reading)| {
            let (raw, signal) = reading?;
            Some(
                SignalRecord::new(id, candle.open_time, signal)
                    .with_raw_value(raw)
                    .with_weight(weight),
            )
        })
        .collect()
}

/// Deserialize a strategy's typed parameters; `null` means all defaults.
pub(crate) fn parse_params<P: DeserializeOwned>(
    ctx: &StrategyContext,
) -> Result<P, ConfigurationError> {
    let raw = if ctx.parameters.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        ctx.parameters.clone()
    };
    serde_json::from_value(raw).map_err(|e| ctx.invalid(e.to_string()))
}
