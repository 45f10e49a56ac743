// =============================================================================
// Fibonacci Retracement
// =============================================================================
//
// The trend is the slope of an SMA of closes over `swing_lookback` bars.
// In an uptrend the swing runs from the lowest low of the lookback window to
// the highest high since; in a downtrend from the highest high to the lowest
// low since. BUY (uptrend) or SELL (downtrend) when the close sits within
// `level_tolerance` (relative) of a retracement level of that swing, HOLD
// otherwise. The raw value is the close minus the nearest level.
// =============================================================================

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::indicators::fibonacci::DEFAULT_RATIOS;
use crate::indicators::{calculate_sma, first_max, first_min, retracement_levels};
use crate::market_data::{closes, Candle, PriceSource};
use crate::signals::SignalRecord;
use crate::strategies::{build_records, parse_params, Strategy, StrategyContext};
use crate::types::{Signal, SignalType};

fn default_trend_period() -> usize {
    50
}

fn default_swing_lookback() -> usize {
    20
}

fn default_retracement_levels() -> Vec<f64> {
    DEFAULT_RATIOS.to_vec()
}

fn default_level_tolerance() -> f64 {
    0.01
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FibonacciParams {
    #[serde(default = "default_trend_period")]
    pub trend_period: usize,
    #[serde(default = "default_swing_lookback")]
    pub swing_lookback: usize,
    #[serde(default = "default_retracement_levels")]
    pub retracement_levels: Vec<f64>,
    #[serde(default = "default_level_tolerance")]
    pub level_tolerance: f64,
}

pub struct FibonacciRetracementStrategy {
    id: String,
    weight: f64,
    params: FibonacciParams,
}

impl FibonacciRetracementStrategy {
    pub const KIND: &'static str = "fibonacci_retracement";

    pub fn build(ctx: StrategyContext) -> Result<Box<dyn Strategy>, ConfigurationError> {
        let params: FibonacciParams = parse_params(&ctx)?;
        if params.trend_period == 0 || params.swing_lookback == 0 {
            return Err(ctx.invalid("trend_period and swing_lookback must be > 0"));
        }
        if params.retracement_levels.is_empty()
            || params.retracement_levels.iter().any(|r| !r.is_finite())
        {
            return Err(ctx.invalid("retracement_levels must be a non-empty list of numbers"));
        }
        if !params.level_tolerance.is_finite() || params.level_tolerance < 0.0 {
            return Err(ctx.invalid(format!(
                "level_tolerance must be >= 0, got {}",
                params.level_tolerance
            )));
        }
        Ok(Box::new(Self {
            id: ctx.id,
            weight: ctx.weight,
            params,
        }))
    }

    /// Reading for bar `i`, which must have `swing_lookback` bars before it
    /// and a defined trend on both ends.
    fn reading(
        &self,
        candles: &[Candle],
        highs: &[f64],
        lows: &[f64],
        trend: &[Option<f64>],
        i: usize,
    ) -> Option<(f64, Signal)> {
        let start = i.checked_sub(self.params.swing_lookback)?;
        let uptrend = trend[i]? > trend[start]?;

        // The swing begins inside [start, i) and ends at or before bar i.
        let (levels, signal) = if uptrend {
            let (offset, swing_low) = first_min(&lows[start..i])?;
            let (_, high) = first_max(&highs[start + offset..=i])?;
            (retracement_levels(swing_low, high, &self.params.retracement_levels), Signal::Buy)
        } else {
            let (offset, swing_high) = first_max(&highs[start..i])?;
            let (_, low) = first_min(&lows[start + offset..=i])?;
            (retracement_levels(swing_high, low, &self.params.retracement_levels), Signal::Sell)
        };

        let close = candles[i].close;
        let near_level = levels
            .iter()
            .any(|&level| (close - level).abs() / level <= self.params.level_tolerance);
        let nearest = levels
            .iter()
            .copied()
            .min_by(|a, b| (close - a).abs().total_cmp(&(close - b).abs()))?;

        let signal = if near_level { signal } else { Signal::Hold };
        Some((close - nearest, signal))
    }
}

impl Strategy for FibonacciRetracementStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn signal_type(&self) -> SignalType {
        SignalType::SupportResistance
    }

    fn describe(&self) -> String {
        format!(
            "Fibonacci Retracement ({}, {}): trade pullbacks to {:?} within {}",
            self.params.trend_period,
            self.params.swing_lookback,
            self.params.retracement_levels,
            self.params.level_tolerance
        )
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn produce(&self, candles: &[Candle]) -> Vec<SignalRecord> {
        let highs = PriceSource::High.series(candles);
        let lows = PriceSource::Low.series(candles);
        let trend = calculate_sma(&closes(candles), self.params.trend_period);

        let warm_up = self.params.trend_period + self.params.swing_lookback;
        let readings = (0..candles.len()).map(|i| {
            if i < warm_up {
                return None;
            }
            self.reading(candles, &highs, &lows, &trend, i)
        });
        build_records(&self.id, self.weight, candles, readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::candles;
    use serde_json::json;

    fn strategy() -> Box<dyn Strategy> {
        FibonacciRetracementStrategy::build(
            StrategyContext::new("fib")
                .with_parameters(json!({ "trend_period": 3, "swing_lookback": 4 })),
        )
        .unwrap()
    }

    #[test]
    fn pullback_to_half_retracement_in_uptrend_buys() {
        // Swing 14 -> 20, the 0.5 level is 17.
        let bars = candles(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 20.0, 17.0]);
        let records = strategy().produce(&bars);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, bars[7].open_time);
        assert_eq!(records[0].binary_signal, 0);
        assert_eq!(records[1].binary_signal, 1);
        assert!(records[1].raw_value.unwrap().abs() < 1e-10);
    }

    #[test]
    fn bounce_to_half_retracement_in_downtrend_sells() {
        // Swing 16 -> 10, the 0.5 level is 13.
        let bars = candles(&[20.0, 19.0, 18.0, 17.0, 16.0, 15.0, 14.0, 10.0, 13.0]);
        let records = strategy().produce(&bars);
        assert_eq!(records[0].binary_signal, 0);
        assert_eq!(records[1].binary_signal, -1);
    }

    #[test]
    fn short_history_produces_nothing() {
        let bars = candles(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert!(strategy().produce(&bars).is_empty());
    }

    #[test]
    fn invalid_levels_rejected() {
        for params in [
            json!({ "retracement_levels": [] }),
            json!({ "level_tolerance": -0.1 }),
            json!({ "swing_lookback": 0 }),
        ] {
            let ctx = StrategyContext::new("fib").with_parameters(params);
            let err = FibonacciRetracementStrategy::build(ctx).err().unwrap();
            assert!(matches!(err, ConfigurationError::InvalidParameters { .. }));
        }
    }
}
