// =============================================================================
// Moving Average Crossover
// =============================================================================
//
// BUY while the fast SMA sits above the slow SMA by more than
// `signal_threshold`, SELL otherwise. The raw value is the spread
// `fast - slow`. Undefined until the slow SMA has a full window.
// =============================================================================

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::indicators::calculate_sma;
use crate::market_data::{closes, Candle};
use crate::signals::SignalRecord;
use crate::strategies::{build_records, parse_params, Strategy, StrategyContext};
use crate::types::{Signal, SignalType};

fn default_fast_period() -> usize {
    20
}

fn default_slow_period() -> usize {
    50
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrossoverParams {
    #[serde(default = "default_fast_period")]
    pub fast_period: usize,
    #[serde(default = "default_slow_period")]
    pub slow_period: usize,
    #[serde(default)]
    pub signal_threshold: f64,
}

pub struct MovingAverageCrossover {
    id: String,
    weight: f64,
    params: CrossoverParams,
}

impl MovingAverageCrossover {
    pub const KIND: &'static str = "ma_crossover";

    pub fn build(ctx: StrategyContext) -> Result<Box<dyn Strategy>, ConfigurationError> {
        let params: CrossoverParams = parse_params(&ctx)?;
        if params.fast_period == 0 || params.fast_period >= params.slow_period {
            return Err(ctx.invalid(format!(
                "need 0 < fast_period < slow_period, got {} / {}",
                params.fast_period, params.slow_period
            )));
        }
        if !params.signal_threshold.is_finite() {
            return Err(ctx.invalid("signal_threshold must be finite"));
        }
        Ok(Box::new(Self {
            id: ctx.id,
            weight: ctx.weight,
            params,
        }))
    }
}

impl Strategy for MovingAverageCrossover {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn signal_type(&self) -> SignalType {
        SignalType::TrendFollowing
    }

    fn describe(&self) -> String {
        format!(
            "Moving average crossover: BUY while the {}-period SMA is above the {}-period SMA, SELL while below",
            self.params.fast_period, self.params.slow_period
        )
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn produce(&self, candles: &[Candle]) -> Vec<SignalRecord> {
        let closes = closes(candles);
        let fast = calculate_sma(&closes, self.params.fast_period);
        let slow = calculate_sma(&closes, self.params.slow_period);
        let threshold = self.params.signal_threshold;

        let readings = fast.into_iter().zip(slow).map(|(f, s)| {
            let spread = f? - s?;
            let signal = if spread > threshold {
                Signal::Buy
            } else {
                Signal::Sell
            };
            Some((spread, signal))
        });

        build_records(&self.id, self.weight, candles, readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::candles;
    use serde_json::json;

    fn strategy(fast: usize, slow: usize) -> Box<dyn Strategy> {
        MovingAverageCrossover::build(
            StrategyContext::new("ma")
                .with_parameters(json!({ "fast_period": fast, "slow_period": slow })),
        )
        .unwrap()
    }

    #[test]
    fn warm_up_bars_are_absent() {
        let bars = candles(&(1..=30).map(|x| x as f64).collect::<Vec<_>>());
        let records = strategy(5, 26).produce(&bars);
        assert_eq!(records.len(), 30 - 25);
        assert_eq!(records[0].timestamp, bars[25].open_time);
    }

    #[test]
    fn rising_prices_buy_falling_prices_sell() {
        let up = candles(&(1..=40).map(|x| x as f64).collect::<Vec<_>>());
        assert!(strategy(3, 10)
            .produce(&up)
            .iter()
            .all(|r| r.binary_signal == 1));

        let down = candles(&(1..=40).rev().map(|x| x as f64).collect::<Vec<_>>());
        assert!(strategy(3, 10)
            .produce(&down)
            .iter()
            .all(|r| r.binary_signal == -1));
    }

    #[test]
    fn raw_value_is_the_spread() {
        let bars = candles(&[1.0, 2.0, 3.0, 4.0]);
        let records = strategy(2, 4).produce(&bars);
        assert_eq!(records.len(), 1);
        // fast = 3.5, slow = 2.5
        assert!((records[0].raw_value.unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn defaults_apply() {
        let s = MovingAverageCrossover::build(StrategyContext::new("ma")).unwrap();
        assert!(s.describe().contains("20-period"));
        assert!(s.describe().contains("50-period"));
        assert_eq!(s.signal_type(), SignalType::TrendFollowing);
    }
}
