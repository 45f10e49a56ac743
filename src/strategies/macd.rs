// =============================================================================
// MACD Trend Following
// =============================================================================
//
// BUY while the MACD line is above its signal line, SELL otherwise.
// The raw value is the histogram (macd - signal).
// =============================================================================

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::indicators::calculate_macd;
use crate::market_data::{closes, Candle};
use crate::signals::SignalRecord;
use crate::strategies::{build_records, parse_params, Strategy, StrategyContext};
use crate::types::{Signal, SignalType};

fn default_fast_period() -> usize {
    12
}

fn default_slow_period() -> usize {
    26
}

fn default_signal_period() -> usize {
    9
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacdParams {
    #[serde(default = "default_fast_period")]
    pub fast_period: usize,
    #[serde(default = "default_slow_period")]
    pub slow_period: usize,
    #[serde(default = "default_signal_period")]
    pub signal_period: usize,
}

pub struct MacdStrategy {
    id: String,
    weight: f64,
    params: MacdParams,
}

impl MacdStrategy {
    pub const KIND: &'static str = "macd";

    pub fn build(ctx: StrategyContext) -> Result<Box<dyn Strategy>, ConfigurationError> {
        let params: MacdParams = parse_params(&ctx)?;
        if params.fast_period == 0 || params.fast_period >= params.slow_period {
            return Err(ctx.invalid(format!(
                "need 0 < fast_period < slow_period, got {} / {}",
                params.fast_period, params.slow_period
            )));
        }
        if params.signal_period == 0 {
            return Err(ctx.invalid("signal_period must be > 0"));
        }
        Ok(Box::new(Self {
            id: ctx.id,
            weight: ctx.weight,
            params,
        }))
    }
}

impl Strategy for MacdStrategy {
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
            "MACD({}, {}, {}): BUY while the MACD line is above the signal line, SELL while below",
            self.params.fast_period, self.params.slow_period, self.params.signal_period
        )
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn produce(&self, candles: &[Candle]) -> Vec<SignalRecord> {
        let p = &self.params;
        let macd = calculate_macd(&closes(candles), p.fast_period, p.slow_period, p.signal_period);
        let readings = macd.into_iter().map(|point| {
            point.map(|m| {
                let signal = if m.macd > m.signal {
                    Signal::Buy
                } else {
                    Signal::Sell
                };
                (m.histogram, signal)
            })
        });
        build_records(&self.id, self.weight, candles, readings)
    }
}
