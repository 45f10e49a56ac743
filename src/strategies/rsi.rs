// =============================================================================
// RSI Mean Reversion
// =============================================================================
//
// BUY when RSI < oversold, SELL when RSI > overbought, HOLD in between.
// The raw value is the RSI reading itself.
// =============================================================================

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::indicators::calculate_rsi;
use crate::market_data::{closes, Candle};
use crate::signals::SignalRecord;
use crate::strategies::{build_records, parse_params, Strategy, StrategyContext};
use crate::types::{Signal, SignalType};

fn default_period() -> usize {
    14
}

fn default_overbought() -> f64 {
    70.0
}

fn default_oversold() -> f64 {
    30.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RsiParams {
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default = "default_overbought")]
    pub overbought: f64,
    #[serde(default = "default_oversold")]
    pub oversold: f64,
}

pub struct RsiStrategy {
    id: String,
    weight: f64,
    params: RsiParams,
}

impl RsiStrategy {
    pub const KIND: &'static str = "rsi";

    pub fn build(ctx: StrategyContext) -> Result<Box<dyn Strategy>, ConfigurationError> {
        let params: RsiParams = parse_params(&ctx)?;
        if params.period == 0 {
            return Err(ctx.invalid("period must be > 0"));
        }
        if !(0.0..=100.0).contains(&params.oversold)
            || !(0.0..=100.0).contains(&params.overbought)
            || params.oversold >= params.overbought
        {
            return Err(ctx.invalid(format!(
                "need 0 <= oversold < overbought <= 100, got {} / {}",
                params.oversold, params.overbought
            )));
        }
        Ok(Box::new(Self {
            id: ctx.id,
            weight: ctx.weight,
            params,
        }))
    }

    fn classify(&self, rsi: f64) -> Signal {
        if rsi < self.params.oversold {
            Signal::Buy
        } else if rsi > self.params.overbought {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

impl Strategy for RsiStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn signal_type(&self) -> SignalType {
        SignalType::MeanReversion
    }

    fn describe(&self) -> String {
        format!(
            "RSI({}): BUY below {} (oversold), SELL above {} (overbought)",
            self.params.period, self.params.oversold, self.params.overbought
        )
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn produce(&self, candles: &[Candle]) -> Vec<SignalRecord> {
        let readings = calculate_rsi(&closes(candles), self.params.period)
            .into_iter()
            .map(|rsi| rsi.map(|v| (v, self.classify(v))));
        build_records(&self.id, self.weight, candles, readings)
    }
}
