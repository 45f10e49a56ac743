// =============================================================================
// Bollinger Bands Mean Reversion
// =============================================================================
//
// BUY when the price drops below the lower band, SELL when it rises above
// the upper band, HOLD inside the bands. The bands and the comparison use the
// configured price source (close by default). The raw value is the distance
// of the price from the middle band.
// =============================================================================

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::indicators::{calculate_bollinger, BollingerBands};
use crate::market_data::{Candle, PriceSource};
use crate::signals::SignalRecord;
use crate::strategies::{build_records, parse_params, Strategy, StrategyContext};
use crate::types::{Signal, SignalType};

fn default_period() -> usize {
    20
}

fn default_std_dev() -> f64 {
    2.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BollingerParams {
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default = "default_std_dev")]
    pub std_dev: f64,
    #[serde(default)]
    pub price_source: PriceSource,
}

pub struct BollingerBandsStrategy {
    id: String,
    weight: f64,
    params: BollingerParams,
}

impl BollingerBandsStrategy {
    pub const KIND: &'static str = "bollinger";

    pub fn build(ctx: StrategyContext) -> Result<Box<dyn Strategy>, ConfigurationError> {
        let params: BollingerParams = parse_params(&ctx)?;
        if params.period < 2 {
            return Err(ctx.invalid("period must be >= 2"));
        }
        if !params.std_dev.is_finite() || params.std_dev <= 0.0 {
            return Err(ctx.invalid(format!("std_dev must be > 0, got {}", params.std_dev)));
        }
        Ok(Box::new(Self {
            id: ctx.id,
            weight: ctx.weight,
            params,
        }))
    }
}

fn classify(price: f64, bands: &BollingerBands) -> Signal {
    if price < bands.lower {
        Signal::Buy
    } else if price > bands.upper {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

impl Strategy for BollingerBandsStrategy {
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
            "Bollinger Bands({}, {}, {:?}): BUY below the lower band, SELL above the upper band",
            self.params.period, self.params.std_dev, self.params.price_source
        )
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn produce(&self, candles: &[Candle]) -> Vec<SignalRecord> {
        let prices = self.params.price_source.series(candles);
        let bands = calculate_bollinger(&prices, self.params.period, self.params.std_dev);
        let readings = prices.iter().zip(bands).map(|(&price, b)| {
            let b = b?;
            Some((price - b.middle, classify(price, &b)))
        });
        build_records(&self.id, self.weight, candles, readings)
    }
}
