// =============================================================================
// Ichimoku Cloud Trend Following
// =============================================================================
//
// BUY when the close is above the cloud or the conversion line (tenkan)
// crosses above the base line (kijun). SELL when the close is below the cloud
// or tenkan crosses below kijun; a SELL condition overrides a BUY condition
// on the same bar. HOLD otherwise. The raw value is the distance of the close
// from the middle of the cloud.
// =============================================================================

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::indicators::{calculate_ichimoku, IchimokuPeriods, IchimokuPoint};
use crate::market_data::{Candle, PriceSource};
use crate::signals::SignalRecord;
use crate::strategies::{build_records, parse_params, Strategy, StrategyContext};
use crate::types::{Signal, SignalType};

fn default_tenkan_period() -> usize {
    9
}

fn default_kijun_period() -> usize {
    26
}

fn default_senkou_b_period() -> usize {
    52
}

fn default_displacement() -> usize {
    26
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IchimokuParams {
    #[serde(default = "default_tenkan_period")]
    pub tenkan_period: usize,
    #[serde(default = "default_kijun_period")]
    pub kijun_period: usize,
    #[serde(default = "default_senkou_b_period")]
    pub senkou_b_period: usize,
    #[serde(default = "default_displacement")]
    pub displacement: usize,
}

impl IchimokuParams {
    fn periods(&self) -> IchimokuPeriods {
        IchimokuPeriods {
            tenkan: self.tenkan_period,
            kijun: self.kijun_period,
            senkou_b: self.senkou_b_period,
            displacement: self.displacement,
        }
    }
}

pub struct IchimokuCloudStrategy {
    id: String,
    weight: f64,
    params: IchimokuParams,
}

impl IchimokuCloudStrategy {
    pub const KIND: &'static str = "ichimoku_cloud";

    pub fn build(ctx: StrategyContext) -> Result<Box<dyn Strategy>, ConfigurationError> {
        let params: IchimokuParams = parse_params(&ctx)?;
        if params.tenkan_period == 0 || params.kijun_period == 0 || params.senkou_b_period == 0 {
            return Err(ctx.invalid("tenkan, kijun and senkou_b periods must be > 0"));
        }
        Ok(Box::new(Self {
            id: ctx.id,
            weight: ctx.weight,
            params,
        }))
    }
}

/// `(raw, signal)` for a bar given its own and the previous bar's lines.
fn classify(close: f64, now: &IchimokuPoint, prev: &IchimokuPoint) -> Option<(f64, Signal)> {
    let (top, bottom) = now.cloud()?;
    let spread = now.tenkan? - now.kijun?;
    let prev_spread = prev.tenkan? - prev.kijun?;

    let bullish_cross = spread > 0.0 && prev_spread <= 0.0;
    let bearish_cross = spread < 0.0 && prev_spread >= 0.0;

    let signal = if close < bottom || bearish_cross {
        Signal::Sell
    } else if close > top || bullish_cross {
        Signal::Buy
    } else {
        Signal::Hold
    };
    Some((close - (top + bottom) / 2.0, signal))
}

impl Strategy for IchimokuCloudStrategy {
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
            "Ichimoku Cloud (Tenkan: {}, Kijun: {}, Senkou B: {}, displacement {})",
            self.params.tenkan_period,
            self.params.kijun_period,
            self.params.senkou_b_period,
            self.params.displacement
        )
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn produce(&self, candles: &[Candle]) -> Vec<SignalRecord> {
        let highs = PriceSource::High.series(candles);
        let lows = PriceSource::Low.series(candles);
        let points = calculate_ichimoku(&highs, &lows, self.params.periods());

        let readings = candles.iter().enumerate().map(|(i, candle)| {
            let prev = points.get(i.checked_sub(1)?)?;
            classify(candle.close, &points[i], prev)
        });
        build_records(&self.id, self.weight, candles, readings)
    }
}
