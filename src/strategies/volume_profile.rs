// =============================================================================
// Volume Profile Support/Resistance
// =============================================================================
//
// Builds the volume profile of the `lookback_period` bars before each bar and
// takes its high-volume nodes (HVNs). When the close is within 0.5% of an
// HVN: BUY if price is rising into it from below, SELL if price is falling
// into it from above. Direction compares the close with the close
// `signal_lookback` bars earlier. HOLD otherwise; when several HVNs trigger
// the highest-priced one decides. The raw value is the close minus the
// nearest HVN.
// =============================================================================

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::indicators::VolumeProfile;
use crate::market_data::Candle;
use crate::signals::SignalRecord;
use crate::strategies::{build_records, parse_params, Strategy, StrategyContext};
use crate::types::{Signal, SignalType};

/// Relative distance from an HVN that counts as "at" the node.
const HVN_PROXIMITY: f64 = 0.005;

fn default_num_bins() -> usize {
    20
}

fn default_lookback_period() -> usize {
    100
}

fn default_volume_threshold() -> f64 {
    0.8
}

fn default_signal_lookback() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeProfileParams {
    #[serde(default = "default_num_bins")]
    pub num_bins: usize,
    #[serde(default = "default_lookback_period")]
    pub lookback_period: usize,
    /// Percentile (0..=1) of bucket volume that makes a bucket an HVN.
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: f64,
    #[serde(default = "default_signal_lookback")]
    pub signal_lookback: usize,
}

pub struct VolumeProfileStrategy {
    id: String,
    weight: f64,
    params: VolumeProfileParams,
}

impl VolumeProfileStrategy {
    pub const KIND: &'static str = "volume_profile";

    pub fn build(ctx: StrategyContext) -> Result<Box<dyn Strategy>, ConfigurationError> {
        let params: VolumeProfileParams = parse_params(&ctx)?;
        if params.num_bins == 0 || params.lookback_period == 0 {
            return Err(ctx.invalid("num_bins and lookback_period must be > 0"));
        }
        if params.signal_lookback == 0 || params.signal_lookback > params.lookback_period {
            return Err(ctx.invalid(format!(
                "need 0 < signal_lookback <= lookback_period, got {} / {}",
                params.signal_lookback, params.lookback_period
            )));
        }
        if !(0.0..=1.0).contains(&params.volume_threshold) {
            return Err(ctx.invalid(format!(
                "volume_threshold must be within 0..=1, got {}",
                params.volume_threshold
            )));
        }
        Ok(Box::new(Self {
            id: ctx.id,
            weight: ctx.weight,
            params,
        }))
    }

    fn reading(&self, candles: &[Candle], i: usize) -> Option<(f64, Signal)> {
        let window = &candles[i.checked_sub(self.params.lookback_period)?..i];
        let profile = VolumeProfile::from_window(window, self.params.num_bins)?;
        let nodes = profile.high_volume_nodes(self.params.volume_threshold);

        let close = candles[i].close;
        let rising = close > candles[i - self.params.signal_lookback].close;

        let mut signal = Signal::Hold;
        for &node in &nodes {
            let near = (close - node).abs() / close < HVN_PROXIMITY;
            if !near {
                continue;
            }
            if rising && close < node {
                signal = Signal::Buy;
            } else if !rising && close > node {
                signal = Signal::Sell;
            }
        }

        let nearest = nodes
            .iter()
            .copied()
            .min_by(|a, b| (close - a).abs().total_cmp(&(close - b).abs()))?;
        Some((close - nearest, signal))
    }
}

impl Strategy for VolumeProfileStrategy {
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
            "Volume Profile ({} bins over {} bars, HVN above the {} quantile)",
            self.params.num_bins, self.params.lookback_period, self.params.volume_threshold
        )
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn produce(&self, candles: &[Candle]) -> Vec<SignalRecord> {
        let readings = (0..candles.len()).map(|i| self.reading(candles, i));
        build_records(&self.id, self.weight, candles, readings)
    }
}
