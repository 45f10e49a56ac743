// =============================================================================
// Volume Profile
// =============================================================================
//
// Splits the price range of a bar window into `bins` equal buckets and
// spreads each bar's volume over the buckets its high-low span overlaps,
// in proportion to the overlap. The profile is normalised to sum to 1.
// High-volume nodes (HVNs) are the buckets at or above a percentile of the
// normalised volumes.
// =============================================================================

use crate::market_data::Candle;

/// Price ranges narrower than this have no profile.
pub const MIN_PRICE_RANGE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeProfile {
    /// `bins + 1` ascending bucket edges.
    pub edges: Vec<f64>,
    /// Share of the window's volume per bucket.
    pub volumes: Vec<f64>,
}

impl VolumeProfile {
    /// Build the profile of `window`; `None` when the window is empty, its
    /// price range is degenerate, or `bins == 0`.
    pub fn from_window(window: &[Candle], bins: usize) -> Option<Self> {
        if bins == 0 || window.is_empty() {
            return None;
        }
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let range = high - low;
        if !range.is_finite() || range < MIN_PRICE_RANGE {
            return None;
        }

        let step = range / bins as f64;
        let mut edges: Vec<f64> = (0..bins).map(|i| low + step * i as f64).collect();
        edges.push(high);

        let mut volumes = vec![0.0; bins];
        for candle in window {
            let first = bucket_of(&edges, candle.low);
            let last = bucket_of(&edges, candle.high);
            if first == last {
                volumes[first] += candle.volume;
                continue;
            }
            let span = candle.high - candle.low;
            for (bucket, volume) in volumes.iter_mut().enumerate().take(last + 1).skip(first) {
                let overlap = edges[bucket + 1].min(candle.high) - edges[bucket].max(candle.low);
                *volume += candle.volume * overlap / span;
            }
        }

        let total: f64 = volumes.iter().sum();
        if total > 0.0 {
            volumes.iter_mut().for_each(|v| *v /= total);
        }
        Some(Self { edges, volumes })
    }

    /// Mid-prices of the buckets whose volume share reaches the `quantile`
    /// (0..=1) of all bucket shares.
    pub fn high_volume_nodes(&self, quantile: f64) -> Vec<f64> {
        let threshold = percentile(&self.volumes, quantile);
        self.volumes
            .iter()
            .enumerate()
            .filter(|(_, v)| **v >= threshold)
            .map(|(i, _)| (self.edges[i] + self.edges[i + 1]) / 2.0)
            .collect()
    }
}

/// Bucket index for `price`, clamped into range. A price on an inner edge
/// belongs to the bucket above it.
fn bucket_of(edges: &[f64], price: f64) -> usize {
    let buckets = edges.len() - 1;
    edges
        .partition_point(|&e| e <= price)
        .saturating_sub(1)
        .min(buckets - 1)
}

/// Linearly interpolated percentile, `quantile` in 0..=1.
pub fn percentile(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = quantile.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let below = rank.floor() as usize;
    let above = rank.ceil() as usize;
    sorted[below] + (sorted[above] - sorted[below]) * (rank - below as f64)
}
