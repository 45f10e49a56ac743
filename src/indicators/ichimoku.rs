// =============================================================================
// Ichimoku Cloud (Ichimoku Kinko Hyo)
// =============================================================================
//
//   tenkan   = (highest high + lowest low) / 2 over `tenkan` bars
//   kijun    = (highest high + lowest low) / 2 over `kijun` bars
//   senkou_a = (tenkan + kijun) / 2, shifted forward `displacement` bars
//   senkou_b = (highest high + lowest low) / 2 over `senkou_b` bars,
//              shifted forward `displacement` bars
//
// The lagging span (close shifted backwards) reads future bars and is not
// computed here.
// =============================================================================

/// Ichimoku lines for one bar. Each line has its own warm-up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IchimokuPoint {
    pub tenkan: Option<f64>,
    pub kijun: Option<f64>,
    pub senkou_a: Option<f64>,
    pub senkou_b: Option<f64>,
}

impl IchimokuPoint {
    /// `(top, bottom)` of the cloud, once both leading spans exist.
    pub fn cloud(&self) -> Option<(f64, f64)> {
        let (a, b) = (self.senkou_a?, self.senkou_b?);
        Some((a.max(b), a.min(b)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IchimokuPeriods {
    pub tenkan: usize,
    pub kijun: usize,
    pub senkou_b: usize,
    pub displacement: usize,
}

/// Ichimoku lines aligned with the bar series.
pub fn calculate_ichimoku(
    highs: &[f64],
    lows: &[f64],
    periods: IchimokuPeriods,
) -> Vec<IchimokuPoint> {
    let tenkan = rolling_midpoint(highs, lows, periods.tenkan);
    let kijun = rolling_midpoint(highs, lows, periods.kijun);
    let span_b = rolling_midpoint(highs, lows, periods.senkou_b);

    (0..tenkan.len())
        .map(|i| {
            let shifted = i.checked_sub(periods.displacement);
            IchimokuPoint {
                tenkan: tenkan[i],
                kijun: kijun[i],
                senkou_a: shifted.and_then(|j| Some((tenkan[j]? + kijun[j]?) / 2.0)),
                senkou_b: shifted.and_then(|j| span_b[j]),
            }
        })
        .collect()
}

/// `(max(high) + min(low)) / 2` over a trailing window of `period` bars.
pub fn rolling_midpoint(highs: &[f64], lows: &[f64], period: usize) -> Vec<Option<f64>> {
    let len = highs.len().min(lows.len());
    let mut out = vec![None; len];
    if period == 0 || len < period {
        return out;
    }

    for end in period..=len {
        let hi = highs[end - period..end].iter().copied().fold(f64::MIN, f64::max);
        let lo = lows[end - period..end].iter().copied().fold(f64::MAX, f64::min);
        let mid = (hi + lo) / 2.0;
        if mid.is_finite() {
            out[end - 1] = Some(mid);
        }
    }
    out
}
