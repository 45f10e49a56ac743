// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
//   SMA_t = (close_{t-period+1} + ... + close_t) / period
//
// Output is aligned with the input: the first `period - 1` entries are `None`.

/// Rolling mean over `period` values.
///
/// # Edge cases
/// - `period == 0` => every entry `None`
/// - A window containing a non-finite value yields `None` for that entry.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let period_f = period as f64;
    for (i, window) in values.windows(period).enumerate() {
        let mean = window.iter().sum::<f64>() / period_f;
        if mean.is_finite() {
            out[i + period - 1] = Some(mean);
        }
    }
    out
}
