// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The first EMA value is seeded with the SMA of the first `period` values,
// so the output is `None` for the first `period - 1` entries.
// =============================================================================

/// Compute the EMA series for `values`, aligned index-for-index with the input.
///
/// # Edge cases
/// - `period == 0` or `values.len() < period` => every entry `None`
/// - A non-finite intermediate value ends the series; the remainder is `None`.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let multiplier = 2.0 / (period + 1) as f64;

    let seed = values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return out;
    }
    out[period - 1] = Some(seed);

    let mut prev = seed;
    for (i, &value) in values.iter().enumerate().skip(period) {
        let ema = value * multiplier + prev * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        out[i] = Some(ema);
        prev = ema;
    }

    out
}

/// EMA over a series that is itself still warming up.
///
/// Leading `None`s are skipped; the EMA is seeded over the first `period`
/// defined values. A `None` after the first defined value ends the series.
pub fn calculate_ema_of(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    let Some(start) = values.iter().position(Option::is_some) else {
        return out;
    };

    let defined: Vec<f64> = values[start..].iter().map_while(|v| *v).collect();
    for (offset, ema) in calculate_ema(&defined, period).into_iter().enumerate() {
        out[start + offset] = ema;
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_empty());
    }

    #[test]
    fn ema_period_zero() {
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn ema_insufficient_data() {
        assert!(calculate_ema(&[1.0, 2.0], 5).iter().all(Option::is_none));
    }

    #[test]
    fn ema_period_equals_length() {
        let ema = calculate_ema(&[2.0, 4.0, 6.0], 3);
        assert_eq!(ema.len(), 3);
        // Seed = SMA = (2+4+6)/3 = 4.0
        assert!((ema[2].unwrap() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn ema_known_values() {
        // 5-period EMA of [1..=10]: SMA seed 3.0, multiplier 1/3.
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let ema = calculate_ema(&closes, 5);
        assert!(ema[..4].iter().all(Option::is_none));

        let mult = 2.0 / 6.0;
        let mut expected = 3.0;
        assert!((ema[4].unwrap() - expected).abs() < 1e-10);
        for i in 5..10 {
            expected = closes[i] * mult + expected * (1.0 - mult);
            assert!((ema[i].unwrap() - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn ema_stops_on_nan() {
        let ema = calculate_ema(&[1.0, 2.0, 3.0, f64::NAN, 5.0], 3);
        assert!(ema[2].is_some());
        assert!(ema[3].is_none());
        assert!(ema[4].is_none());
    }

    #[test]
    fn ema_of_skips_leading_none() {
        let values = [None, None, Some(2.0), Some(4.0), Some(6.0), Some(8.0)];
        let ema = calculate_ema_of(&values, 3);
        assert!(ema[..4].iter().all(Option::is_none));
        assert!((ema[4].unwrap() - 4.0).abs() < 1e-10);
        // 8 * 0.5 + 4 * 0.5
        assert!((ema[5].unwrap() - 6.0).abs() < 1e-10);
    }
}
