// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ). σ is the SAMPLE standard deviation of the
// window (n - 1 denominator).

/// Bands for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Rolling Bollinger Bands aligned with `closes`.
///
/// Entry `i` is `Some` once a full window of `period` closes is available.
///
/// Returns `None` for an entry when:
/// - Fewer than `period` data points precede it, or `period < 2`.
/// - Any computed band is non-finite.
///
/// A window centred on zero still has bands.
pub fn calculate_bollinger(
    closes: &[f64],
    period: usize,
    num_std: f64,
) -> Vec<Option<BollingerBands>> {
    let mut out = vec![None; closes.len()];
    if period < 2 || closes.len() < period {
        return out;
    }

    for (i, window) in closes.windows(period).enumerate() {
        out[i + period - 1] = bands_for_window(window, num_std);
    }
    out
}

fn bands_for_window(window: &[f64], num_std: f64) -> Option<BollingerBands> {
    let n = window.len() as f64;
    let middle = window.iter().sum::<f64>() / n;

    let variance = window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;

    (middle.is_finite() && upper.is_finite() && lower.is_finite()).then_some(BollingerBands {
        upper,
        middle,
        lower,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bb = calculate_bollinger(&closes, 20, 2.0)[19].unwrap();
        assert!(bb.upper > bb.middle);
        assert!(bb.lower < bb.middle);
    }

    #[test]
    fn bollinger_uses_sample_std() {
        // [1, 2, 3]: mean 2, sample variance 1 => σ = 1
        let bb = calculate_bollinger(&[1.0, 2.0, 3.0], 3, 2.0)[2].unwrap();
        assert!((bb.upper - 4.0).abs() < 1e-10);
        assert!((bb.lower - 0.0).abs() < 1e-10);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let out = calculate_bollinger(&[1.0, 2.0, 3.0], 20, 2.0);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn bollinger_flat() {
        let bb = calculate_bollinger(&[100.0; 20], 20, 2.0)[19].unwrap();
        assert_eq!(bb.upper, bb.lower);
    }

    #[test]
    fn zero_centred_window_has_bands() {
        // Spreads and returns oscillate around zero.
        let bb = calculate_bollinger(&[-1.0, 0.0, 1.0], 3, 2.0)[2].unwrap();
        assert_eq!(bb.middle, 0.0);
        assert!((bb.upper - 2.0).abs() < 1e-10);
        assert!((bb.lower + 2.0).abs() < 1e-10);

        let out = calculate_bollinger(&[0.0; 5], 3, 2.0);
        assert!(out[2..].iter().all(|b| b.is_some()));
    }

    #[test]
    fn overflowing_window_is_undefined() {
        let out = calculate_bollinger(&[f64::MAX, f64::MAX, f64::MAX], 3, 2.0);
        assert!(out[2].is_none());
    }
}
