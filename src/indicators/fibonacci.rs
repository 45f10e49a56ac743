// =============================================================================
// Fibonacci Retracement
// =============================================================================
//
// For a swing that moved from `from` to `to`, the retracement at ratio r is
// the price that gives back r of the move:
//
//   level(r) = to - r * (to - from)
//
// An up-swing (low -> high) yields levels below the high; a down-swing
// (high -> low) yields levels above the low.

pub const DEFAULT_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];

/// Retracement price for each ratio, in ratio order.
pub fn retracement_levels(from: f64, to: f64, ratios: &[f64]) -> Vec<f64> {
    let range = to - from;
    ratios.iter().map(|r| to - r * range).collect()
}

/// Index and value of the first minimum of `values`.
pub fn first_min(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b <= v => best,
            _ if v.is_nan() => best,
            _ => Some((i, v)),
        })
}

/// Index and value of the first maximum of `values`.
pub fn first_max(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ if v.is_nan() => best,
            _ => Some((i, v)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_swing_levels_sit_below_the_high() {
        let levels = retracement_levels(10.0, 20.0, &[0.0, 0.5, 1.0]);
        assert_eq!(levels, vec![20.0, 15.0, 10.0]);
    }

    #[test]
    fn down_swing_levels_sit_above_the_low() {
        let levels = retracement_levels(20.0, 10.0, &DEFAULT_RATIOS);
        assert!((levels[0] - 12.36).abs() < 1e-10);
        assert!((levels[2] - 15.0).abs() < 1e-10);
        assert!(levels.iter().all(|&l| l > 10.0 && l < 20.0));
    }

    #[test]
    fn extremes_report_first_occurrence() {
        let values = [3.0, 1.0, f64::NAN, 1.0, 5.0, 5.0];
        assert_eq!(first_min(&values), Some((1, 1.0)));
        assert_eq!(first_max(&values), Some((4, 5.0)));
        assert_eq!(first_min(&[]), None);
    }
}
