// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   macd_line   = EMA(fast) - EMA(slow)
//   signal_line = EMA(signal) of macd_line
//   histogram   = macd_line - signal_line
//
// With SMA-seeded EMAs the MACD line starts at index `slow - 1` and the
// signal line at index `slow + signal - 2`.
// =============================================================================

use crate::indicators::ema::{calculate_ema, calculate_ema_of};

/// One bar of MACD output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Full MACD series aligned with `closes`; `None` until the signal line exists.
pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Vec<Option<MacdPoint>> {
    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = calculate_ema_of(&line, signal);

    line.iter()
        .zip(&signal_line)
        .map(|(m, s)| {
            let (macd, signal) = ((*m)?, (*s)?);
            Some(MacdPoint {
                macd,
                signal,
                histogram: macd - signal,
            })
        })
        .collect()
}
