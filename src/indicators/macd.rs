// =============================================================================
// MACD: Moving Average Convergence / Divergence
// =============================================================================
//
//   MACD_t   = EMA12_t - EMA26_t          (evaluated at every close)
//   Signal_t = EMA9 of the MACD series
//   Hist_t   = MACD_t - Signal_t
//
// Unlike the windowed indicators, MACD is defined from the very first close
// because the EMAs are seeded with that close.


use super::ema::ema_series;
use super::finite;

const FAST_SPAN: usize = 12;
const SLOW_SPAN: usize = 26;
const SIGNAL_SPAN: usize = 9;

/// Latest MACD reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute the MACD line and its signal line at the most recent close.
///
/// Returns `None` only for an empty series (or a series that turns
/// non-finite).
pub fn calculate_macd(closes: &[f64]) -> Option<Macd> {
    let fast = ema_series(closes, FAST_SPAN);
    let slow = ema_series(closes, SLOW_SPAN);

    let line: Vec<f64> = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect();
    if line.len() != closes.len() {
        return None;
    }

    let signal = ema_series(&line, SIGNAL_SPAN);
    let macd = finite(*line.last()?)?;
    let signal = finite(*signal.last()?)?;

    Some(Macd {
        macd,
        signal,
        histogram: macd - signal,
    })
}
