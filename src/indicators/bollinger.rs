// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Middle band = SMA(window); upper / lower = middle ± k * σ, where σ is the
// *sample* standard deviation (n - 1 denominator) of the same trailing window.


use super::finite;

/// Result of a Bollinger Band calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Calculate Bollinger Bands over the trailing `window` closes.
///
/// Returns `None` when:
/// - `window < 2` (sample deviation needs two points).
/// - Fewer than `window` data points.
/// - Any band is non-finite.
pub fn calculate_bollinger(closes: &[f64], window: usize, num_std: f64) -> Option<BollingerBands> {
    if window < 2 || closes.len() < window {
        return None;
    }

    let tail = &closes[closes.len() - window..];
    let middle = tail.iter().sum::<f64>() / window as f64;
    let variance = tail.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / (window - 1) as f64;
    let std_dev = variance.sqrt();

    Some(BollingerBands {
        upper: finite(middle + num_std * std_dev)?,
        middle: finite(middle)?,
        lower: finite(middle - num_std * std_dev)?,
    })
}
