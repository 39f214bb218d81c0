// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================

use super::finite;

/// Mean of the trailing `window` values. `None` when `window == 0` or fewer
/// than `window` values are available.
pub fn calculate_sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    finite(tail.iter().sum::<f64>() / window as f64)
}
