// =============================================================================
// Relative Strength Index (RSI): simple-average variant
// =============================================================================
//
// Step 1: Compute price changes (deltas) from consecutive closes.
// Step 2: Split into gains (positive deltas, else 0) and losses (negative
//         deltas negated, else 0).
// Step 3: Average gain / average loss = SMA of the trailing `period` gains /
//         losses, ending at the most recent delta.
// Step 4: RS  = avg_gain / avg_loss
//         RSI = 100 - 100 / (1 + RS)
//
// A zero average loss makes RS unbounded; that case is reported as undefined
// rather than clamped.
// =============================================================================

use super::finite;

/// Compute the RSI at the most recent close.
///
/// # Edge cases
/// - `period == 0` => `None`
/// - `closes.len() < period + 1` => `None` (need `period` deltas)
/// - average loss of exactly zero => `None`
pub fn calculate_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    // Only the trailing `period` deltas contribute to the window.
    let tail = &closes[closes.len() - period - 1..];
    let (sum_gain, sum_loss) = tail.windows(2).map(|w| w[1] - w[0]).fold(
        (0.0_f64, 0.0_f64),
        |(g, l), d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        },
    );

    let period_f = period as f64;
    let avg_gain = sum_gain / period_f;
    let avg_loss = sum_loss / period_f;

    if avg_loss == 0.0 || !avg_loss.is_finite() {
        return None;
    }

    let rs = avg_gain / avg_loss;
    finite(100.0 - 100.0 / (1.0 + rs))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).is_none());
    }

    #[test]
    fn rsi_period_zero() {
        assert!(calculate_rsi(&[1.0, 2.0, 3.0], 0).is_none());
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(calculate_rsi(&closes, 14).is_none());
    }

    #[test]
    fn rsi_all_gains_is_undefined() {
        // Strictly ascending => zero average loss => undefined.
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert!(calculate_rsi(&closes, 14).is_none());
    }

    #[test]
    fn rsi_flat_market_is_undefined() {
        assert!(calculate_rsi(&[100.0; 30], 14).is_none());
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let v = calculate_rsi(&closes, 14).unwrap();
        assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
    }

    #[test]
    fn rsi_balanced_moves_is_fifty() {
        // Alternating +1 / -1 over an even period => avg gain == avg loss.
        let closes: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let v = calculate_rsi(&closes, 14).unwrap();
        assert!((v - 50.0).abs() < 1e-10, "expected 50.0, got {v}");
    }

    #[test]
    fn rsi_uses_trailing_window_only() {
        // A large early drop falls outside the 2-delta window.
        let closes = [100.0, 10.0, 11.0, 10.5];
        // deltas in window: +1.0, -0.5 => avg gain 0.5, avg loss 0.25 => RS 2
        let v = calculate_rsi(&closes, 2).unwrap();
        assert!((v - (100.0 - 100.0 / 3.0)).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let v = calculate_rsi(&closes, 14).unwrap();
        assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
    }
}
