// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula (recursive form, seeded with the first value):
//   alpha  = 2 / (span + 1)
//   EMA_0  = x_0
//   EMA_t  = alpha * x_t + (1 - alpha) * EMA_{t-1}
//
// The output has one value per input, so it can be chained (MACD signal line
// is the EMA of the MACD series).
// =============================================================================

/// Compute the EMA series of `values` for the given `span`.
///
/// Returns an empty `Vec` when `values` is empty or `span == 0`. The series is
/// truncated at the first non-finite value.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    if span == 0 || !first.is_finite() {
        return Vec::new();
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    result.push(first);

    let mut prev = first;
    for &x in &values[1..] {
        let ema = alpha * x + (1.0 - alpha) * prev;
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev = ema;
    }

    result
}
