// =============================================================================
// Symbol Evaluator: one watchlist entry + its history => SymbolMetrics
// =============================================================================
//
// Pure and synchronous. The pipeline fetches the series; this module only
// derives numbers from it. Missing data is never an error here: an empty
// series yields a record whose derived fields are all `None`.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::{self, finite};
use crate::market_data::{closes, PricePoint};
use crate::ranking::daily_change_pct;
use crate::types::{SymbolMetrics, WatchlistEntry};

fn default_rsi_period() -> usize {
    14
}

fn default_short_ma_window() -> usize {
    20
}

fn default_long_ma_window() -> usize {
    50
}

fn default_bollinger_window() -> usize {
    20
}

fn default_bollinger_num_std() -> f64 {
    2.0
}

/// Window / period settings for the indicator set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_short_ma_window")]
    pub short_ma_window: usize,

    #[serde(default = "default_long_ma_window")]
    pub long_ma_window: usize,

    #[serde(default = "default_bollinger_window")]
    pub bollinger_window: usize,

    /// Band half-width in standard deviations.
    #[serde(default = "default_bollinger_num_std")]
    pub bollinger_num_std: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            short_ma_window: default_short_ma_window(),
            long_ma_window: default_long_ma_window(),
            bollinger_window: default_bollinger_window(),
            bollinger_num_std: default_bollinger_num_std(),
        }
    }
}

impl IndicatorParams {
    /// Longest history any indicator needs to be defined.
    pub fn max_window(&self) -> usize {
        [
            self.rsi_period + 1,
            self.short_ma_window,
            self.long_ma_window,
            self.bollinger_window,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// `(current - reference) / reference * 100`; `None` for a zero reference.
pub fn gain_loss_pct(current: f64, reference: f64) -> Option<f64> {
    if reference == 0.0 {
        return None;
    }
    finite((current - reference) / reference * 100.0)
}

/// Build the metrics record for `entry` from its price `series`.
pub fn evaluate_symbol(
    entry: &WatchlistEntry,
    series: &[PricePoint],
    market_cap: Option<f64>,
    params: &IndicatorParams,
) -> SymbolMetrics {
    let Some(last) = series.last() else {
        return SymbolMetrics {
            market_cap,
            ..SymbolMetrics::no_data(entry)
        };
    };

    let closes = closes(series);
    let current = last.close;

    let macd = indicators::calculate_macd(&closes);
    let bands = indicators::calculate_bollinger(&closes, params.bollinger_window, params.bollinger_num_std);
    let avg_volume = series.iter().map(|p| p.volume).sum::<f64>() / series.len() as f64;

    SymbolMetrics {
        symbol: entry.symbol.clone(),
        reference_price: entry.reference_price,
        current_price: finite(current),
        gain_loss_pct: gain_loss_pct(current, entry.reference_price),
        daily_change_pct: daily_change_pct(series),
        rsi: indicators::calculate_rsi(&closes, params.rsi_period),
        short_ma: indicators::calculate_sma(&closes, params.short_ma_window),
        long_ma: indicators::calculate_sma(&closes, params.long_ma_window),
        macd: macd.map(|m| m.macd),
        signal_line: macd.map(|m| m.signal),
        upper_band: bands.map(|b| b.upper),
        lower_band: bands.map(|b| b.lower),
        volume: finite(last.volume),
        avg_volume: finite(avg_volume),
        market_cap: market_cap.and_then(finite),
    }
}
