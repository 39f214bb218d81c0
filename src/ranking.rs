// =============================================================================
// Ranking Engine: daily movers and metrics-table sorting
// =============================================================================
//
// Daily movers:
//   change = (close_t - close_{t-1}) / close_{t-1} * 100
//   Records are stable-sorted by change, descending. Gainers are the head of
//   that list; losers are its tail, reported worst-first. When fewer than 2N
//   symbols qualify the two boards overlap; nothing is deduplicated.
//
// Table sort:
//   An undefined value ranks below every defined value. Ascending therefore
//   puts undefined rows first and descending puts them last. Equal keys keep
//   watchlist order in both directions.
// =============================================================================

use std::cmp::Ordering;


use crate::indicators::finite;
use crate::market_data::PricePoint;
use crate::types::{DailyChangeRecord, SortDirection, SymbolMetrics};

/// Default size of each movers board.
pub const DEFAULT_TOP_N: usize = 10;

/// Percentage change between the last two closes. `None` with fewer than two
/// points or a zero previous close.
pub fn daily_change_pct(series: &[PricePoint]) -> Option<f64> {
    let [.., prev, last] = series else {
        return None;
    };
    if prev.close == 0.0 {
        return None;
    }
    finite((last.close - prev.close) / prev.close * 100.0)
}

/// Movers records for every symbol that has both a current price and a daily
/// change, in watchlist order.
pub fn daily_changes(metrics: &[SymbolMetrics]) -> Vec<DailyChangeRecord> {
    metrics
        .iter()
        .filter_map(|m| {
            Some(DailyChangeRecord {
                symbol: m.symbol.clone(),
                current_price: m.current_price?,
                daily_change_pct: m.daily_change_pct?,
            })
        })
        .collect()
}

/// Top gainers and losers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Movers {
    pub gainers: Vec<DailyChangeRecord>,
    pub losers: Vec<DailyChangeRecord>,
}

/// Rank `records` by daily change and cut both boards at `n`.
pub fn top_movers(mut records: Vec<DailyChangeRecord>, n: usize) -> Movers {
    // `sort_by` is stable: ties keep their incoming (watchlist) order.
    records.sort_by(|a, b| b.daily_change_pct.total_cmp(&a.daily_change_pct));

    let gainers = records.iter().take(n).cloned().collect();
    let tail_start = records.len().saturating_sub(n);
    let losers = records[tail_start..].iter().rev().cloned().collect();

    Movers { gainers, losers }
}

// =============================================================================
// Table sort
// =============================================================================

/// Sortable column of the metrics table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Symbol,
    ReferencePrice,
    CurrentPrice,
    GainLossPct,
    DailyChangePct,
    Rsi,
    ShortMa,
    LongMa,
    Macd,
    SignalLine,
    UpperBand,
    LowerBand,
    Volume,
    AvgVolume,
    MarketCap,
}

/// (key, table label, snake_case name)
const SORT_KEYS: &[(SortKey, &str, &str)] = &[
    (SortKey::Symbol, "Stock Symbol", "symbol"),
    (SortKey::ReferencePrice, "Suggested Price", "suggested_price"),
    (SortKey::CurrentPrice, "Current Price", "current_price"),
    (SortKey::GainLossPct, "Gain/Loss (%)", "gain_loss_pct"),
    (SortKey::DailyChangePct, "Daily Change (%)", "daily_change_pct"),
    (SortKey::Rsi, "RSI", "rsi"),
    (SortKey::ShortMa, "Short MA", "short_ma"),
    (SortKey::LongMa, "Long MA", "long_ma"),
    (SortKey::Macd, "MACD", "macd"),
    (SortKey::SignalLine, "Signal Line", "signal_line"),
    (SortKey::UpperBand, "Upper Bollinger Band", "upper_band"),
    (SortKey::LowerBand, "Lower Bollinger Band", "lower_band"),
    (SortKey::Volume, "Volume", "volume"),
    (SortKey::AvgVolume, "Average Volume", "avg_volume"),
    (SortKey::MarketCap, "Market Cap", "market_cap"),
];

impl SortKey {
    /// Column label as shown in the metrics table.
    pub fn label(&self) -> &'static str {
        SORT_KEYS
            .iter()
            .find(|(k, _, _)| k == self)
            .map_or("Stock Symbol", |(_, label, _)| *label)
    }

    /// Numeric value of this column, or `None` for the symbol column and for
    /// undefined values.
    fn value(&self, m: &SymbolMetrics) -> Option<f64> {
        match self {
            Self::Symbol => None,
            Self::ReferencePrice => Some(m.reference_price),
            Self::CurrentPrice => m.current_price,
            Self::GainLossPct => m.gain_loss_pct,
            Self::DailyChangePct => m.daily_change_pct,
            Self::Rsi => m.rsi,
            Self::ShortMa => m.short_ma,
            Self::LongMa => m.long_ma,
            Self::Macd => m.macd,
            Self::SignalLine => m.signal_line,
            Self::UpperBand => m.upper_band,
            Self::LowerBand => m.lower_band,
            Self::Volume => m.volume,
            Self::AvgVolume => m.avg_volume,
            Self::MarketCap => m.market_cap,
        }
    }

    /// Ascending comparison of two rows on this column.
    fn compare(&self, a: &SymbolMetrics, b: &SymbolMetrics) -> Ordering {
        match self {
            Self::Symbol => a.symbol.cmp(&b.symbol),
            _ => compare_undefined_low(self.value(a), self.value(b)),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SORT_KEYS
            .iter()
            .find(|(_, label, name)| label.eq_ignore_ascii_case(s) || name.eq_ignore_ascii_case(s))
            .map(|(k, _, _)| *k)
            .ok_or_else(|| format!("unknown sort key '{s}'"))
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// `None` < `Some(_)`; defined values compare by total order.
fn compare_undefined_low(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}

/// Stable in-place sort of the metrics table.
pub fn sort_metrics(metrics: &mut [SymbolMetrics], key: SortKey, direction: SortDirection) {
    match direction {
        SortDirection::Asc => metrics.sort_by(|a, b| key.compare(a, b)),
        SortDirection::Desc => metrics.sort_by(|a, b| key.compare(b, a)),
    }
}
