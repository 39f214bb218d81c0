// =============================================================================
// Shared types used across the watchlist tracker
// =============================================================================

use serde::{Deserialize, Serialize};

/// One tracked symbol and the user's suggested reference price.
///
/// The CSV column for the price keeps its historical `suggested_price` name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    #[serde(rename = "suggested_price")]
    pub reference_price: f64,
}

impl WatchlistEntry {
    pub fn new(symbol: impl Into<String>, reference_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            reference_price,
        }
    }
}

/// Per-symbol result of one evaluation cycle.
///
/// Every `Option<f64>` is either a finite value or `None` ("no data"); values
/// keep full precision. Rounding happens only in [`MetricsRow`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolMetrics {
    pub symbol: String,
    pub reference_price: f64,
    pub current_price: Option<f64>,
    pub gain_loss_pct: Option<f64>,
    pub daily_change_pct: Option<f64>,
    pub rsi: Option<f64>,
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
    pub macd: Option<f64>,
    pub signal_line: Option<f64>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
    pub volume: Option<f64>,
    pub avg_volume: Option<f64>,
    pub market_cap: Option<f64>,
}

impl SymbolMetrics {
    /// A record for a symbol with no usable price history.
    pub fn no_data(entry: &WatchlistEntry) -> Self {
        Self {
            symbol: entry.symbol.clone(),
            reference_price: entry.reference_price,
            ..Self::default()
        }
    }

    /// `true` when no current price could be derived.
    pub fn is_missing_data(&self) -> bool {
        self.current_price.is_none()
    }
}

/// Day-over-day move of a single symbol, used for the gainers/losers boards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyChangeRecord {
    pub symbol: String,
    pub current_price: f64,
    pub daily_change_pct: f64,
}

/// Sort direction for the metrics table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{other}' (expected asc or desc)")),
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Round to two decimals for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Display view of [`SymbolMetrics`] with every number rounded to two
/// decimals. Serialised with the dashboard's column labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    #[serde(rename = "Stock Symbol")]
    pub symbol: String,
    #[serde(rename = "Suggested Price")]
    pub reference_price: f64,
    #[serde(rename = "Current Price")]
    pub current_price: Option<f64>,
    #[serde(rename = "Gain/Loss (%)")]
    pub gain_loss_pct: Option<f64>,
    #[serde(rename = "Daily Change (%)")]
    pub daily_change_pct: Option<f64>,
    #[serde(rename = "RSI")]
    pub rsi: Option<f64>,
    #[serde(rename = "Short MA")]
    pub short_ma: Option<f64>,
    #[serde(rename = "Long MA")]
    pub long_ma: Option<f64>,
    #[serde(rename = "MACD")]
    pub macd: Option<f64>,
    #[serde(rename = "Signal Line")]
    pub signal_line: Option<f64>,
    #[serde(rename = "Upper Bollinger Band")]
    pub upper_band: Option<f64>,
    #[serde(rename = "Lower Bollinger Band")]
    pub lower_band: Option<f64>,
    #[serde(rename = "Volume")]
    pub volume: Option<f64>,
    #[serde(rename = "Average Volume")]
    pub avg_volume: Option<f64>,
    #[serde(rename = "Market Cap")]
    pub market_cap: Option<f64>,
}

impl From<&SymbolMetrics> for MetricsRow {
    fn from(m: &SymbolMetrics) -> Self {
        let r = |v: Option<f64>| v.map(round2);
        Self {
            symbol: m.symbol.clone(),
            reference_price: round2(m.reference_price),
            current_price: r(m.current_price),
            gain_loss_pct: r(m.gain_loss_pct),
            daily_change_pct: r(m.daily_change_pct),
            rsi: r(m.rsi),
            short_ma: r(m.short_ma),
            long_ma: r(m.long_ma),
            macd: r(m.macd),
            signal_line: r(m.signal_line),
            upper_band: r(m.upper_band),
            lower_band: r(m.lower_band),
            volume: r(m.volume),
            avg_volume: r(m.avg_volume),
            market_cap: r(m.market_cap),
        }
    }
}

/// Rounded view of a [`DailyChangeRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoverRow {
    pub symbol: String,
    pub current_price: f64,
    pub daily_change_pct: f64,
}

impl From<&DailyChangeRecord> for MoverRow {
    fn from(d: &DailyChangeRecord) -> Self {
        Self {
            symbol: d.symbol.clone(),
            current_price: round2(d.current_price),
            daily_change_pct: round2(d.daily_change_pct),
        }
    }
}
