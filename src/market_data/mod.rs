// =============================================================================
// Market Data: price history source abstraction
// =============================================================================
//
// The evaluator only needs one capability from the outside world: "give me the
// daily OHLCV history for this symbol over this lookback". Concrete sources
// (HTTP client, cache wrapper, test stubs) implement [`PriceSource`].

pub mod cache;
pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use cache::CachedPriceSource;
pub use yahoo::YahooClient;

/// One trading session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// How far back to request history.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookbackPeriod {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[default]
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl LookbackPeriod {
    /// Range string understood by the chart endpoint.
    pub fn as_range(&self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
        }
    }

    /// Approximate number of trading sessions in the period.
    pub fn approx_sessions(&self) -> usize {
        match self {
            Self::OneMonth => 21,
            Self::ThreeMonths => 63,
            Self::SixMonths => 126,
            Self::OneYear => 252,
            Self::TwoYears => 504,
            Self::FiveYears => 1260,
        }
    }
}

impl std::fmt::Display for LookbackPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_range())
    }
}

/// Supplier of daily price history.
///
/// Implementations must return an empty series (not an error) for a symbol
/// the source does not know. Errors are reserved for transport and parsing
/// failures.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_history(&self, symbol: &str, lookback: LookbackPeriod) -> Result<Vec<PricePoint>>;

    /// Market capitalisation, when the source provides it.
    async fn market_cap(&self, _symbol: &str) -> Result<Option<f64>> {
        Ok(None)
    }
}

/// Closing prices of `series`, oldest first.
pub fn closes(series: &[PricePoint]) -> Vec<f64> {
    series.iter().map(|p| p.close).collect()
}
