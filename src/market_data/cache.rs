use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::{LookbackPeriod, PricePoint, PriceSource};

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Composite key that identifies one cached history request.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SeriesKey {
    pub symbol: String,
    pub lookback: LookbackPeriod,
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.lookback)
    }
}

struct CachedSeries {
    fetched_at: Instant,
    series: Vec<PricePoint>,
}

// ---------------------------------------------------------------------------
// CachedPriceSource -- time-bounded cache in front of another source
// ---------------------------------------------------------------------------

/// Wraps a [`PriceSource`] and serves repeated `(symbol, lookback)` requests
/// from memory for `ttl`. Only successful fetches are stored.
pub struct CachedPriceSource {
    inner: Arc<dyn PriceSource>,
    ttl: Duration,
    entries: RwLock<HashMap<SeriesKey, CachedSeries>>,
}

impl CachedPriceSource {
    pub fn new(inner: Arc<dyn PriceSource>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh cached series for `key`, if any.
    fn lookup(&self, key: &SeriesKey) -> Option<Vec<PricePoint>> {
        let map = self.entries.read();
        map.get(key)
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.series.clone())
    }

    /// Drop every entry older than the TTL.
    pub fn evict_expired(&self) {
        let ttl = self.ttl;
        self.entries.write().retain(|_, c| c.fetched_at.elapsed() < ttl);
    }

    /// Number of stored entries (fresh or stale).
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[async_trait]
impl PriceSource for CachedPriceSource {
    async fn fetch_history(&self, symbol: &str, lookback: LookbackPeriod) -> Result<Vec<PricePoint>> {
        let key = SeriesKey {
            symbol: symbol.to_string(),
            lookback,
        };

        if let Some(series) = self.lookup(&key) {
            debug!(key = %key, "series cache hit");
            return Ok(series);
        }

        let series = self.inner.fetch_history(symbol, lookback).await?;
        debug!(key = %key, count = series.len(), "series cache miss -- stored");
        self.entries.write().insert(
            key,
            CachedSeries {
                fetched_at: Instant::now(),
                series: series.clone(),
            },
        );
        Ok(series)
    }

    async fn market_cap(&self, symbol: &str) -> Result<Option<f64>> {
        self.inner.market_cap(symbol).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PriceSource for CountingSource {
        async fn fetch_history(&self, _symbol: &str, _lookback: LookbackPeriod) -> Result<Vec<PricePoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("upstream unavailable");
            }
            Ok(vec![PricePoint {
                timestamp: Utc.timestamp_opt(0, 0).unwrap(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
            }])
        }
    }

    fn counting(fail: bool) -> Arc<CountingSource> {
        Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn serves_repeat_requests_from_cache() {
        let inner = counting(false);
        let cache = CachedPriceSource::new(inner.clone(), Duration::from_secs(60));

        cache.fetch_history("AAPL", LookbackPeriod::SixMonths).await.unwrap();
        let again = cache.fetch_history("AAPL", LookbackPeriod::SixMonths).await.unwrap();

        assert_eq!(again.len(), 1);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookback_is_part_of_the_key() {
        let inner = counting(false);
        let cache = CachedPriceSource::new(inner.clone(), Duration::from_secs(60));

        cache.fetch_history("AAPL", LookbackPeriod::SixMonths).await.unwrap();
        cache.fetch_history("AAPL", LookbackPeriod::OneYear).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn refetches_after_ttl() {
        let inner = counting(false);
        let cache = CachedPriceSource::new(inner.clone(), Duration::from_millis(10));

        cache.fetch_history("MSFT", LookbackPeriod::SixMonths).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.fetch_history("MSFT", LookbackPeriod::SixMonths).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let inner = counting(true);
        let cache = CachedPriceSource::new(inner.clone(), Duration::from_secs(60));

        assert!(cache.fetch_history("BAD", LookbackPeriod::SixMonths).await.is_err());
        assert!(cache.fetch_history("BAD", LookbackPeriod::SixMonths).await.is_err());

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn evict_expired_drops_stale_entries() {
        let inner = counting(false);
        let cache = CachedPriceSource::new(inner, Duration::from_millis(10));

        cache.fetch_history("TSLA", LookbackPeriod::SixMonths).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.evict_expired();

        assert_eq!(cache.len(), 0);
    }
}
