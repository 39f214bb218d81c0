// =============================================================================
// Evaluation Pipeline: watchlist snapshot => ranked metrics + movers
// =============================================================================
//
// Fan-out: one future per entry (fetch with timeout, then evaluate), driven by
// an ordered buffered stream so at most `max_concurrent_fetches` requests are
// in flight and results come back in watchlist order.
//
// Fan-in: once every entry has finished (or degraded), the ranking runs once
// on the complete result set.
//
// A failed or timed-out fetch only affects its own symbol: the record is
// built from an empty series and the cycle carries on.
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TrackerConfig;
use crate::evaluator::{evaluate_symbol, IndicatorParams};
use crate::market_data::{LookbackPeriod, PricePoint, PriceSource};
use crate::ranking::{daily_changes, sort_metrics, top_movers, SortKey};
use crate::types::{DailyChangeRecord, SortDirection, SymbolMetrics, WatchlistEntry};

/// Output of one evaluation cycle.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub cycle_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub sort_key: String,
    pub sort_direction: SortDirection,
    pub metrics: Vec<SymbolMetrics>,
    pub top_gainers: Vec<DailyChangeRecord>,
    pub top_losers: Vec<DailyChangeRecord>,
}

/// Stateless apart from its settings; safe to share across requests.
pub struct EvaluationPipeline {
    source: Arc<dyn PriceSource>,
    lookback: LookbackPeriod,
    params: IndicatorParams,
    top_n: usize,
    max_concurrent_fetches: usize,
    fetch_timeout: Duration,
    fetch_market_cap: bool,
}

impl EvaluationPipeline {
    pub fn new(source: Arc<dyn PriceSource>, config: &TrackerConfig) -> Self {
        Self {
            source,
            lookback: config.lookback,
            params: config.indicators.clone(),
            top_n: config.top_n,
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
            fetch_timeout: config.fetch_timeout(),
            fetch_market_cap: config.fetch_market_cap,
        }
    }

    /// Evaluate every entry, then sort the table and build the movers boards.
    pub async fn evaluate_watchlist(
        &self,
        entries: &[WatchlistEntry],
        sort_key: SortKey,
        sort_direction: SortDirection,
    ) -> Evaluation {
        let cycle_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%cycle_id, symbols = entries.len(), lookback = %self.lookback, "evaluation cycle started");

        // Futures are built up front so each borrows its own entry.
        let pending: Vec<_> = entries.iter().map(|entry| self.evaluate_entry(entry)).collect();
        let metrics: Vec<SymbolMetrics> = stream::iter(pending)
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        let missing = metrics.iter().filter(|m| m.is_missing_data()).count();
        let evaluation = rank(cycle_id, metrics, sort_key, sort_direction, self.top_n);

        info!(
            %cycle_id,
            symbols = evaluation.metrics.len(),
            missing_data = missing,
            movers = evaluation.top_gainers.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "evaluation cycle finished"
        );
        evaluation
    }

    async fn evaluate_entry(&self, entry: &WatchlistEntry) -> SymbolMetrics {
        let series = self.fetch_series(&entry.symbol).await;
        let market_cap = if self.fetch_market_cap && !series.is_empty() {
            self.fetch_market_cap(&entry.symbol).await
        } else {
            None
        };
        evaluate_symbol(entry, &series, market_cap, &self.params)
    }

    /// History for `symbol`; empty on error or timeout.
    async fn fetch_series(&self, symbol: &str) -> Vec<PricePoint> {
        let fetch = self.source.fetch_history(symbol, self.lookback);
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(series)) => {
                debug!(symbol, count = series.len(), "history received");
                series
            }
            Ok(Err(e)) => {
                warn!(symbol, error = %format!("{e:#}"), "history fetch failed -- no data for this cycle");
                Vec::new()
            }
            Err(_) => {
                warn!(symbol, timeout_ms = self.fetch_timeout.as_millis() as u64, "history fetch timed out -- no data for this cycle");
                Vec::new()
            }
        }
    }

    async fn fetch_market_cap(&self, symbol: &str) -> Option<f64> {
        match tokio::time::timeout(self.fetch_timeout, self.source.market_cap(symbol)).await {
            Ok(Ok(cap)) => cap,
            Ok(Err(e)) => {
                debug!(symbol, error = %e, "market cap fetch failed");
                None
            }
            Err(_) => {
                debug!(symbol, "market cap fetch timed out");
                None
            }
        }
    }
}

/// Deterministic aggregation over a complete, watchlist-ordered result set.
///
/// Movers are derived before the table sort so that ties keep watchlist
/// order regardless of the requested column.
pub fn rank(
    cycle_id: Uuid,
    mut metrics: Vec<SymbolMetrics>,
    sort_key: SortKey,
    sort_direction: SortDirection,
    top_n: usize,
) -> Evaluation {
    let movers = top_movers(daily_changes(&metrics), top_n);
    sort_metrics(&mut metrics, sort_key, sort_direction);

    Evaluation {
        cycle_id,
        generated_at: Utc::now(),
        sort_key: sort_key.label().to_string(),
        sort_direction,
        metrics,
        top_gainers: movers.gainers,
        top_losers: movers.losers,
    }
}
