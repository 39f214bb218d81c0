// =============================================================================
// Yahoo Finance chart client: daily OHLCV history over HTTP
// =============================================================================
//
// Endpoint: GET {base}/v8/finance/chart/{symbol}?range={lookback}&interval=1d
//
// Response shape (only the fields we read):
//   { "chart": { "result": [ { "timestamp": [..],
//                              "indicators": { "quote": [ { "open": [..],
//                                 "high": [..], "low": [..], "close": [..],
//                                 "volume": [..] } ] } } ],
//                "error": null } }
//
// Unknown symbols come back as HTTP 404 with `chart.error` populated; that is
// mapped to an empty series. Sessions with a null close are skipped.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{StatusCode, Url};
use tracing::{debug, instrument, warn};

use super::{LookbackPeriod, PricePoint, PriceSource};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; watchlist-tracker/1.0)";

/// HTTP client for the public chart endpoint.
#[derive(Clone)]
pub struct YahooClient {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooClient {
    /// Build a client with the given per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        let raw = base_url.into();
        let base_url = Url::parse(raw.trim_end_matches('/'))
            .with_context(|| format!("invalid price source url {raw:?}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("price source url {raw:?} cannot carry a path");
        }
        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    /// `base_url` extended with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("price source url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        self.client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url} request failed"))
    }
}

#[async_trait]
impl PriceSource for YahooClient {
    #[instrument(skip(self), name = "yahoo::fetch_history")]
    async fn fetch_history(&self, symbol: &str, lookback: LookbackPeriod) -> Result<Vec<PricePoint>> {
        let url = self.endpoint(&["v8", "finance", "chart", symbol])?;
        let resp = self
            .get(url, &[("range", lookback.as_range()), ("interval", "1d")])
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(symbol, "symbol unknown to chart endpoint");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("chart endpoint returned {} for {}: {}", status, symbol, text);
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse chart response for {symbol}"))?;
        let series = parse_chart(&body)?;
        debug!(symbol, count = series.len(), "history fetched");
        Ok(series)
    }

    #[instrument(skip(self), name = "yahoo::market_cap")]
    async fn market_cap(&self, symbol: &str) -> Result<Option<f64>> {
        let url = self.endpoint(&["v7", "finance", "quote"])?;
        let resp = self.get(url, &[("symbols", symbol)]).await?;

        // The quote endpoint is frequently gated; treat refusal as "no data".
        let status = resp.status();
        if !status.is_success() {
            debug!(symbol, %status, "market cap unavailable");
            return Ok(None);
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse quote response for {symbol}"))?;
        Ok(body["quoteResponse"]["result"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|q| q["marketCap"].as_f64())
            .filter(|v| v.is_finite()))
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

/// Parse a chart response body into an ascending series.
pub fn parse_chart(body: &serde_json::Value) -> Result<Vec<PricePoint>> {
    let chart = &body["chart"];

    let result = match chart["result"].as_array().and_then(|arr| arr.first()) {
        Some(r) => r,
        None => {
            if !chart["error"].is_null() {
                debug!(error = %chart["error"], "chart response carried an error");
            }
            return Ok(Vec::new());
        }
    };

    // A valid symbol with no sessions in range omits `timestamp` entirely.
    let timestamps = match result["timestamp"].as_array() {
        Some(ts) => ts,
        None => return Ok(Vec::new()),
    };

    let quote = result["indicators"]["quote"]
        .as_array()
        .and_then(|arr| arr.first())
        .context("chart response missing indicators.quote")?;

    let opens = quote_column(quote, "open")?;
    let highs = quote_column(quote, "high")?;
    let lows = quote_column(quote, "low")?;
    let closes = quote_column(quote, "close")?;
    let volumes = quote_column(quote, "volume")?;

    let mut series = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(secs) = ts.as_i64() else {
            warn!(index = i, "skipping session with non-integer timestamp");
            continue;
        };
        let Some(close) = closes.get(i).and_then(|v| v.as_f64()).filter(|c| c.is_finite()) else {
            continue;
        };
        let Some(timestamp) = Utc.timestamp_opt(secs, 0).single() else {
            warn!(secs, "skipping session with out-of-range timestamp");
            continue;
        };

        let field = |col: &Vec<serde_json::Value>| col.get(i).and_then(|v| v.as_f64());
        series.push(PricePoint {
            timestamp,
            open: field(opens).unwrap_or(close),
            high: field(highs).unwrap_or(close),
            low: field(lows).unwrap_or(close),
            close,
            volume: field(volumes).unwrap_or(0.0),
        });
    }

    series.sort_by_key(|p| p.timestamp);
    Ok(series)
}

fn quote_column<'a>(quote: &'a serde_json::Value, name: &str) -> Result<&'a Vec<serde_json::Value>> {
    quote[name]
        .as_array()
        .with_context(|| format!("chart response missing quote.{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_chart_ok() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL" },
                    "timestamp": [1700000000, 1700086400, 1700172800],
                    "indicators": { "quote": [{
                        "open":   [189.0, 190.0, 191.0],
                        "high":   [190.5, 191.5, 192.5],
                        "low":    [188.0, 189.0, 190.0],
                        "close":  [190.0, 191.0, 192.0],
                        "volume": [1000, 2000, 3000]
                    }]}
                }],
                "error": null
            }
        });
        let series = parse_chart(&body).expect("should parse");
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].timestamp.timestamp(), 1_700_000_000);
        assert!((series[2].close - 192.0).abs() < f64::EPSILON);
        assert!((series[1].volume - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_chart_skips_null_closes() {
        let body = json!({
            "chart": { "result": [{
                "timestamp": [1, 2, 3],
                "indicators": { "quote": [{
                    "open":   [1.0, null, 3.0],
                    "high":   [1.0, null, 3.0],
                    "low":    [1.0, null, 3.0],
                    "close":  [1.0, null, 3.0],
                    "volume": [10, null, null]
                }]}
            }], "error": null }
        });
        let series = parse_chart(&body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].close, 3.0);
        assert_eq!(series[1].volume, 0.0);
    }

    #[test]
    fn parse_chart_sorts_ascending() {
        let body = json!({
            "chart": { "result": [{
                "timestamp": [200, 100],
                "indicators": { "quote": [{
                    "open": [2.0, 1.0], "high": [2.0, 1.0], "low": [2.0, 1.0],
                    "close": [2.0, 1.0], "volume": [0, 0]
                }]}
            }]}
        });
        let series = parse_chart(&body).unwrap();
        assert_eq!(series[0].close, 1.0);
        assert_eq!(series[1].close, 2.0);
    }

    #[test]
    fn parse_chart_error_envelope_is_empty() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });
        assert!(parse_chart(&body).unwrap().is_empty());
    }

    #[test]
    fn parse_chart_without_timestamps_is_empty() {
        let body = json!({
            "chart": { "result": [{ "meta": {}, "indicators": { "quote": [{}] } }] }
        });
        assert!(parse_chart(&body).unwrap().is_empty());
    }

    #[test]
    fn parse_chart_missing_quote_is_error() {
        let body = json!({
            "chart": { "result": [{ "timestamp": [1], "indicators": {} }] }
        });
        assert!(parse_chart(&body).is_err());
    }

    #[test]
    fn endpoint_appends_to_base_path() {
        let client = YahooClient::new("https://example.test/", Duration::from_secs(1)).unwrap();
        let url = client.endpoint(&["v8", "finance", "chart", "AAPL"]).unwrap();
        assert_eq!(url.as_str(), "https://example.test/v8/finance/chart/AAPL");

        let client = YahooClient::new("http://proxy.test/yahoo/", Duration::from_secs(1)).unwrap();
        let url = client.endpoint(&["v7", "finance", "quote"]).unwrap();
        assert_eq!(url.as_str(), "http://proxy.test/yahoo/v7/finance/quote");
    }

    #[test]
    fn symbol_cannot_escape_its_path_segment() {
        let client = YahooClient::new("https://example.test", Duration::from_secs(1)).unwrap();
        let url = client.endpoint(&["v8", "finance", "chart", "A?range=max#x"]).unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path_segments().unwrap().last(), Some("A%3Frange=max%23x"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(YahooClient::new("not a url", Duration::from_secs(1)).is_err());
    }

    // ── HTTP behaviour against a local stub ──────────────────────────────

    mod http {
        use super::*;
        use axum::extract::{Path, Query};
        use axum::response::{IntoResponse, Response};
        use axum::routing::get;
        use axum::{Json, Router};
        use std::collections::HashMap;

        async fn chart(Path(symbol): Path<String>, Query(q): Query<HashMap<String, String>>) -> Response {
            let daily_6mo = q.get("range").map(String::as_str) == Some("6mo")
                && q.get("interval").map(String::as_str) == Some("1d");
            match symbol.as_str() {
                "AAPL" if daily_6mo => Json(json!({
                    "chart": { "result": [{
                        "timestamp": [1700000000, 1700086400],
                        "indicators": { "quote": [{
                            "open": [1.0, 2.0], "high": [1.0, 2.0], "low": [1.0, 2.0],
                            "close": [1.0, 2.0], "volume": [5, 6]
                        }]}
                    }], "error": null }
                }))
                .into_response(),
                "BOOM" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
                _ => (StatusCode::NOT_FOUND, "<html>Not Found</html>").into_response(),
            }
        }

        async fn spawn_stub() -> String {
            let app = Router::new().route("/v8/finance/chart/:symbol", get(chart));
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{addr}")
        }

        async fn client() -> YahooClient {
            YahooClient::new(spawn_stub().await, Duration::from_secs(5)).unwrap()
        }

        #[tokio::test]
        async fn fetch_history_parses_success() {
            let series = client().await.fetch_history("AAPL", LookbackPeriod::default()).await.unwrap();
            assert_eq!(series.len(), 2);
            assert_eq!(series[1].close, 2.0);
        }

        #[tokio::test]
        async fn not_found_with_html_body_is_empty_series() {
            let series = client().await.fetch_history("NOPE", LookbackPeriod::default()).await.unwrap();
            assert!(series.is_empty());
        }

        #[tokio::test]
        async fn server_error_is_an_error() {
            let err = client()
                .await
                .fetch_history("BOOM", LookbackPeriod::default())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("500"));
        }

        #[tokio::test]
        async fn gated_quote_endpoint_gives_no_market_cap() {
            assert_eq!(client().await.market_cap("AAPL").await.unwrap(), None);
        }
    }
}
