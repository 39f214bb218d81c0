// =============================================================================
// Tracker Configuration: JSON file with per-field defaults and atomic save
// =============================================================================
//
// Every field carries a serde default so a partial (or empty) file is valid.
// A handful of deployment settings can be overridden from the environment.
// An invalid configuration is the one fatal condition at startup.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::evaluator::IndicatorParams;
use crate::market_data::yahoo::DEFAULT_BASE_URL;
use crate::market_data::LookbackPeriod;
use crate::ranking::DEFAULT_TOP_N;

/// Sessions needed before EMA26 + EMA9 settle.
const MACD_WARMUP_SESSIONS: usize = 26 + 9;

// =============================================================================
// Default-value helpers
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_watchlist_path() -> String {
    "stocks.csv".to_string()
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_price_source_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

// =============================================================================
// TrackerConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// CSV file holding the watchlist.
    #[serde(default = "default_watchlist_path")]
    pub watchlist_path: String,

    /// History requested per symbol.
    #[serde(default)]
    pub lookback: LookbackPeriod,

    #[serde(default)]
    pub indicators: IndicatorParams,

    /// Size of each daily-movers board.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Upper bound on in-flight history requests per evaluation.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Per-symbol budget for fetching history (and market cap).
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// How long fetched history is reused. 0 disables the cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Also request market capitalisation for each symbol.
    #[serde(default = "default_true")]
    pub fetch_market_cap: bool,

    #[serde(default = "default_price_source_url")]
    pub price_source_url: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            watchlist_path: default_watchlist_path(),
            lookback: LookbackPeriod::default(),
            indicators: IndicatorParams::default(),
            top_n: default_top_n(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            fetch_market_cap: true,
            price_source_url: default_price_source_url(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// Load `path`, or write and return the defaults when it does not exist.
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        warn!(path = %path.display(), "no tracker config found -- using defaults");
        let config = Self::default();
        if let Err(e) = config.save(path) {
            warn!(error = %format!("{e:#}"), path = %path.display(), "could not write default config");
        }
        Ok(config)
    }

    /// Read and parse `path`. A missing file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tracker config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse tracker config from {}", path.display()))?;

        info!(
            path = %path.display(),
            lookback = %config.lookback,
            watchlist = %config.watchlist_path,
            "tracker config loaded"
        );

        Ok(config)
    }

    /// Persist to `path` via tmp + rename.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self).context("failed to serialise tracker config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "tracker config saved (atomic)");
        Ok(())
    }

    /// Apply `TRACKER_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("TRACKER_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Ok(path) = std::env::var("TRACKER_WATCHLIST_PATH") {
            self.watchlist_path = path;
        }
        if let Ok(url) = std::env::var("TRACKER_PRICE_SOURCE_URL") {
            self.price_source_url = url;
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let ind = &self.indicators;

        if self.max_concurrent_fetches == 0 {
            anyhow::bail!("max_concurrent_fetches must be at least 1");
        }
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be at least 1");
        }
        if self.top_n == 0 {
            anyhow::bail!("top_n must be at least 1");
        }
        if ind.rsi_period == 0 || ind.short_ma_window == 0 || ind.long_ma_window == 0 {
            anyhow::bail!("indicator periods must be at least 1");
        }
        if ind.bollinger_window < 2 {
            anyhow::bail!("bollinger_window must be at least 2");
        }
        if !ind.bollinger_num_std.is_finite() || ind.bollinger_num_std <= 0.0 {
            anyhow::bail!("bollinger_num_std must be a positive number");
        }

        let sessions = self.lookback.approx_sessions();
        if sessions < ind.max_window() {
            anyhow::bail!(
                "lookback {} (~{} sessions) is shorter than the longest indicator window ({})",
                self.lookback,
                sessions,
                ind.max_window()
            );
        }
        if sessions < MACD_WARMUP_SESSIONS {
            warn!(lookback = %self.lookback, "lookback is short for a stable MACD signal line");
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// `None` when caching is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }
}
