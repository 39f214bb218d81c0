// =============================================================================
// Central Application State
// =============================================================================
//
// Owned by `main` and shared with the API handlers through `Arc<AppState>`.
// The watchlist lives here (never in a global) and every evaluation works on
// a snapshot taken from it.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::TrackerConfig;
use crate::pipeline::EvaluationPipeline;
use crate::watchlist::Watchlist;

pub struct AppState {
    pub config: TrackerConfig,
    pub watchlist: Arc<Watchlist>,
    pub pipeline: Arc<EvaluationPipeline>,

    /// Number of completed evaluation cycles.
    pub evaluations_run: AtomicU64,
    pub last_evaluation_at: RwLock<Option<DateTime<Utc>>>,

    /// Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: TrackerConfig, watchlist: Arc<Watchlist>, pipeline: Arc<EvaluationPipeline>) -> Self {
        Self {
            config,
            watchlist,
            pipeline,
            evaluations_run: AtomicU64::new(0),
            last_evaluation_at: RwLock::new(None),
            start_time: std::time::Instant::now(),
        }
    }

    /// Record a finished evaluation cycle.
    pub fn record_evaluation(&self, at: DateTime<Utc>) {
        self.evaluations_run.fetch_add(1, Ordering::SeqCst);
        *self.last_evaluation_at.write() = Some(at);
    }

    pub fn evaluations_run(&self) -> u64 {
        self.evaluations_run.load(Ordering::SeqCst)
    }
}
