// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and speak JSON. Numbers in evaluation
// responses are rounded to two decimals; `null` marks "no data".
//
// CORS is permissive; the service is meant to sit behind a local dashboard.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::ranking::SortKey;
use crate::types::{MetricsRow, MoverRow, SortDirection, WatchlistEntry};
use crate::watchlist::WatchlistError;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/watchlist", get(list_watchlist).post(add_entry))
        .route("/api/v1/evaluation", get(evaluation))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

/// Error body returned by every failing endpoint.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<WatchlistError> for ApiError {
    fn from(err: WatchlistError) -> Self {
        match err {
            WatchlistError::InvalidSymbol(_) | WatchlistError::InvalidPrice(_) => Self::BadRequest(err.to_string()),
            WatchlistError::Persist(_) => {
                Self::Internal(format!("entry added for this session but not saved: {err}"))
            }
        }
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    watchlist_size: usize,
    evaluations_run: u64,
    last_evaluation_at: Option<DateTime<Utc>>,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        watchlist_size: state.watchlist.len(),
        evaluations_run: state.evaluations_run(),
        last_evaluation_at: *state.last_evaluation_at.read(),
        server_time: Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Watchlist
// =============================================================================

async fn list_watchlist(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.watchlist.snapshot())
}

#[derive(Deserialize)]
struct AddEntryRequest {
    symbol: String,
    suggested_price: f64,
}

async fn add_entry(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddEntryRequest>,
) -> Result<(StatusCode, Json<WatchlistEntry>), ApiError> {
    let watchlist = state.watchlist.clone();

    // The CSV rewrite is blocking file I/O.
    let entry = tokio::task::spawn_blocking(move || watchlist.add(&req.symbol, req.suggested_price))
        .await
        .map_err(|e| ApiError::Internal(format!("add task failed: {e}")))??;

    info!(symbol = %entry.symbol, "watchlist entry added via API");
    Ok((StatusCode::CREATED, Json(entry)))
}

// =============================================================================
// Evaluation
// =============================================================================

#[derive(Deserialize)]
struct EvaluationQuery {
    sort: Option<String>,
    order: Option<String>,
}

#[derive(Serialize)]
struct EvaluationResponse {
    cycle_id: Uuid,
    generated_at: DateTime<Utc>,
    sort: String,
    order: SortDirection,
    stock_data: Vec<MetricsRow>,
    top_gainers: Vec<MoverRow>,
    top_losers: Vec<MoverRow>,
}

async fn evaluation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EvaluationQuery>,
) -> Result<Json<EvaluationResponse>, ApiError> {
    let sort_key = match query.sort.as_deref() {
        Some(s) => s.parse::<SortKey>().map_err(ApiError::BadRequest)?,
        None => SortKey::default(),
    };
    let direction = match query.order.as_deref() {
        Some(o) => o.parse::<SortDirection>().map_err(ApiError::BadRequest)?,
        None => SortDirection::default(),
    };

    let entries = state.watchlist.snapshot();
    if entries.is_empty() {
        warn!("evaluation requested on an empty watchlist");
    }

    let eval = state.pipeline.evaluate_watchlist(&entries, sort_key, direction).await;
    state.record_evaluation(eval.generated_at);

    Ok(Json(EvaluationResponse {
        cycle_id: eval.cycle_id,
        generated_at: eval.generated_at,
        sort: eval.sort_key,
        order: eval.sort_direction,
        stock_data: eval.metrics.iter().map(MetricsRow::from).collect(),
        top_gainers: eval.top_gainers.iter().map(MoverRow::from).collect(),
        top_losers: eval.top_losers.iter().map(MoverRow::from).collect(),
    }))
}
