// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// JSON endpoints live under `/api/v1/`; `/` serves the single-page dashboard,
// which calls them and hands the returned figures to Plotly.
//
// CORS is permissive so the page can be served from elsewhere during
// development.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::companies::{self, Company};
use crate::types::Period;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Error body shared by every failing endpoint: `{"error": "..."}`.
pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/api/v1/health", get(health))
        .route("/api/v1/companies", get(list_companies))
        .route("/api/v1/periods", get(list_periods))
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/refresh", post(refresh))
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Page
// =============================================================================

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    uptime_secs: u64,
    cached_entries: usize,
    cached_profiles: usize,
    provider_fetches: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cached_entries: state.cache.len(),
        cached_profiles: state.profiles.len(),
        provider_fetches: state.fetches(),
    })
}

// =============================================================================
// Selection lists
// =============================================================================

async fn list_companies() -> impl IntoResponse {
    Json(companies::all())
}

#[derive(Serialize)]
struct PeriodsResponse {
    periods: Vec<Period>,
    default: Period,
}

async fn list_periods(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(PeriodsResponse {
        periods: Period::ALL.to_vec(),
        default: state.config.default_period,
    })
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
}

/// Resolve the sidebar selection. Missing values fall back to the first
/// company and the configured default period; unknown values are a 400.
pub fn resolve_selection(
    state: &AppState,
    query: &SelectionQuery,
) -> Result<(Company, Period), ApiError> {
    let company = match query.ticker.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(t) => companies::by_ticker(t).ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("Unknown ticker '{t}'. Pick one from /api/v1/companies."),
            )
        })?,
        None => companies::default_company(),
    };

    let period = match query.period.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(p) => Period::parse(p).ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("Invalid period '{p}'. Use one of 1mo, 3mo, 6mo, 1y, 2y, 5y."),
            )
        })?,
        None => state.config.default_period,
    };

    Ok((company, period))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SelectionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (company, period) = resolve_selection(&state, &query)?;

    match state.dashboard(company, period).await {
        Ok(view) => Ok(Json(view)),
        Err(e) => {
            warn!(ticker = company.ticker, period = %period, error = %e, "dashboard fetch failed");
            Err(api_error(
                StatusCode::BAD_GATEWAY,
                format!("Unable to fetch stock data for {}: {e}", company.name),
            ))
        }
    }
}

// =============================================================================
// Refresh
// =============================================================================

#[derive(Serialize)]
struct RefreshResponse {
    evicted: usize,
    message: &'static str,
}

async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let evicted = state.clear_caches();
    info!(evicted, "caches cleared via API");
    Json(RefreshResponse {
        evicted,
        message: "Cache cleared; next request fetches fresh data",
    })
}
