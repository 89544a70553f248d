// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Read-only views of the latest snapshot plus a forced-refresh trigger.
// No authentication.  CORS is permissive so the dashboard can be hosted
// anywhere.
//
//   GET  /              dashboard page
//   GET  /health        liveness
//   GET  /api/data      latest snapshot ({"status":"loading"} before the first)
//   GET  /api/history   rolling score history
//   GET  /api/status    per-source status with freshness
//   GET|POST /api/refresh   start a cycle now (409 if one is running)
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;

const DASHBOARD_HTML: &str = include_str!("../../static/dashboard.html");

// =============================================================================
// Router construction
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/api/data", get(latest_data))
        .route("/api/history", get(history))
        .route("/api/status", get(data_status))
        .route("/api/refresh", get(refresh).post(refresh))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    state_version: u64,
    uptime_secs: u64,
    refreshing: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        state_version: state.current_state_version(),
        uptime_secs: state.uptime_secs(),
        refreshing: state.pipeline.is_running(),
    })
}

async fn latest_data(State(state): State<Arc<AppState>>) -> Response {
    match state.latest() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => Json(json!({ "status": "loading" })).into_response(),
    }
}

async fn history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.history())
}

async fn data_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.status_view(Utc::now()))
}

async fn refresh(State(state): State<Arc<AppState>>) -> Response {
    let Some(guard) = state.pipeline.try_begin() else {
        warn!("refresh requested while a cycle is running");
        return (StatusCode::CONFLICT, Json(json!({ "status": "busy" }))).into_response();
    };

    info!("manual refresh triggered");
    let task_state = Arc::clone(&state);
    tokio::spawn(async move {
        task_state.refresh_with(guard).await;
    });

    Json(json!({ "status": "refreshing" })).into_response()
}
