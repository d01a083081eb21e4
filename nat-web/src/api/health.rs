//! Liveness check

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Rows in the loaded dataset
    pub articles: usize,
    /// Sessions held in memory, finished ones included
    pub active_sessions: usize,
    pub finished_sessions: usize,
    /// Sessions dropped since startup, idle or finished
    pub evicted_sessions: u64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok",
        module: "nat-web",
        version: env!("CARGO_PKG_VERSION"),
        articles: state.catalog.len(),
        active_sessions: sessions.len(),
        finished_sessions: sessions.finished_count(),
        evicted_sessions: sessions.evicted_total(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
