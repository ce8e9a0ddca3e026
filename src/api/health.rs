use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::matchmaker::StatsSnapshot;
use crate::state::AppState;

/// Health response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub matchmaking: StatsSnapshot,
    pub timestamp: String,
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let matchmaking = state.matchmaker.stats_snapshot()?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        matchmaking,
        timestamp: Utc::now().to_rfc3339(),
    }))
}
