//! Health check handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let snapshot = state.realtime.snapshot();

    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        online_users: snapshot.online,
        connections: snapshot.connections,
        sessions: snapshot.sessions,
        metrics: snapshot.metrics,
    }))
}
