//! Presence handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, PresenceResponse};
use crate::state::AppState;

/// GET /api/presence
pub async fn presence(State(state): State<AppState>) -> Json<ApiResponse<PresenceResponse>> {
    let realtime = &state.realtime;

    Json(ApiResponse::ok(PresenceResponse {
        online: realtime.registry.online_set(),
        activities: realtime.activities.snapshot().into_iter().collect(),
    }))
}
