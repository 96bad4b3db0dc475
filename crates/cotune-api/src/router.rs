//! Route definitions for the Cotune HTTP API.

use axum::Router;
use axum::routing::get;

use crate::handlers;
use crate::state::AppState;

/// Builds the router: `/api/*` endpoints plus the `/ws` upgrade.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/presence", get(handlers::presence::presence));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_upgrade))
        .with_state(state)
}
