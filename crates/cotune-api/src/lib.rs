//! # cotune-api
//!
//! HTTP layer for Cotune built on Axum.
//!
//! Serves the WebSocket upgrade that carries the co-listening protocol,
//! plus health and presence endpoints, behind CORS and request tracing.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
