//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use cotune_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Handler error. Wraps [`AppError`] so it can be turned into a response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status code for the wrapped error kind.
    pub fn status(&self) -> StatusCode {
        match self.0.kind {
            ErrorKind::Validation | ErrorKind::Serialization => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::PeerOffline => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal | ErrorKind::Configuration | ErrorKind::Transport => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if !self.0.kind.is_client_fault() {
            tracing::error!(error = %self.0, "Internal server error");
        }

        let body = ApiErrorResponse {
            error: self.0.kind.code().to_string(),
            message: self.0.message,
        };

        (status, Json(body)).into_response()
    }
}
