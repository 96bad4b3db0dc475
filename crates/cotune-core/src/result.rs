//! Convenience result type alias for Cotune.

use crate::error::AppError;

/// A specialized `Result` type for Cotune operations.
pub type AppResult<T> = Result<T, AppError>;
