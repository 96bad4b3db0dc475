//! Inbound frame validation rules.

use crate::error::AppError;

/// Error code for oversized frames.
pub const MESSAGE_TOO_LARGE: &str = "MESSAGE_TOO_LARGE";
/// Error code for blank frames.
pub const EMPTY_MESSAGE: &str = "EMPTY_MESSAGE";

/// Validates a raw inbound frame before parsing.
///
/// Returns the error code to report alongside the error.
pub fn validate_inbound(raw: &str, max_bytes: usize) -> Result<(), (&'static str, AppError)> {
    if raw.len() > max_bytes {
        return Err((
            MESSAGE_TOO_LARGE,
            AppError::validation(format!("Message exceeds maximum size of {max_bytes} bytes")),
        ));
    }

    if raw.trim().is_empty() {
        return Err((EMPTY_MESSAGE, AppError::validation("Empty message")));
    }

    Ok(())
}
