//! Error type shared by every Cotune crate.
//!
//! Protocol rejections that a client should see are not returned through
//! here; the realtime layer turns them into error frames. [`AppError`]
//! covers everything that travels through `?`: bad handshakes, bad input,
//! configuration and transport failures.

use std::fmt;

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Broad failure category. Decides the HTTP status and the code string
/// shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The handshake did not carry a usable identity.
    Authentication,
    /// Malformed or out-of-range input.
    Validation,
    /// The request contradicts current state, e.g. already listening along
    /// with that host.
    Conflict,
    /// The addressed peer has no live connection.
    PeerOffline,
    Configuration,
    Serialization,
    /// Socket connect, send or receive failed.
    Transport,
    Internal,
}

impl ErrorKind {
    /// Stable upper-case code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Authentication => "AUTHENTICATION",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::PeerOffline => "PEER_OFFLINE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::Transport => "TRANSPORT",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether the caller, rather than the server, is at fault.
    pub fn is_client_fault(self) -> bool {
        matches!(
            self,
            Self::Authentication | Self::Validation | Self::Conflict | Self::PeerOffline
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Cotune's error: a kind, a message, and optionally the error that caused
/// it.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<BoxedSource>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps `source`, keeping it reachable through
    /// [`std::error::Error::source`].
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn peer_offline(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PeerOffline, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

// Sources are not `Clone`; a cloned error keeps kind and message only.
impl Clone for AppError {
    fn clone(&self) -> Self {
        Self::new(self.kind, self.message.clone())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        let message = format!("Invalid JSON: {err}");
        Self::with_source(ErrorKind::Serialization, message, err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let message = format!("I/O failure: {err}");
        Self::with_source(ErrorKind::Transport, message, err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        let message = format!("Bad configuration: {err}");
        Self::with_source(ErrorKind::Configuration, message, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::peer_offline("Host is not online.");
        assert_eq!(err.to_string(), "PEER_OFFLINE: Host is not online.");
    }

    #[test]
    fn test_clone_drops_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err = AppError::from(io);
        assert_eq!(err.kind, ErrorKind::Transport);
        assert!(err.source.is_some());
        assert!(err.clone().source.is_none());
    }

    #[test]
    fn test_client_fault_split() {
        assert!(ErrorKind::Conflict.is_client_fault());
        assert!(ErrorKind::Authentication.is_client_fault());
        assert!(!ErrorKind::Transport.is_client_fault());
        assert!(!ErrorKind::Internal.is_client_fault());
    }
}
