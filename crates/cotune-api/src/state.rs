//! Application state shared across all handlers.

use std::sync::Arc;

use cotune_core::config::AppConfig;
use cotune_realtime::RealtimeEngine;
use cotune_realtime::connection::authenticator::{
    HandshakeAuthenticator, TrustedIdentityAuthenticator,
};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub realtime: Arc<RealtimeEngine>,
    /// Resolves the upgrade request into an identity.
    pub authenticator: Arc<dyn HandshakeAuthenticator>,
}

impl AppState {
    /// State with the default trusted-identity handshake.
    pub fn new(config: Arc<AppConfig>, realtime: Arc<RealtimeEngine>) -> Self {
        Self {
            config,
            realtime,
            authenticator: Arc::new(TrustedIdentityAuthenticator),
        }
    }

    /// Replaces the handshake authenticator.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn HandshakeAuthenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }
}
