//! Handshake authentication: resolves the upgrade request into an identity.

use async_trait::async_trait;
use serde::Deserialize;

use cotune_core::error::AppError;
use cotune_core::types::Identity;

/// Handshake parameters carried on the WebSocket upgrade request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandshakeParams {
    /// Identity issued by the identity layer.
    pub user_id: Option<String>,
}

/// Resolves handshake parameters into an authenticated identity.
///
/// Identity issuance lives outside Cotune; implementations plug the real
/// identity provider in here.
#[async_trait]
pub trait HandshakeAuthenticator: Send + Sync + std::fmt::Debug {
    /// Authenticates a connection attempt.
    async fn authenticate(&self, params: &HandshakeParams) -> Result<Identity, AppError>;
}

/// Accepts the identity the client presents, as long as it is non-empty.
///
/// Suitable when an upstream proxy has already authenticated the user.
#[derive(Debug, Clone, Default)]
pub struct TrustedIdentityAuthenticator;

#[async_trait]
impl HandshakeAuthenticator for TrustedIdentityAuthenticator {
    async fn authenticate(&self, params: &HandshakeParams) -> Result<Identity, AppError> {
        let identity = params
            .user_id
            .as_deref()
            .map(Identity::new)
            .filter(|identity| !identity.is_empty())
            .ok_or_else(|| AppError::authentication("Missing user_id in handshake"))?;
        Ok(identity)
    }
}
