//! WebSocket connection management: handles, registry, dispatch, keepalive, handshake.

pub mod authenticator;
pub mod handle;
pub mod heartbeat;
pub mod manager;
pub mod registry;

pub use handle::ConnectionHandle;
pub use manager::ConnectionManager;
pub use registry::ConnectionRegistry;
