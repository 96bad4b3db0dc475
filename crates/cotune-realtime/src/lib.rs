//! # cotune-realtime
//!
//! Server side of Cotune's co-listening. Provides:
//!
//! - Connection registry (one tracked connection per identity, later wins)
//! - Activity directory ("now playing" text, fanned out to every peer)
//! - Listen-along session manager (host → listener connections, relay, teardown)
//! - Inbound frame dispatch and ping/pong keepalive
//!
//! All map state lives behind the owning service; callers only see the
//! operations.

pub mod connection;
pub mod metrics;
pub mod presence;
pub mod server;
pub mod session;

pub use connection::manager::ConnectionManager;
pub use connection::registry::ConnectionRegistry;
pub use presence::activity::ActivityDirectory;
pub use server::RealtimeEngine;
pub use session::manager::ListenAlongManager;
