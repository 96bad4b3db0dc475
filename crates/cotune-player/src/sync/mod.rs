//! Playback sync roles.
//!
//! A client is either the authority for its own playback ([`host`]) or a
//! mirror of someone else's ([`listener`]), never both at once.

pub mod host;
pub mod listener;

pub use host::HostBroadcaster;
pub use listener::{ListenerSync, SyncOutcome};
