//! # cotune-player
//!
//! Client side of Cotune's co-listening:
//!
//! - [`engine`]: the playback engine seam and a clock-driven engine
//! - [`player`]: the player state machine (queue, controls, roles)
//! - [`sync`]: host broadcasting and listener synchronization
//! - [`client`]: the async runtime that ties a player to a server socket

pub mod client;
pub mod engine;
pub mod player;
pub mod sync;

pub use client::{ClientCommand, ClientOptions, CotuneClient};
pub use engine::{ClockEngine, EngineEvent, PlaybackEngine};
pub use player::{Notice, Player, PlayerStatus, Reaction};
