//! Core type definitions used across the Cotune workspace.

pub mod activity;
pub mod id;
pub mod player;
pub mod track;

pub use activity::ActivityDescriptor;
pub use id::*;
pub use player::PlayerState;
pub use track::Track;
