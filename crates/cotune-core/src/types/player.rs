//! Mirrored playback state payload.

use serde::{Deserialize, Serialize};

use super::track::Track;

/// Host playback state as sent to listeners.
///
/// There is no version field on the payload itself; ordering is carried by
/// the frame that wraps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Currently loaded track.
    pub song: Track,
    /// Whether the host engine is playing.
    pub is_playing: bool,
    /// Host position in seconds.
    pub current_time: f64,
}

impl PlayerState {
    /// Create a state snapshot.
    pub fn new(song: Track, is_playing: bool, current_time: f64) -> Self {
        Self {
            song,
            is_playing,
            current_time,
        }
    }
}
