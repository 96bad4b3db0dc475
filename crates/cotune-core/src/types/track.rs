//! Opaque track reference passed between host and listeners.

use serde::{Deserialize, Serialize};

/// A catalog track as the client received it.
///
/// Only `audio_url`, `title` and `artist` are interpreted (source identity
/// and activity text). Every other catalog field is carried through
/// untouched in `extra` so listeners see exactly what the host sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Catalog identifier.
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    /// Track title.
    #[serde(default)]
    pub title: String,
    /// Performing artist.
    #[serde(default)]
    pub artist: String,
    /// Playable media location; two tracks are the same source when equal.
    pub audio_url: String,
    /// Length in seconds, when the catalog knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Remaining catalog fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Track {
    /// Build a track from its interpreted fields.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        audio_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            audio_url: audio_url.into(),
            duration: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Whether both tracks play the same media.
    pub fn same_source(&self, other: &Track) -> bool {
        self.audio_url == other.audio_url
    }
}
