//! "Now playing" descriptors shown next to each online user.

use std::fmt;

use serde::{Deserialize, Serialize};

const IDLE: &str = "Idle";
const PLAYING_PREFIX: &str = "Playing ";
const BY: &str = " by ";

/// Parsed form of an activity string.
///
/// The server never parses activity; it stores and forwards whatever the
/// client sent. This type is for producers and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ActivityDescriptor {
    /// Nothing playing.
    Idle,
    /// A track is playing.
    Playing {
        /// Track title.
        title: String,
        /// Track artist.
        artist: String,
    },
    /// Text that does not follow either shape.
    Other(String),
}

impl ActivityDescriptor {
    /// Descriptor for a playing track.
    pub fn playing(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self::Playing {
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Lenient parse. The title may itself contain " by ", so the split is
    /// on the last occurrence.
    pub fn parse(raw: &str) -> Self {
        if raw == IDLE {
            return Self::Idle;
        }
        if let Some(rest) = raw.strip_prefix(PLAYING_PREFIX) {
            if let Some(idx) = rest.rfind(BY) {
                return Self::Playing {
                    title: rest[..idx].to_string(),
                    artist: rest[idx + BY.len()..].to_string(),
                };
            }
        }
        Self::Other(raw.to_string())
    }

    /// Whether the descriptor says something is playing.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing { .. })
    }
}

impl fmt::Display for ActivityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str(IDLE),
            Self::Playing { title, artist } => write!(f, "{PLAYING_PREFIX}{title}{BY}{artist}"),
            Self::Other(text) => f.write_str(text),
        }
    }
}

impl From<ActivityDescriptor> for String {
    fn from(value: ActivityDescriptor) -> Self {
        value.to_string()
    }
}

impl From<String> for ActivityDescriptor {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}
