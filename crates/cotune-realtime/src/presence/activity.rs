//! Activity directory: free-form "now playing" text per identity.

use dashmap::DashMap;

use cotune_core::message::ServerMessage;
use cotune_core::types::{ActivityDescriptor, Identity};

/// Tracks the latest activity descriptor for each online identity.
///
/// Activity is display text, ephemeral and best-effort: it is never
/// validated, a lost update is corrected by the next one, and the entry
/// disappears with the identity's connection.
#[derive(Debug, Default)]
pub struct ActivityDirectory {
    /// Identity → descriptor
    activities: DashMap<Identity, String>,
}

impl ActivityDirectory {
    /// Create a new activity directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite an identity's activity.
    ///
    /// Returns the `activity_updated` frame to fan out to every connection.
    pub fn set_activity(&self, identity: Identity, descriptor: String) -> ServerMessage {
        self.activities.insert(identity.clone(), descriptor.clone());
        ServerMessage::ActivityUpdated {
            user_id: identity,
            activity: descriptor,
        }
    }

    /// Reset an identity to `Idle`.
    pub fn set_idle(&self, identity: Identity) -> ServerMessage {
        self.set_activity(identity, ActivityDescriptor::Idle.to_string())
    }

    /// Get an identity's activity
    pub fn get(&self, identity: &Identity) -> Option<String> {
        self.activities.get(identity).map(|r| r.value().clone())
    }

    /// Remove an identity (on disconnect)
    pub fn remove(&self, identity: &Identity) -> Option<String> {
        self.activities.remove(identity).map(|(_, descriptor)| descriptor)
    }

    /// All `(identity, descriptor)` pairs, sorted by identity.
    pub fn snapshot(&self) -> Vec<(Identity, String)> {
        let mut all: Vec<(Identity, String)> = self
            .activities
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Number of identities with an activity.
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    /// Whether no activity is recorded.
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}
