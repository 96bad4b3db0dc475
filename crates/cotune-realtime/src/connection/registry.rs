//! Connection registry: maps each identity to its current live connection.

use std::sync::Arc;

use dashmap::DashMap;

use cotune_core::types::{ConnectionId, Identity};

use super::handle::ConnectionHandle;

/// Thread-safe registry of live transports.
///
/// Every open transport is tracked by connection ID. Independently, each
/// identity maps to **at most one** connection: [`Self::register`]
/// supersedes any earlier mapping for the same identity. The superseded
/// transport stays attached (it still receives fan-out and targeted
/// frames) but is no longer what `lookup` resolves to. There is no
/// multi-device fan-out per identity.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Identity → current connection.
    by_identity: DashMap<Identity, Arc<ConnectionHandle>>,
    /// Connection ID → handle, for every open transport.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a newly opened transport.
    pub fn attach(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle);
    }

    /// Stops tracking a closed transport.
    pub fn detach(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.remove(conn_id).map(|(_, handle)| handle)
    }

    /// Binds `handle.identity` to `handle`, unconditionally replacing any
    /// prior mapping.
    ///
    /// Returns the superseded connection when a different one was mapped.
    pub fn register(&self, handle: Arc<ConnectionHandle>) -> Option<Arc<ConnectionHandle>> {
        let conn_id = handle.id;
        self.by_identity
            .insert(handle.identity.clone(), handle)
            .filter(|previous| previous.id != conn_id)
    }

    /// Resolves an identity to its current connection.
    pub fn lookup(&self, identity: &Identity) -> Option<Arc<ConnectionHandle>> {
        self.by_identity
            .get(identity)
            .map(|entry| entry.value().clone())
    }

    /// Removes the identity's mapping if it still points at `conn_id`.
    ///
    /// Returns `true` when the identity went offline. A superseded
    /// connection closing is a no-op here.
    pub fn unregister(&self, identity: &Identity, conn_id: &ConnectionId) -> bool {
        self.by_identity
            .remove_if(identity, |_, current| current.id == *conn_id)
            .is_some()
    }

    /// Gets a specific transport by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Snapshot of the online identities, sorted.
    pub fn online_set(&self) -> Vec<Identity> {
        let mut online: Vec<Identity> = self
            .by_identity
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        online.sort();
        online
    }

    /// Whether an identity currently has a connection.
    pub fn is_online(&self, identity: &Identity) -> bool {
        self.by_identity.contains_key(identity)
    }

    /// All open transports, including superseded ones.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Returns total number of open transports.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of online identities.
    pub fn online_count(&self) -> usize {
        self.by_identity.len()
    }
}
