//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    messages_received: AtomicU64,
    messages_sent: AtomicU64,
    sessions_started: AtomicU64,
    sync_requests: AtomicU64,
    state_updates_relayed: AtomicU64,
    hosts_torn_down: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a disconnection
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a frame received from a client
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frames queued to clients
    pub fn messages_sent(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Record an accepted listen-along start
    pub fn session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request-sync sent to a host
    pub fn sync_requested(&self) {
        self.sync_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record state frames relayed to listeners
    pub fn state_relayed(&self, count: u64) {
        self.state_updates_relayed.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a host session destroyed by disconnect
    pub fn host_torn_down(&self) {
        self.hosts_torn_down.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sync_requests: self.sync_requests.load(Ordering::Relaxed),
            state_updates_relayed: self.state_updates_relayed.load(Ordering::Relaxed),
            hosts_torn_down: self.hosts_torn_down.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever opened
    pub connections_total: u64,
    /// Currently open connections
    pub connections_active: u64,
    /// Frames received from clients
    pub messages_received: u64,
    /// Frames queued to clients
    pub messages_sent: u64,
    /// Accepted listen-along starts
    pub sessions_started: u64,
    /// Request-sync frames sent to hosts
    pub sync_requests: u64,
    /// Sync/update frames relayed to listeners
    pub state_updates_relayed: u64,
    /// Host sessions destroyed by disconnect
    pub hosts_torn_down: u64,
}
