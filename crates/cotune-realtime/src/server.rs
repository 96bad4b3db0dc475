//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use cotune_core::config::RealtimeConfig;

use crate::connection::manager::ConnectionManager;
use crate::connection::registry::ConnectionRegistry;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::presence::activity::ActivityDirectory;
use crate::session::manager::ListenAlongManager;

/// Central real-time engine that coordinates the co-listening subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Identity → current connection.
    pub registry: Arc<ConnectionRegistry>,
    /// "Now playing" directory.
    pub activities: Arc<ActivityDirectory>,
    /// Listen-along sessions.
    pub sessions: Arc<ListenAlongManager>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

/// Point-in-time view of the engine for the presence endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub connections: usize,
    pub online: usize,
    pub sessions: usize,
    pub activities: usize,
    pub metrics: MetricsSnapshot,
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(config: RealtimeConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(RealtimeMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let activities = Arc::new(ActivityDirectory::new());
        let sessions = Arc::new(ListenAlongManager::new(registry.clone(), metrics.clone()));
        let connections = Arc::new(ConnectionManager::new(
            config,
            registry.clone(),
            activities.clone(),
            sessions.clone(),
            metrics.clone(),
        ));

        info!("Real-time engine initialized");

        Self {
            connections,
            registry,
            activities,
            sessions,
            metrics,
            shutdown_tx,
        }
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signals socket tasks to stop and closes every connection.
    pub fn shutdown(&self) {
        info!("Shutting down real-time engine");
        let _ = self.shutdown_tx.send(());
        self.connections.close_all();
        info!("Real-time engine shut down");
    }

    /// Counts for the presence endpoint.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            connections: self.registry.connection_count(),
            online: self.registry.online_count(),
            sessions: self.sessions.session_count(),
            activities: self.activities.len(),
            metrics: self.metrics.snapshot(),
        }
    }
}
