//! Ping/pong heartbeat for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{self, Instant};

use cotune_core::config::RealtimeConfig;
use cotune_core::message::ServerMessage;

use super::handle::ConnectionHandle;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Silence after which the connection is considered dead
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_seconds),
            ping_timeout: Duration::from_secs(config.ping_timeout_seconds),
        }
    }
}

/// Run heartbeat loop for a connection.
///
/// Sends periodic pings and marks the connection dead once no pong has
/// arrived within the timeout. Marking dead wakes the socket task, which
/// then runs the normal disconnect teardown.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let start = Instant::now() + config.ping_interval;
    let mut interval = time::interval_at(start, config.ping_interval);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = handle.closed() => break,
        }

        let silent_for = Instant::now().duration_since(handle.last_pong());
        if silent_for > config.ping_timeout {
            tracing::warn!(
                conn_id = %handle.id,
                silent_ms = silent_for.as_millis() as u64,
                "Connection heartbeat timeout"
            );
            handle.mark_dead();
            break;
        }

        let ping = ServerMessage::Ping {
            timestamp: Utc::now().timestamp_millis(),
        };
        if !handle.send(ping) && !handle.is_alive() {
            tracing::debug!(conn_id = %handle.id, "Ping send failed, connection closed");
            break;
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use cotune_core::types::Identity;
    use tokio::sync::mpsc;

    fn config() -> HeartbeatConfig {
        HeartbeatConfig {
            ping_interval: Duration::from_secs(10),
            ping_timeout: Duration::from_secs(25),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pings_then_times_out_without_pong() {
        let (tx, mut rx) = mpsc::channel(16);
        let handle = Arc::new(ConnectionHandle::new(Identity::new("a"), tx));
        let task = tokio::spawn(run_heartbeat(handle.clone(), config()));

        time::sleep(Duration::from_secs(21)).await;
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Ping { .. })));
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Ping { .. })));
        assert!(handle.is_alive());

        time::sleep(Duration::from_secs(10)).await;
        task.await.unwrap();
        assert!(!handle.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_keeps_connection_alive() {
        let (tx, mut rx) = mpsc::channel(16);
        let handle = Arc::new(ConnectionHandle::new(Identity::new("a"), tx));
        let task = tokio::spawn(run_heartbeat(handle.clone(), config()));

        for _ in 0..6 {
            time::sleep(Duration::from_secs(10)).await;
            while rx.try_recv().is_ok() {}
            handle.record_pong();
        }
        assert!(handle.is_alive());

        handle.mark_dead();
        task.await.unwrap();
    }
}
