//! Playback synchronization tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Host heartbeat and listener drift settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minimum spacing between position heartbeats while the host plays.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Listeners reseek only when local and host positions differ by at
    /// least this many seconds.
    #[serde(default = "default_drift_tolerance")]
    pub drift_tolerance_seconds: f64,
}

impl SyncConfig {
    /// Heartbeat interval as a [`Duration`].
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval(),
            drift_tolerance_seconds: default_drift_tolerance(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    1000
}

fn default_drift_tolerance() -> f64 {
    2.0
}
