//! Response DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cotune_core::types::Identity;
use cotune_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub online_users: usize,
    pub connections: usize,
    pub sessions: usize,
    pub metrics: MetricsSnapshot,
}

/// Who is online and what they are playing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceResponse {
    pub online: Vec<Identity>,
    pub activities: BTreeMap<Identity, String>,
}
