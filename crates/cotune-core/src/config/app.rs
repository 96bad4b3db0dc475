//! `[server]` section: bind address, shutdown and CORS.

use serde::{Deserialize, Serialize};

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long shutdown waits for open sockets to finish their teardown.
    pub shutdown_grace_seconds: u64,
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_grace_seconds: 10,
            cors: CorsConfig::default(),
        }
    }
}

/// Browser clients connect from their own origin, so the upgrade and the
/// read-only API need CORS. `"*"` in any list means "anything".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    /// Preflight cache lifetime.
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["*".to_string()],
            max_age_seconds: 3600,
        }
    }
}
