//! Configuration for the sync engine components

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the local store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the database file
    pub db_path: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Whether to enable WAL mode
    pub enable_wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "assess_local.db".to_string(),
            max_connections: 5,
            enable_wal: true,
        }
    }
}

/// Configuration for the HTTP remote service client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Server base URL
    pub base_url: String,
    /// Bearer token for the current session, if any
    pub auth_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

/// Configuration for the sync orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Seconds between periodic full sync passes while started
    pub sync_interval_secs: u64,
}

impl OrchestratorConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: 30,
        }
    }
}
