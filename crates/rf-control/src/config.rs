//! Server configuration

use rf_protocol::{DEFAULT_MAX_FRAME_LEN, DEFAULT_PORT};
use serde::{Deserialize, Serialize};

/// Control server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen_addr: String,
    /// Maximum number of requests handled at once across all connections
    pub max_workers: usize,
    /// Maximum request frame length in bytes
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("[::]:{}", DEFAULT_PORT),
            max_workers: 10,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}
