//! Turn loop timeouts from TOML (`[run]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRunConfig {
    pub reply_timeout_seconds: u64,
    pub selection_timeout_seconds: u64,
    pub persistence_timeout_seconds: u64,
    pub flush_timeout_seconds: u64,
    pub selection_retries: usize,
}

impl Default for FileRunConfig {
    fn default() -> Self {
        Self {
            reply_timeout_seconds: 120,
            selection_timeout_seconds: 120,
            persistence_timeout_seconds: 10,
            flush_timeout_seconds: 30,
            selection_retries: 1,
        }
    }
}
