//! Session store configuration from TOML (`[persistence]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One JSON file per document under `path`
    #[default]
    File,
    /// Process memory; lost on exit
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePersistenceConfig {
    pub enabled: bool,
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl Default for FilePersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: StoreBackend::File,
            path: PathBuf::from("data/sessions"),
        }
    }
}
