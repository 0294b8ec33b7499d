//! Configuration file loading for expert-panel
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `PANEL_*` environment variables, then legacy flat names
//! 2. `--config <path>` specified file
//! 3. Project root: `./panel.toml` or `./.panel.toml`
//! 4. Global: `<config dir>/expert-panel/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileLlmConfig, FileLoggingConfig, FileOutputConfig,
    FilePanelConfig, FilePersistenceConfig, FileResponderConfig, FileRunConfig,
    FileTerminationConfig, StoreBackend, ValidationScope,
};
pub use loader::{ConfigLoader, legacy_env_key};
