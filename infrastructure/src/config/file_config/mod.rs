//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to domain/application types
//! where they are consumed.

mod llm;
mod logging;
mod panel;
mod persistence;
mod run;

pub use llm::FileLlmConfig;
pub use logging::{FileLoggingConfig, FileOutputConfig};
pub use panel::{FilePanelConfig, FileResponderConfig, FileTerminationConfig};
pub use persistence::{FilePersistenceConfig, StoreBackend};
pub use run::FileRunConfig;

use panel_application::RunParams;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("llm.{0} is required (set it in the config file or the environment)")]
    MissingLlmSetting(&'static str),

    #[error("{0} must be greater than 0")]
    NotPositive(&'static str),

    #[error("persistence.path cannot be empty when the file store is enabled")]
    MissingStorePath,

    #[error("panel.responders: {0}")]
    InvalidRoster(String),

    #[error("panel.responders must include at least one reflection responder when reflection_agent_max_count is set")]
    MissingReflectionResponder,

    #[error("logging.level '{0}' is not one of error, warn, info, debug, trace")]
    InvalidLogLevel(String),
}

/// What the caller is about to do, which decides the required settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScope {
    /// A full panel run: LLM settings are required
    Run,
    /// Reading stored sessions only
    History,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub llm: FileLlmConfig,
    pub panel: FilePanelConfig,
    pub termination: FileTerminationConfig,
    pub run: FileRunConfig,
    pub persistence: FilePersistenceConfig,
    pub logging: FileLoggingConfig,
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the configuration for `scope`, reporting every problem found.
    pub fn validate(&self, scope: ValidationScope) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        // 1. LLM connection settings
        if scope == ValidationScope::Run {
            let required = [
                ("endpoint", &self.llm.endpoint),
                ("api_key", &self.llm.api_key),
                ("deployment_chat", &self.llm.deployment_chat),
                ("deployment_reasoning", &self.llm.deployment_reasoning),
            ];
            for (field, value) in required {
                if value.trim().is_empty() {
                    errors.push(ConfigValidationError::MissingLlmSetting(field));
                }
            }
        }

        // 2. Positive limits
        let positive = [
            ("llm.max_tokens_chat", self.llm.max_tokens_chat as u64),
            ("llm.max_tokens_reasoning", self.llm.max_tokens_reasoning as u64),
            ("llm.request_timeout_seconds", self.llm.request_timeout_seconds),
            ("termination.max_messages", self.termination.max_messages as u64),
            (
                "termination.reflection_agent_max_count",
                self.termination.reflection_agent_max_count as u64,
            ),
            ("termination.max_turns", self.termination.max_turns as u64),
            ("run.reply_timeout_seconds", self.run.reply_timeout_seconds),
            ("run.selection_timeout_seconds", self.run.selection_timeout_seconds),
            ("run.persistence_timeout_seconds", self.run.persistence_timeout_seconds),
            ("run.flush_timeout_seconds", self.run.flush_timeout_seconds),
        ];
        for (field, value) in positive {
            if value == 0 {
                errors.push(ConfigValidationError::NotPositive(field));
            }
        }

        // 3. Store
        if self.persistence.enabled
            && self.persistence.backend == StoreBackend::File
            && self.persistence.path.as_os_str().is_empty()
        {
            errors.push(ConfigValidationError::MissingStorePath);
        }

        // 4. Roster
        if scope == ValidationScope::Run {
            match self.panel.roster() {
                Ok(roster) => {
                    if roster.reflection_names().is_empty() {
                        errors.push(ConfigValidationError::MissingReflectionResponder);
                    }
                }
                Err(e) => errors.push(ConfigValidationError::InvalidRoster(e.to_string())),
            }
        }

        // 5. Log level
        let levels: HashSet<&str> = ["error", "warn", "info", "debug", "trace"].into();
        if !levels.contains(self.logging.level.to_lowercase().as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel(
                self.logging.level.clone(),
            ));
        }

        errors
    }

    pub fn run_params(&self) -> RunParams {
        RunParams {
            max_messages: self.termination.max_messages,
            reflection_max_count: self.termination.reflection_agent_max_count,
            max_turns: self.termination.max_turns,
            allow_repeated_speaker: self.termination.allow_repeated_speaker,
            affirmative_streak: self.panel.affirmative_streak,
            selection_retries: self.run.selection_retries,
            selection_timeout: Duration::from_secs(self.run.selection_timeout_seconds),
            reply_timeout: Duration::from_secs(self.run.reply_timeout_seconds),
            persistence_timeout: Duration::from_secs(self.run.persistence_timeout_seconds),
            flush_timeout: Duration::from_secs(self.run.flush_timeout_seconds),
        }
    }
}
