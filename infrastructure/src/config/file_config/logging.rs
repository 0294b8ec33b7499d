//! Logging and output configuration from TOML (`[logging]` and `[output]`)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for the rolling log file, JSONL event logs and transcripts
    pub directory: PathBuf,
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub level: String,
    /// Write a JSONL conversation event log per run
    pub conversation_log: bool,
    /// Write the transcript as `context_*.json` on completion
    pub export_transcript: bool,
    /// Exported transcripts kept in `directory`
    pub keep_transcripts: usize,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            level: "info".to_string(),
            conversation_log: true,
            export_transcript: true,
            keep_transcripts: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Enable colored terminal output
    pub color: bool,
    /// Show a spinner while a responder is thinking
    pub show_progress: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            show_progress: true,
        }
    }
}
