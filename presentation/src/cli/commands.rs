//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every turn as it happens, then the final report
    Full,
    /// Only the final report
    Summary,
    /// The final report as JSON
    Json,
}

/// CLI arguments for expert-panel
#[derive(Parser, Debug)]
#[command(name = "expert-panel")]
#[command(author, version, about = "Expert Panel - a moderated multi-expert discussion")]
#[command(long_about = r#"
Expert Panel runs a round-table discussion between LLM-backed experts.

Each turn a selector picks the next expert from those eligible, the expert
replies, and the reply is added to the shared transcript. The reflection
member only speaks after the panel has agreed several turns in a row. The
run ends when a termination condition fires, an expert replies TERMINATE,
or the hard turn cap is reached.

Configuration files are loaded from (in priority order):
1. Environment          PANEL_* or the flat AZURE_OPENAI_* names
2. --config <path>      Explicit config file
3. ./panel.toml         Project-level config
4. ~/.config/expert-panel/config.toml   Global config

Example:
  expert-panel --task "Design a habit-tracking app for students"
  expert-panel --interactive
  expert-panel --sessions 5
  expert-panel --replay session_20250101_120000_12340000
"#)]
pub struct Cli {
    /// Task for the panel (defaults to the configured or built-in task)
    #[arg(short, long, value_name = "TEXT")]
    pub task: Option<String>,

    /// Read the task from standard input
    #[arg(short, long, conflicts_with = "task")]
    pub interactive: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "full")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log level, overriding the configured one (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Check configuration, LLM clients and the session store, then exit
    #[arg(long)]
    pub health_check: bool,

    /// List the N most recent stored sessions and exit
    #[arg(long, value_name = "N")]
    pub sessions: Option<usize>,

    /// Print the stored transcript of a session and exit
    #[arg(long, value_name = "SESSION_ID")]
    pub replay: Option<String>,

    /// Show configuration file locations and the effective config, then exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// `tracing` filter directive from `-v`, `--log-level` or the configured level
    pub fn log_filter(&self, configured: &str) -> String {
        match (self.verbose, &self.log_level) {
            (0, Some(level)) => level.to_lowercase(),
            (0, None) => configured.to_lowercase(),
            (1, _) => "info".to_string(),
            (2, _) => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }

    /// Whether the command only reads stored sessions
    pub fn is_history_command(&self) -> bool {
        self.sessions.is_some() || self.replay.is_some()
    }
}
