//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
    value::Uncased,
};
use std::path::{Path, PathBuf};

/// Project-level file names, first match wins
const PROJECT_FILES: [&str; 2] = ["panel.toml", ".panel.toml"];

/// Prefix for structured environment overrides (`PANEL_LLM__ENDPOINT`)
const ENV_PREFIX: &str = "PANEL_";

/// Flat environment variable names accepted for compatibility
const LEGACY_ENV: [(&str, &str); 13] = [
    ("AZURE_OPENAI_ENDPOINT", "llm.endpoint"),
    ("AZURE_OPENAI_API_KEY", "llm.api_key"),
    ("AZURE_API_VERSION", "llm.api_version"),
    ("AOAI_DEPLOYMENT_CHAT", "llm.deployment_chat"),
    ("AOAI_DEPLOYMENT_REASONING", "llm.deployment_reasoning"),
    ("MAX_TOKENS_CHAT", "llm.max_tokens_chat"),
    ("MAX_TOKENS_REASONING", "llm.max_tokens_reasoning"),
    ("MAX_MESSAGES", "termination.max_messages"),
    ("REFLECTION_AGENT_MAX_COUNT", "termination.reflection_agent_max_count"),
    ("ALLOW_REPEATED_SPEAKER", "termination.allow_repeated_speaker"),
    ("LOG_DIRECTORY", "logging.directory"),
    ("LOG_LEVEL", "logging.level"),
    ("COSMOSDB_ENABLED", "persistence.enabled"),
];

/// Map a flat legacy variable name to its dotted config key.
pub fn legacy_env_key(name: &str) -> Option<&'static str> {
    LEGACY_ENV
        .iter()
        .find(|(env, _)| env.eq_ignore_ascii_case(name))
        .map(|(_, key)| *key)
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `PANEL_*` environment variables (`__` separates sections)
    /// 2. Legacy flat variables (`AZURE_OPENAI_ENDPOINT`, `MAX_MESSAGES`, ...)
    /// 3. Explicit config path (if provided)
    /// 4. Project root: `./panel.toml` or `./.panel.toml`
    /// 5. Global: `<config dir>/expert-panel/config.toml`
    /// 6. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// Files only, no environment (for tests and `--show-config` diffs)
    pub fn load_files(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::file_figment(config_path).extract().map_err(Box::new)
    }

    fn file_figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment
    }

    fn figment(config_path: Option<&Path>) -> Figment {
        let legacy: Vec<&str> = LEGACY_ENV.iter().map(|(env, _)| *env).collect();

        Self::file_figment(config_path)
            .merge(Env::raw().only(&legacy).map(|key| {
                legacy_env_key(key.as_str())
                    .map(Uncased::from_borrowed)
                    .unwrap_or_else(|| key.into())
            }))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("expert-panel").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(config_path: Option<&Path>) {
        println!("Configuration sources (in priority order):");
        println!("  [     ] Environment: {}* and legacy flat names", ENV_PREFIX);

        if let Some(path) = config_path {
            let mark = if path.exists() { "FOUND" } else { "MISSING" };
            println!("  [{:<5}] Explicit: {}", mark, path.display());
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./panel.toml or ./.panel.toml");
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "" };
            println!("  [{:<5}] Global:  {}", mark, path.display());
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_legacy_env_key() {
        assert_eq!(legacy_env_key("AZURE_OPENAI_ENDPOINT"), Some("llm.endpoint"));
        assert_eq!(legacy_env_key("max_messages"), Some("termination.max_messages"));
        assert_eq!(legacy_env_key("COSMOSDB_ENABLED"), Some("persistence.enabled"));
        assert_eq!(legacy_env_key("HOME"), None);
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path().unwrap();
        assert!(path.to_string_lossy().contains("expert-panel"));
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[termination]
max_messages = 9

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = ConfigLoader::load_files(Some(file.path())).unwrap();
        assert_eq!(config.termination.max_messages, 9);
        assert_eq!(config.termination.reflection_agent_max_count, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[termination]\nmax_messages = \"many\"").unwrap();
        assert!(ConfigLoader::load_files(Some(file.path())).is_err());
    }

    #[test]
    fn test_env_layers_with_figment_jail() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("AZURE_OPENAI_ENDPOINT", "https://legacy.example.com");
            jail.set_env("MAX_MESSAGES", "12");
            jail.set_env("PANEL_LLM__DEPLOYMENT_CHAT", "gpt-4o");
            jail.set_env("PANEL_TERMINATION__MAX_MESSAGES", "20");

            let config = ConfigLoader::load(None).map_err(|e| *e)?;
            assert_eq!(config.llm.endpoint, "https://legacy.example.com");
            assert_eq!(config.llm.deployment_chat, "gpt-4o");
            // Prefixed names win over legacy flat names
            assert_eq!(config.termination.max_messages, 20);
            Ok(())
        });
    }
}
