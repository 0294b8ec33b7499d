//! Azure OpenAI configuration from TOML (`[llm]` section)

use serde::{Deserialize, Serialize};

/// Two deployments are used: `chat` for responders, `reasoning` for the
/// speaker selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLlmConfig {
    /// `https://<resource>.openai.azure.com`
    pub endpoint: String,
    /// Prefer the `AZURE_OPENAI_API_KEY` environment variable over the file.
    pub api_key: String,
    pub api_version: String,
    pub deployment_chat: String,
    pub deployment_reasoning: String,
    pub max_tokens_chat: u32,
    pub max_tokens_reasoning: u32,
    /// HTTP request timeout for one completion call
    pub request_timeout_seconds: u64,
}

impl Default for FileLlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: "2025-04-01-preview".to_string(),
            deployment_chat: String::new(),
            deployment_reasoning: String::new(),
            max_tokens_chat: 500,
            max_tokens_reasoning: 2000,
            request_timeout_seconds: 120,
        }
    }
}

impl FileLlmConfig {
    /// API key with all but the last four characters masked
    pub fn masked_api_key(&self) -> String {
        let n = self.api_key.chars().count();
        if n <= 4 {
            return "*".repeat(n);
        }
        let tail: String = self.api_key.chars().skip(n - 4).collect();
        format!("****{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileLlmConfig::default();
        assert_eq!(config.max_tokens_chat, 500);
        assert_eq!(config.max_tokens_reasoning, 2000);
        assert_eq!(config.api_version, "2025-04-01-preview");
    }

    #[test]
    fn test_masked_api_key() {
        let mut config = FileLlmConfig::default();
        assert_eq!(config.masked_api_key(), "");
        config.api_key = "abc".into();
        assert_eq!(config.masked_api_key(), "***");
        config.api_key = "secret-key-1234".into();
        assert_eq!(config.masked_api_key(), "****1234");
    }
}
