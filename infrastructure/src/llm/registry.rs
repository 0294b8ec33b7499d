//! Lazily built, shared LLM clients.
//!
//! The registry owns one client per deployment role. Clients are built on
//! first use, reused by every run in the process, and released by [`close`].
//!
//! [`close`]: ClientRegistry::close

use super::azure_openai::{AzureOpenAiClient, ChatCompletion};
use super::error::{LlmError, Result};
use crate::config::FileLlmConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRole {
    /// Responder turns
    Chat,
    /// Speaker selection
    Reasoning,
}

pub struct ClientRegistry {
    config: FileLlmConfig,
    chat: OnceCell<Arc<dyn ChatCompletion>>,
    reasoning: OnceCell<Arc<dyn ChatCompletion>>,
    closed: AtomicBool,
}

impl ClientRegistry {
    pub fn new(config: FileLlmConfig) -> Self {
        Self {
            config,
            chat: OnceCell::new(),
            reasoning: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Registry with prebuilt clients (tests, alternative backends)
    pub fn with_clients(
        chat: Arc<dyn ChatCompletion>,
        reasoning: Arc<dyn ChatCompletion>,
    ) -> Self {
        let registry = Self::new(FileLlmConfig::default());
        // Fresh cells cannot already be set
        let _ = registry.chat.set(chat);
        let _ = registry.reasoning.set(reasoning);
        registry
    }

    fn build(&self, role: ClientRole) -> Result<Arc<dyn ChatCompletion>> {
        let (deployment, max_tokens) = match role {
            ClientRole::Chat => (&self.config.deployment_chat, self.config.max_tokens_chat),
            ClientRole::Reasoning => (
                &self.config.deployment_reasoning,
                self.config.max_tokens_reasoning,
            ),
        };
        if self.config.endpoint.is_empty() || deployment.is_empty() {
            return Err(LlmError::Config(format!(
                "endpoint and deployment are required for the {:?} client",
                role
            )));
        }
        let client = AzureOpenAiClient::new(
            &self.config.endpoint,
            deployment.clone(),
            &self.config.api_version,
            self.config.api_key.clone(),
            max_tokens,
            Duration::from_secs(self.config.request_timeout_seconds),
        )?;
        info!(deployment = %deployment, "Created {:?} client", role);
        Ok(Arc::new(client))
    }

    /// The client for `role`, built on first call.
    pub async fn client(&self, role: ClientRole) -> Result<Arc<dyn ChatCompletion>> {
        if self.is_closed() {
            return Err(LlmError::Closed);
        }
        let cell = match role {
            ClientRole::Chat => &self.chat,
            ClientRole::Reasoning => &self.reasoning,
        };
        cell.get_or_try_init(|| async { self.build(role) })
            .await
            .cloned()
    }

    pub async fn chat(&self) -> Result<Arc<dyn ChatCompletion>> {
        self.client(ClientRole::Chat).await
    }

    pub async fn reasoning(&self) -> Result<Arc<dyn ChatCompletion>> {
        self.client(ClientRole::Reasoning).await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release the clients. Further requests fail with [`LlmError::Closed`].
    ///
    /// Clients already handed out stay usable until dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("LLM client registry closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FileLlmConfig {
        FileLlmConfig {
            endpoint: "https://res.openai.azure.com".into(),
            api_key: "key".into(),
            deployment_chat: "gpt-4o".into(),
            deployment_reasoning: "o3-mini".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_clients_are_built_once() {
        let registry = ClientRegistry::new(config());
        let first = registry.chat().await.unwrap();
        let second = registry.chat().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.deployment(), "gpt-4o");
        assert_eq!(registry.reasoning().await.unwrap().deployment(), "o3-mini");
    }

    #[tokio::test]
    async fn test_missing_deployment_is_config_error() {
        let registry = ClientRegistry::new(FileLlmConfig {
            deployment_reasoning: String::new(),
            ..config()
        });
        assert!(registry.chat().await.is_ok());
        assert!(matches!(registry.reasoning().await, Err(LlmError::Config(_))));
    }

    #[tokio::test]
    async fn test_closed_registry_refuses() {
        let registry = ClientRegistry::new(config());
        registry.close();
        registry.close();
        assert!(registry.is_closed());
        assert!(matches!(registry.chat().await, Err(LlmError::Closed)));
    }
}
