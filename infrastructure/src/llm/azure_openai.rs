//! Azure OpenAI chat completions over REST.

use super::error::{LlmError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One chat message in a completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// A chat completion backend
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Deployment (model) name, for logs
    fn deployment(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Client for one Azure OpenAI deployment
pub struct AzureOpenAiClient {
    client: Client,
    url: String,
    api_key: String,
    deployment: String,
    max_tokens: u32,
}

impl AzureOpenAiClient {
    pub fn new(
        endpoint: &str,
        deployment: impl Into<String>,
        api_version: &str,
        api_key: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let deployment = deployment.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;
        Ok(Self {
            client,
            url: completions_url(endpoint, &deployment, api_version),
            api_key: api_key.into(),
            deployment,
            max_tokens,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatCompletion for AzureOpenAiClient {
    fn deployment(&self) -> &str {
        &self.deployment
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatCompletionRequest {
            messages,
            max_completion_tokens: self.max_tokens,
        };

        debug!(deployment = %self.deployment, messages = messages.len(), "Chat completion request");

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, &body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        extract_content(parsed)
    }
}

/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}`
pub fn completions_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        deployment,
        api_version
    )
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [ChatMessage],
    max_completion_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_content(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(LlmError::NoContent)
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string());

    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    LlmError::Http {
        status: status.as_u16(),
        message,
        retryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url("https://res.openai.azure.com/", "gpt-4o", "2025-04-01-preview"),
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2025-04-01-preview"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let body = serde_json::to_value(ChatCompletionRequest {
            messages: &messages,
            max_completion_tokens: 500,
        })
        .unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["max_completion_tokens"], 500);
    }

    #[test]
    fn test_extract_content() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Hello"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_content(response).unwrap(), "Hello");

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_content(empty), Err(LlmError::NoContent)));
    }

    #[test]
    fn test_map_http_error() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":"429","message":"Rate limit exceeded"}}"#,
        );
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "HTTP 429: Rate limit exceeded");

        let err = map_http_error(StatusCode::UNAUTHORIZED, "denied");
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "HTTP 401: denied");
    }
}
