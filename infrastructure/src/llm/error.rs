//! Error types for the Azure OpenAI adapter

use thiserror::Error;

/// Result type alias for LLM client operations
pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Response contained no content")]
    NoContent,

    #[error("Client configuration error: {0}")]
    Config(String),

    #[error("Client registry is closed")]
    Closed,
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Http { retryable: true, .. })
    }
}
