//! Responder port
//!
//! Defines the interface for one panel member producing its next turn.

use async_trait::async_trait;
use panel_domain::TranscriptEntry;
use thiserror::Error;

/// Errors that can occur while a responder produces a reply
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Empty reply")]
    EmptyReply,

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// What a responder produced for its turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A normal turn, appended to the transcript
    Message { content: String },
    /// The responder asks to end the run; nothing is appended
    Stop { reason: String },
}

impl Reply {
    pub fn message(content: impl Into<String>) -> Self {
        Reply::Message {
            content: content.into(),
        }
    }

    pub fn stop(reason: impl Into<String>) -> Self {
        Reply::Stop {
            reason: reason.into(),
        }
    }
}

/// A panel member that can take a turn.
///
/// Implementations (adapters) live in the infrastructure layer. `generate`
/// receives the whole conversation so far, the task first.
#[async_trait]
pub trait Responder: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn generate(&self, history: &[TranscriptEntry]) -> Result<Reply, ResponderError>;
}
