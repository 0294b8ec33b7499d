//! Speaker selection port
//!
//! The opaque reasoning capability consulted when more than one responder is
//! eligible. It answers in free text; resolving that text to exactly one name
//! is done by [`SpeakerSelector`](crate::use_cases::speaker_selector::SpeakerSelector).

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelectionCapabilityError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Other error: {0}")]
    Other(String),
}

#[async_trait]
pub trait SelectionCapability: Send + Sync {
    /// Ask which of `eligible` should speak next.
    ///
    /// `history` is the rendered transcript and `prompt` the fully rendered
    /// selector instruction. Returns the raw reply text.
    async fn select(
        &self,
        eligible: &[String],
        history: &str,
        prompt: &str,
    ) -> Result<String, SelectionCapabilityError>;
}
