//! Panel responders and selector backed by a chat completion client.

use super::azure_openai::{ChatCompletion, ChatMessage};
use async_trait::async_trait;
use panel_application::{
    Reply, Responder, ResponderError, SelectionCapability, SelectionCapabilityError,
};
use panel_domain::{ResponderProfile, TranscriptEntry};
use std::sync::Arc;
use tracing::debug;

/// A reply consisting only of this token ends the run.
pub const STOP_TOKEN: &str = "TERMINATE";

/// One panel member speaking through a chat deployment
pub struct LlmResponder {
    profile: ResponderProfile,
    client: Arc<dyn ChatCompletion>,
}

impl LlmResponder {
    pub fn new(profile: ResponderProfile, client: Arc<dyn ChatCompletion>) -> Self {
        Self { profile, client }
    }

    /// The chat as this responder sees it: its own turns as `assistant`,
    /// everyone else's as `user` prefixed with the speaker name.
    fn messages(&self, history: &[TranscriptEntry]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !self.profile.system_message.is_empty() {
            messages.push(ChatMessage::system(&self.profile.system_message));
        }
        for entry in history {
            if entry.source == self.profile.name {
                messages.push(ChatMessage::assistant(&entry.content));
            } else {
                messages.push(ChatMessage::user(format!(
                    "{}: {}",
                    entry.source, entry.content
                )));
            }
        }
        messages
    }
}

#[async_trait]
impl Responder for LlmResponder {
    fn name(&self) -> &str {
        &self.profile.name
    }

    fn description(&self) -> &str {
        &self.profile.description
    }

    async fn generate(&self, history: &[TranscriptEntry]) -> Result<Reply, ResponderError> {
        let content = self
            .client
            .complete(&self.messages(history))
            .await
            .map_err(|e| ResponderError::RequestFailed(e.to_string()))?;

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ResponderError::EmptyReply);
        }
        if trimmed == STOP_TOKEN {
            debug!(responder = %self.profile.name, "Stop token received");
            return Ok(Reply::stop(format!(
                "{} requested termination",
                self.profile.name
            )));
        }
        Ok(Reply::message(trimmed))
    }
}

/// Speaker selection through the reasoning deployment
pub struct LlmSpeakerSelection {
    client: Arc<dyn ChatCompletion>,
}

impl LlmSpeakerSelection {
    pub fn new(client: Arc<dyn ChatCompletion>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SelectionCapability for LlmSpeakerSelection {
    async fn select(
        &self,
        eligible: &[String],
        _history: &str,
        prompt: &str,
    ) -> Result<String, SelectionCapabilityError> {
        // The rendered prompt already embeds the history
        let messages = [
            ChatMessage::system(prompt),
            ChatMessage::user(format!(
                "Reply with exactly one name from [{}] and nothing else.",
                eligible.join(", ")
            )),
        ];
        self.client
            .complete(&messages)
            .await
            .map_err(|e| SelectionCapabilityError::RequestFailed(e.to_string()))
    }
}
