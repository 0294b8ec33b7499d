//! Speaker selection use case
//!
//! Applies the eligibility pre-filter, then asks the selection capability to
//! choose among what is left and resolves its free-text reply to exactly one
//! responder name.

use crate::ports::speaker_selection::{SelectionCapability, SelectionCapabilityError};
use panel_domain::{Eligibility, EligibilityPolicy, Roster, SelectorPrompt, TranscriptEntry};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("No eligible responder")]
    NoEligible,

    #[error("Selector must name exactly one of [{eligible}], found {found} in reply {reply:?}")]
    InvalidCardinality {
        found: usize,
        eligible: String,
        reply: String,
    },

    #[error("Selection capability failed: {0}")]
    Capability(#[from] SelectionCapabilityError),

    #[error("Selection timed out after {0:?}")]
    Timeout(Duration),
}

/// A resolved selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub speaker: String,
    /// Whether the selection capability was consulted
    pub consulted: bool,
}

pub struct SpeakerSelector {
    capability: Arc<dyn SelectionCapability>,
    prompt: SelectorPrompt,
    policy: EligibilityPolicy,
    timeout: Duration,
}

impl SpeakerSelector {
    pub fn new(capability: Arc<dyn SelectionCapability>) -> Self {
        Self {
            capability,
            prompt: SelectorPrompt::default(),
            policy: EligibilityPolicy::default(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_prompt(mut self, prompt: SelectorPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_policy(mut self, policy: EligibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    /// Who may speak after `transcript`.
    pub fn eligible(&self, roster: &Roster, transcript: &[TranscriptEntry]) -> Eligibility {
        self.policy.eligible(roster, transcript)
    }

    /// Choose one name from an already computed eligible set.
    ///
    /// `history` is what the capability gets to see (the task followed by
    /// the committed turns). A single candidate is chosen without a call.
    pub async fn select_from(
        &self,
        roster: &Roster,
        eligibility: &Eligibility,
        history: &[TranscriptEntry],
    ) -> Result<Selection, SelectionError> {
        match eligibility.names.as_slice() {
            [] => Err(SelectionError::NoEligible),
            [only] => {
                debug!("Single eligible responder '{}', skipping selector", only);
                Ok(Selection {
                    speaker: only.clone(),
                    consulted: false,
                })
            }
            names => {
                let prompt = self.prompt.render(roster, names, history);
                let rendered_history = SelectorPrompt::render_history(history);
                let reply = tokio::time::timeout(
                    self.timeout,
                    self.capability.select(names, &rendered_history, &prompt),
                )
                .await
                .map_err(|_| SelectionError::Timeout(self.timeout))??;

                let speaker = resolve_speaker(&reply, names)?;
                debug!("Selector chose '{}' from {:?}", speaker, names);
                Ok(Selection {
                    speaker,
                    consulted: true,
                })
            }
        }
    }

    /// Eligibility plus selection, with `retries` extra attempts on the same
    /// eligible set.
    pub async fn select(
        &self,
        roster: &Roster,
        transcript: &[TranscriptEntry],
        history: &[TranscriptEntry],
        retries: usize,
    ) -> Result<(Selection, Eligibility), SelectionError> {
        let eligibility = self.eligible(roster, transcript);
        let mut attempt = 0;
        loop {
            match self.select_from(roster, &eligibility, history).await {
                Ok(selection) => return Ok((selection, eligibility)),
                Err(SelectionError::NoEligible) => return Err(SelectionError::NoEligible),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    warn!("Speaker selection failed (attempt {}): {}", attempt, e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn name_pattern(name: &str) -> Option<Regex> {
    let escaped = regex::escape(name);
    let word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let start = if word(name.chars().next()) { r"\b" } else { "" };
    let end = if word(name.chars().last()) { r"\b" } else { "" };
    Regex::new(&format!("(?i){start}{escaped}{end}")).ok()
}

/// Resolve a free-text selector reply to exactly one of `eligible`.
///
/// Names are matched case-insensitively on word boundaries, longest name
/// first; a matched span is blanked out so a shorter name cannot match
/// inside it. Exactly one distinct name must remain.
pub fn resolve_speaker(reply: &str, eligible: &[String]) -> Result<String, SelectionError> {
    let mut ordered: Vec<&String> = eligible.iter().collect();
    ordered.sort_by_key(|n| std::cmp::Reverse(n.chars().count()));

    let mut remaining = reply.to_string();
    let mut found: Vec<&String> = Vec::new();
    for name in ordered {
        let Some(pattern) = name_pattern(name) else {
            continue;
        };
        if pattern.is_match(&remaining) {
            found.push(name);
            remaining = pattern.replace_all(&remaining, " ").into_owned();
        }
    }

    match found.as_slice() {
        [one] => Ok((*one).clone()),
        _ => Err(SelectionError::InvalidCardinality {
            found: found.len(),
            eligible: eligible.join(", "),
            reply: reply.to_string(),
        }),
    }
}
