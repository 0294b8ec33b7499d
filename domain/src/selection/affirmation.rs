//! Affirmation detection: does a turn agree with the discussion so far?
//!
//! The reflection responder only becomes eligible after a streak of
//! affirmative turns. The detector is a deterministic keyword match so the
//! eligibility decision is reproducible and testable.

use crate::conversation::entities::TranscriptEntry;
use serde::{Deserialize, Serialize};

/// Keyword-based classifier for affirmative turns.
///
/// A turn is affirmative when it contains any affirmative phrase and no
/// negating phrase (case-insensitive). Negations are checked first so that
/// "disagree" is never read as "agree".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffirmationDetector {
    pub affirmative: Vec<String>,
    pub negating: Vec<String>,
}

impl Default for AffirmationDetector {
    fn default() -> Self {
        Self {
            affirmative: [
                "agree",
                "agreed",
                "concur",
                "support this",
                "good idea",
                "great idea",
                "sounds good",
                "makes sense",
                "+1",
                "賛成",
                "同意",
                "いいですね",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            negating: [
                "disagree",
                "don't agree",
                "do not agree",
                "not agree",
                "cannot support",
                "concerned",
                "反対",
                "懸念",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl AffirmationDetector {
    pub fn is_affirmative(&self, content: &str) -> bool {
        let lowered = content.to_lowercase();
        if self
            .negating
            .iter()
            .any(|n| lowered.contains(&n.to_lowercase()))
        {
            return false;
        }
        self.affirmative
            .iter()
            .any(|a| lowered.contains(&a.to_lowercase()))
    }

    /// Length of the trailing run of affirmative turns.
    ///
    /// A turn from any of `breakers` (the reflection responders) ends the
    /// run, so reflection has to be re-earned after it speaks.
    pub fn trailing_streak(&self, entries: &[TranscriptEntry], breakers: &[&str]) -> usize {
        entries
            .iter()
            .rev()
            .take_while(|e| !breakers.contains(&e.source.as_str()) && self.is_affirmative(&e.content))
            .count()
    }
}
