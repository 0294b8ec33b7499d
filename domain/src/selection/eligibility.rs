//! Eligibility policy: which responders may speak next.
//!
//! Rules, applied as a hard pre-filter before any selection reasoning:
//!
//! 1. When repeated speakers are disallowed, the previous speaker is removed.
//! 2. Reflection responders are removed unless the trailing affirmative
//!    streak has reached `affirmative_streak`.
//!
//! If rule 1 empties the set it is relaxed. Rule 2 is never relaxed.

use super::affirmation::AffirmationDetector;
use crate::conversation::entities::TranscriptEntry;
use crate::panel::roster::Roster;
use serde::{Deserialize, Serialize};

/// Result of applying the eligibility rules to a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    /// Eligible responder names, in roster order
    pub names: Vec<String>,
    /// Current trailing affirmative streak
    pub streak: usize,
    /// Whether the reflection responders passed the streak gate
    pub reflection_unlocked: bool,
    /// Whether the repeated-speaker exclusion had to be relaxed
    pub relaxed_repeat: bool,
}

impl Eligibility {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    pub allow_repeated_speaker: bool,
    /// Affirmative turns in a row required before reflection may speak
    pub affirmative_streak: usize,
    #[serde(default)]
    pub detector: AffirmationDetector,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            allow_repeated_speaker: false,
            affirmative_streak: 3,
            detector: AffirmationDetector::default(),
        }
    }
}

impl EligibilityPolicy {
    pub fn with_repeated_speaker(mut self, allow: bool) -> Self {
        self.allow_repeated_speaker = allow;
        self
    }

    pub fn with_affirmative_streak(mut self, streak: usize) -> Self {
        self.affirmative_streak = streak;
        self
    }

    pub fn eligible(&self, roster: &Roster, transcript: &[TranscriptEntry]) -> Eligibility {
        let reflection = roster.reflection_names();
        let streak = self.detector.trailing_streak(transcript, &reflection);
        let reflection_unlocked = streak >= self.affirmative_streak;

        let gated: Vec<&str> = roster
            .members()
            .iter()
            .filter(|m| !m.is_reflection() || reflection_unlocked)
            .map(|m| m.name.as_str())
            .collect();

        let last = transcript.last().map(|e| e.source.as_str());
        let mut relaxed_repeat = false;
        let names: Vec<String> = match last {
            Some(previous) if !self.allow_repeated_speaker => {
                let without: Vec<&str> = gated.iter().copied().filter(|n| *n != previous).collect();
                if without.is_empty() && !gated.is_empty() {
                    relaxed_repeat = true;
                    gated.iter().map(|n| n.to_string()).collect()
                } else {
                    without.into_iter().map(str::to_string).collect()
                }
            }
            _ => gated.iter().map(|n| n.to_string()).collect(),
        };

        Eligibility {
            names,
            streak,
            reflection_unlocked,
            relaxed_repeat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::responder::ResponderProfile;

    fn roster(names: &[&str], reflection: &str) -> Roster {
        let mut members: Vec<_> = names
            .iter()
            .map(|n| ResponderProfile::expert(*n, format!("{n} expert")))
            .collect();
        members.push(ResponderProfile::reflection(reflection, "reflects"));
        Roster::new(members).unwrap()
    }

    fn said(source: &str, content: &str) -> TranscriptEntry {
        TranscriptEntry::text(source, content)
    }

    /// All permutations of `items` (small inputs only)
    fn permutations(items: &[&'static str]) -> Vec<Vec<&'static str>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn test_reflection_excluded_without_streak_for_all_permutations() {
        let policy = EligibilityPolicy::default().with_repeated_speaker(true);
        let transcripts = [
            vec![],
            vec![said("a", "I agree"), said("b", "I agree")],
            vec![said("a", "I agree"), said("b", "no"), said("c", "agreed"), said("a", "+1")],
        ];

        for order in permutations(&["a", "b", "c", "r"]) {
            let members = order
                .iter()
                .map(|n| {
                    if *n == "r" {
                        ResponderProfile::reflection(*n, "reflects")
                    } else {
                        ResponderProfile::expert(*n, "expert")
                    }
                })
                .collect();
            let roster = Roster::new(members).unwrap();
            for t in &transcripts {
                let eligible = policy.eligible(&roster, t);
                assert!(!eligible.reflection_unlocked);
                assert!(!eligible.names.iter().any(|n| n == "r"), "order {order:?}");
                assert_eq!(eligible.names.len(), 3);
            }
        }
    }

    #[test]
    fn test_reflection_unlocked_after_three_affirmations() {
        let policy = EligibilityPolicy::default();
        let roster = roster(&["a", "b", "c"], "r");
        let t = vec![said("a", "idea"), said("b", "I agree"), said("c", "agreed"), said("a", "+1")];

        let eligible = policy.eligible(&roster, &t);
        assert!(eligible.reflection_unlocked);
        assert_eq!(eligible.streak, 3);
        assert_eq!(eligible.names, vec!["b", "c", "r"]);
    }

    #[test]
    fn test_previous_speaker_excluded() {
        let policy = EligibilityPolicy::default();
        let roster = roster(&["a", "b"], "r");
        let eligible = policy.eligible(&roster, &[said("a", "idea")]);
        assert_eq!(eligible.names, vec!["b"]);

        let repeat = policy.clone().with_repeated_speaker(true);
        let eligible = repeat.eligible(&roster, &[said("a", "idea")]);
        assert_eq!(eligible.names, vec!["a", "b"]);
    }

    #[test]
    fn test_repeat_rule_relaxed_when_only_one_left() {
        let policy = EligibilityPolicy::default();
        let roster = roster(&["solo"], "r");
        let eligible = policy.eligible(&roster, &[said("solo", "idea")]);
        assert_eq!(eligible.names, vec!["solo"]);
        assert!(eligible.relaxed_repeat);
    }

    #[test]
    fn test_empty_transcript_all_experts() {
        let policy = EligibilityPolicy::default();
        let roster = roster(&["a", "b"], "r");
        let eligible = policy.eligible(&roster, &[]);
        assert_eq!(eligible.names, vec!["a", "b"]);
        assert_eq!(eligible.streak, 0);
    }
}
