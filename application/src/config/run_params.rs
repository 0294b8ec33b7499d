//! Run parameters: turn loop control.
//!
//! [`RunParams`] groups the static parameters that control one panel run in
//! [`RunPanelUseCase`](crate::use_cases::run_panel::RunPanelUseCase): the
//! business termination settings, the independent hard turn cap, and the
//! per-call timeouts. These are application-layer concerns, not domain policy.

use panel_domain::{
    AnyOf, CountTermination, MaxTotalTermination, Roster, TeamInfo, TerminationCondition,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    /// Messages after which the run terminates normally.
    pub max_messages: usize,
    /// How often each reflection responder may speak before the run ends.
    pub reflection_max_count: usize,
    /// Hard cap on committed turns, checked independently of termination.
    pub max_turns: usize,
    /// Whether the previous speaker may be selected again.
    pub allow_repeated_speaker: bool,
    /// Affirmative turns in a row required before reflection may speak.
    pub affirmative_streak: usize,
    /// Extra selection attempts with the same eligible set.
    pub selection_retries: usize,
    pub selection_timeout: Duration,
    pub reply_timeout: Duration,
    pub persistence_timeout: Duration,
    /// Bounded wait for the background writer at close.
    pub flush_timeout: Duration,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            max_messages: 100,
            reflection_max_count: 3,
            max_turns: 200,
            allow_repeated_speaker: false,
            affirmative_streak: 3,
            selection_retries: 1,
            selection_timeout: Duration::from_secs(120),
            reply_timeout: Duration::from_secs(120),
            persistence_timeout: Duration::from_secs(10),
            flush_timeout: Duration::from_secs(30),
        }
    }
}

impl RunParams {
    // ==================== Builder Methods ====================

    pub fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = max;
        self
    }

    pub fn with_reflection_max_count(mut self, max: usize) -> Self {
        self.reflection_max_count = max;
        self
    }

    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    pub fn with_repeated_speaker(mut self, allow: bool) -> Self {
        self.allow_repeated_speaker = allow;
        self
    }

    pub fn with_affirmative_streak(mut self, streak: usize) -> Self {
        self.affirmative_streak = streak;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn with_selection_timeout(mut self, timeout: Duration) -> Self {
        self.selection_timeout = timeout;
        self
    }

    pub fn with_persistence_timeout(mut self, timeout: Duration) -> Self {
        self.persistence_timeout = timeout;
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    // ==================== Derived Values ====================

    /// Fresh termination condition for one run.
    ///
    /// One `CountTermination` per reflection responder, OR-ed with
    /// `MaxTotalTermination(max_messages)`.
    pub fn termination_for(&self, roster: &Roster) -> Box<dyn TerminationCondition> {
        let mut any = AnyOf::default();
        for name in roster.reflection_names() {
            any.push(Box::new(CountTermination::for_responder(
                name,
                self.reflection_max_count,
            )));
        }
        any.push(Box::new(MaxTotalTermination::new(self.max_messages)));
        Box::new(any)
    }

    pub fn team_info(&self, roster: &Roster) -> TeamInfo {
        TeamInfo {
            agent_count: roster.len(),
            agent_names: roster.names(),
            max_messages: self.max_messages,
            reflection_agent_max_count: self.reflection_max_count,
            allow_repeated_speaker: self.allow_repeated_speaker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_domain::{ResponderProfile, TranscriptEntry};

    fn roster() -> Roster {
        Roster::new(vec![
            ResponderProfile::expert("a", "A"),
            ResponderProfile::reflection("r", "R"),
        ])
        .unwrap()
    }

    #[test]
    fn test_default() {
        let params = RunParams::default();
        assert_eq!(params.max_messages, 100);
        assert_eq!(params.reflection_max_count, 3);
        assert!(params.max_turns > params.max_messages);
        assert!(!params.allow_repeated_speaker);
        assert_eq!(params.selection_retries, 1);
    }

    #[test]
    fn test_builder() {
        let params = RunParams::default()
            .with_max_messages(10)
            .with_max_turns(5)
            .with_repeated_speaker(true)
            .with_reply_timeout(Duration::from_secs(3));

        assert_eq!(params.max_messages, 10);
        assert_eq!(params.max_turns, 5);
        assert!(params.allow_repeated_speaker);
        assert_eq!(params.reply_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_termination_for_counts_reflection() {
        let params = RunParams::default().with_reflection_max_count(2);
        let mut stop = params.termination_for(&roster());
        assert!(stop.check(&[TranscriptEntry::text("r", "topics")]).is_none());
        assert!(stop.check(&[TranscriptEntry::text("a", "ok")]).is_none());
        let signal = stop.check(&[TranscriptEntry::text("r", "more")]).unwrap();
        assert!(signal.reason.contains("'r'"));
    }

    #[test]
    fn test_termination_for_without_reflection() {
        let roster = Roster::new(vec![ResponderProfile::expert("a", "A")]).unwrap();
        let mut stop = RunParams::default().with_max_messages(2).termination_for(&roster);
        assert!(stop.check(&[TranscriptEntry::text("a", "1")]).is_none());
        assert_eq!(
            stop.check(&[TranscriptEntry::text("a", "2")]).unwrap().source,
            "MaxTotalTermination"
        );
    }

    #[test]
    fn test_team_info_snapshot() {
        let info = RunParams::default().team_info(&roster());
        assert_eq!(info.agent_count, 2);
        assert_eq!(info.agent_names, vec!["a", "r"]);
        assert_eq!(info.max_messages, 100);
    }
}
