use super::{ANY_RESPONDER, StopSignal, TerminationCondition, TerminationState};
use crate::conversation::entities::{MessageKind, TranscriptEntry};

/// Stops once a responder has spoken `max_count` times over the whole run.
///
/// Counting is cumulative, not a consecutive streak: turns from other
/// responders in between neither reset nor decrement the counter. With no
/// target every text turn counts.
#[derive(Debug, Clone)]
pub struct CountTermination {
    target: Option<String>,
    max_count: usize,
    state: TerminationState,
}

impl CountTermination {
    pub fn new(target: Option<String>, max_count: usize) -> Self {
        Self {
            target,
            max_count,
            state: TerminationState::default(),
        }
    }

    pub fn for_responder(target: impl Into<String>, max_count: usize) -> Self {
        Self::new(Some(target.into()), max_count)
    }

    pub fn any_responder(max_count: usize) -> Self {
        Self::new(None, max_count)
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    fn key(&self) -> &str {
        self.target.as_deref().unwrap_or(ANY_RESPONDER)
    }

    fn matches(&self, entry: &TranscriptEntry) -> bool {
        entry.kind == MessageKind::TextMessage
            && self.target.as_deref().is_none_or(|t| t == entry.source)
    }
}

impl TerminationCondition for CountTermination {
    fn check(&mut self, messages: &[TranscriptEntry]) -> Option<StopSignal> {
        if self.state.terminated {
            return None;
        }

        for entry in messages {
            if !self.matches(entry) {
                continue;
            }
            let key = self.key().to_string();
            let count = self.state.increment(&key);
            if count >= self.max_count {
                let signal = StopSignal::new(
                    "CountTermination",
                    format!("Agent '{}' has been called {} time(s).", key, count),
                );
                self.state.fire(&signal);
                return Some(signal);
            }
        }

        None
    }

    fn terminated(&self) -> bool {
        self.state.terminated
    }

    fn reset(&mut self) {
        self.state.clear();
    }

    fn state(&self) -> TerminationState {
        self.state.clone()
    }
}
