use super::{ANY_RESPONDER, StopSignal, TerminationCondition, TerminationState};
use crate::conversation::entities::TranscriptEntry;

/// Stops once `max_messages` turns have been seen, regardless of speaker.
#[derive(Debug, Clone)]
pub struct MaxTotalTermination {
    max_messages: usize,
    state: TerminationState,
}

impl MaxTotalTermination {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages,
            state: TerminationState::default(),
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }
}

impl TerminationCondition for MaxTotalTermination {
    fn check(&mut self, messages: &[TranscriptEntry]) -> Option<StopSignal> {
        if self.state.terminated {
            return None;
        }

        for _ in messages {
            let count = self.state.increment(ANY_RESPONDER);
            if count >= self.max_messages {
                let signal = StopSignal::new(
                    "MaxTotalTermination",
                    format!(
                        "Maximum number of messages {} reached, current message count: {}",
                        self.max_messages, count
                    ),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::termination::tests::turn;

    #[test]
    fn test_fires_exactly_at_max() {
        for max in 1..=6 {
            let mut cond = MaxTotalTermination::new(max);
            for _ in 1..max {
                assert!(cond.check(&[turn("A")]).is_none());
            }
            let signal = cond.check(&[turn("B")]).unwrap();
            assert_eq!(
                signal.reason,
                format!("Maximum number of messages {max} reached, current message count: {max}")
            );
        }
    }

    #[test]
    fn test_batch_counts_every_message() {
        let mut cond = MaxTotalTermination::new(3);
        assert!(cond.check(&[turn("A"), turn("B")]).is_none());
        assert!(cond.check(&[turn("A"), turn("B")]).is_some());
        assert_eq!(cond.state().counts.get(ANY_RESPONDER), Some(&3));
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut cond = MaxTotalTermination::new(1);
        assert!(cond.check(&[]).is_none());
        assert!(!cond.terminated());
    }
}
