//! Termination conditions: stateful predicates over the turn stream.
//!
//! A [`TerminationCondition`] consumes newly committed turns (one or more per
//! call, in arrival order) and reports a [`StopSignal`] once it fires. Once
//! fired, it stays fired until [`TerminationCondition::reset`] is called.
//!
//! | Condition | Fires when |
//! |-----------|------------|
//! | [`CountTermination`] | a given responder (or anyone) has spoken `max_count` times in total |
//! | [`MaxTotalTermination`] | `max_messages` turns have been seen |
//! | [`AnyOf`] | any child fires (logical OR, first child in declaration order wins) |
//!
//! Conditions compose with `|`:
//!
//! ```
//! use panel_domain::termination::{CountTermination, MaxTotalTermination, TerminationCondition};
//! use panel_domain::TranscriptEntry;
//!
//! let mut stop = CountTermination::for_responder("reflection_agent", 3) | MaxTotalTermination::new(100);
//! assert!(stop.check(&[TranscriptEntry::text("market_analyst", "hi")]).is_none());
//! ```

mod any_of;
mod count;
mod max_total;

pub use any_of::AnyOf;
pub use count::CountTermination;
pub use max_total::MaxTotalTermination;

use crate::conversation::entities::TranscriptEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key used in [`TerminationState::counts`] when a count is not tied to one responder.
pub const ANY_RESPONDER: &str = "any";

/// Why a run stopped, as reported by a termination condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopSignal {
    /// Human-readable termination reason
    pub reason: String,
    /// Name of the condition that fired
    pub source: String,
}

impl StopSignal {
    pub fn new(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            source: source.into(),
        }
    }
}

impl std::fmt::Display for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// Snapshot of a condition's mutable state.
///
/// `counts` is keyed by responder name, or [`ANY_RESPONDER`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationState {
    pub counts: BTreeMap<String, usize>,
    pub terminated: bool,
    pub reason: Option<String>,
}

impl TerminationState {
    pub(crate) fn increment(&mut self, key: &str) -> usize {
        let count = self.counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub(crate) fn fire(&mut self, signal: &StopSignal) {
        self.terminated = true;
        self.reason = Some(signal.reason.clone());
    }

    pub(crate) fn clear(&mut self) {
        self.counts.clear();
        self.terminated = false;
        self.reason = None;
    }
}

/// A stateful stop predicate over the turn stream.
pub trait TerminationCondition: Send + std::fmt::Debug {
    /// Feed newly committed turns. Returns `Some` on the call that fires.
    ///
    /// Calling this on a condition that has already fired returns `None`
    /// without consuming the turns.
    fn check(&mut self, messages: &[TranscriptEntry]) -> Option<StopSignal>;

    /// Whether this condition has fired since the last reset
    fn terminated(&self) -> bool;

    /// Zero all counters and clear the fired flag
    fn reset(&mut self);

    /// Current counters and fired flag
    fn state(&self) -> TerminationState;
}

impl TerminationCondition for Box<dyn TerminationCondition> {
    fn check(&mut self, messages: &[TranscriptEntry]) -> Option<StopSignal> {
        (**self).check(messages)
    }

    fn terminated(&self) -> bool {
        (**self).terminated()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn state(&self) -> TerminationState {
        (**self).state()
    }
}

macro_rules! impl_or_composition {
    ($($ty:ty),*) => {
        $(
            impl<R: TerminationCondition + 'static> std::ops::BitOr<R> for $ty {
                type Output = AnyOf;

                fn bitor(self, rhs: R) -> AnyOf {
                    AnyOf::new(vec![Box::new(self), Box::new(rhs)])
                }
            }
        )*
    };
}

impl_or_composition!(CountTermination, MaxTotalTermination);

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn turn(source: &str) -> TranscriptEntry {
        TranscriptEntry::text(source, format!("{source} speaks"))
    }

    #[test]
    fn test_or_fires_on_whichever_first() {
        let mut stop = CountTermination::for_responder("R", 1) | MaxTotalTermination::new(100);

        for _ in 0..4 {
            assert!(stop.check(&[turn("A")]).is_none());
        }
        let signal = stop.check(&[turn("R")]).expect("R should stop the run");
        assert!(signal.reason.contains("'R'"));
        assert!(stop.terminated());
    }

    #[test]
    fn test_or_max_total_first() {
        let mut stop = CountTermination::for_responder("R", 1) | MaxTotalTermination::new(3);
        assert!(stop.check(&[turn("A")]).is_none());
        assert!(stop.check(&[turn("B")]).is_none());
        let signal = stop.check(&[turn("A")]).unwrap();
        assert_eq!(signal.source, "MaxTotalTermination");
    }

    #[test]
    fn test_reset_makes_both_fireable_again() {
        let mut stop = CountTermination::for_responder("R", 2) | MaxTotalTermination::new(3);
        stop.check(&[turn("R"), turn("A"), turn("B")]).unwrap();
        assert!(stop.terminated());

        stop.reset();
        assert!(!stop.terminated());
        assert!(stop.state().counts.values().all(|c| *c == 0));

        // Count fires from zero again
        assert!(stop.check(&[turn("R")]).is_none());
        let signal = stop.check(&[turn("R")]).unwrap();
        assert_eq!(signal.source, "CountTermination");

        // Max total fires from zero again
        stop.reset();
        assert!(stop.check(&[turn("A"), turn("B")]).is_none());
        let signal = stop.check(&[turn("A")]).unwrap();
        assert_eq!(signal.source, "MaxTotalTermination");
    }

    #[test]
    fn test_same_message_fires_both_reports_first_declared() {
        let mut stop = CountTermination::for_responder("R", 1) | MaxTotalTermination::new(1);
        let signal = stop.check(&[turn("R")]).unwrap();
        assert_eq!(signal.source, "CountTermination");

        let mut stop = MaxTotalTermination::new(1) | CountTermination::for_responder("R", 1);
        let signal = stop.check(&[turn("R")]).unwrap();
        assert_eq!(signal.source, "MaxTotalTermination");
    }

    #[test]
    fn test_boxed_condition_delegates() {
        let mut boxed: Box<dyn TerminationCondition> = Box::new(MaxTotalTermination::new(1));
        assert!(boxed.check(&[turn("A")]).is_some());
        assert!(boxed.terminated());
        boxed.reset();
        assert!(!boxed.terminated());
    }
}
