use super::{StopSignal, TerminationCondition, TerminationState};
use crate::conversation::entities::TranscriptEntry;

/// Logical OR over child conditions.
///
/// Every child sees every turn exactly once, even on the call where an
/// earlier child fires, so counters stay consistent across children. When
/// several children fire on the same call the first one in declaration order
/// provides the reason.
#[derive(Debug, Default)]
pub struct AnyOf {
    children: Vec<Box<dyn TerminationCondition>>,
    fired: Option<StopSignal>,
}

impl AnyOf {
    pub fn new(children: Vec<Box<dyn TerminationCondition>>) -> Self {
        Self {
            children,
            fired: None,
        }
    }

    pub fn push(&mut self, child: Box<dyn TerminationCondition>) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl TerminationCondition for AnyOf {
    fn check(&mut self, messages: &[TranscriptEntry]) -> Option<StopSignal> {
        if self.fired.is_some() {
            return None;
        }

        let mut first = None;
        for child in &mut self.children {
            if let Some(signal) = child.check(messages)
                && first.is_none()
            {
                first = Some(signal);
            }
        }

        if let Some(signal) = &first {
            self.fired = Some(signal.clone());
        }
        first
    }

    fn terminated(&self) -> bool {
        self.fired.is_some()
    }

    fn reset(&mut self) {
        self.fired = None;
        for child in &mut self.children {
            child.reset();
        }
    }

    fn state(&self) -> TerminationState {
        let mut merged = TerminationState::default();
        for child in &self.children {
            for (key, count) in child.state().counts {
                let entry = merged.counts.entry(key).or_insert(0);
                *entry = (*entry).max(count);
            }
        }
        merged.terminated = self.fired.is_some();
        merged.reason = self.fired.as_ref().map(|s| s.reason.clone());
        merged
    }
}

impl<R: TerminationCondition + 'static> std::ops::BitOr<R> for AnyOf {
    type Output = AnyOf;

    fn bitor(mut self, rhs: R) -> AnyOf {
        self.push(Box::new(rhs));
        self
    }
}
