//! Speaker selection domain rules.
//!
//! - [`eligibility::EligibilityPolicy`]: hard pre-filter of who may speak next
//! - [`affirmation::AffirmationDetector`]: the streak signal that unlocks reflection
//! - [`template::SelectorPrompt`]: the `{roles}` / `{history}` instruction template

pub mod affirmation;
pub mod eligibility;
pub mod template;
