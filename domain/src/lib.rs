//! Domain layer for expert-panel
//!
//! This crate contains the core rules of a panel discussion. It has no
//! dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Panel
//!
//! A [`Roster`] of [`ResponderProfile`]s takes turns on a shared
//! [`Transcript`]. Each turn, an [`EligibilityPolicy`] decides who *may*
//! speak next; the selector then picks exactly one of them.
//!
//! ## Termination
//!
//! Runs stop when a [`TerminationCondition`] fires, typically
//! `CountTermination::for_responder(reflection, n) | MaxTotalTermination::new(max)`.
//!
//! ## Session
//!
//! A run is mirrored into a [`SessionDocument`] plus one
//! [`MessageDocument`] per turn, with statistics summarized in
//! [`SessionStats`].

pub mod conversation;
pub mod core;
pub mod panel;
pub mod prompt;
pub mod selection;
pub mod session;
pub mod stats;
pub mod termination;
pub mod util;

// Re-export commonly used types
pub use conversation::entities::{MessageKind, Transcript, TranscriptEntry};
pub use core::{error::DomainError, task::Task};
pub use panel::{
    responder::{ResponderProfile, ResponderRole},
    roster::Roster,
};
pub use prompt::PanelPrompts;
pub use selection::{
    affirmation::AffirmationDetector,
    eligibility::{Eligibility, EligibilityPolicy},
    template::{DEFAULT_SELECTOR_PROMPT, SelectorPrompt},
};
pub use session::entities::{
    MESSAGE_DOCUMENT_TYPE, MessageDocument, SESSION_DOCUMENT_TYPE, SessionDocument,
    SessionStatistics, SessionStatus, TeamInfo,
};
pub use stats::SessionStats;
pub use termination::{
    AnyOf, CountTermination, MaxTotalTermination, StopSignal, TerminationCondition,
    TerminationState,
};
