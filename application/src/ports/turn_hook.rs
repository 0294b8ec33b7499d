//! Turn observation port
//!
//! Hooks are invoked synchronously from the turn loop. A hook that returns
//! an error or panics is logged and skipped; it never affects the run.

use crate::use_cases::run_panel::RunOutcome;
use panel_domain::TranscriptEntry;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("{0}")]
pub struct HookError(pub String);

pub trait TurnHook: Send + Sync {
    /// Called after a turn is committed. `turn` is 1-based.
    fn on_message(&self, entry: &TranscriptEntry, turn: usize) -> Result<(), HookError>;

    /// Called once a speaker is chosen, before its reply is requested.
    fn on_speaker_selected(&self, _speaker: &str, _eligible: &[String]) {}

    /// Called once, after the session is closed.
    fn on_run_finished(&self, _outcome: &RunOutcome) {}
}
