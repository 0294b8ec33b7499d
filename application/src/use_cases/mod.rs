//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod persistence;
pub mod run_panel;
pub mod session_writer;
pub mod speaker_selector;
