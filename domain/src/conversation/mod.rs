//! Conversation domain.
//!
//! - [`entities::TranscriptEntry`]: a single committed turn
//! - [`entities::Transcript`]: the ordered, append-only turn list of a run

pub mod entities;
