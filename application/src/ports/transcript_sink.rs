//! Transcript export port
//!
//! On normal completion the transcript is written once as a JSON array of
//! `{source, content, type, timestamp}` records, in that field order.

use panel_domain::TranscriptEntry;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait TranscriptSink: Send + Sync {
    /// Write the transcript and return where it went (e.g. a file name).
    fn export(&self, transcript: &[TranscriptEntry]) -> Result<String, ExportError>;
}

/// Render the export payload.
pub fn render_transcript(transcript: &[TranscriptEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(transcript)
}
