//! Transcript export adapters.

mod transcript_file;

pub use transcript_file::FileTranscriptSink;
