//! Application layer for expert-panel
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::RunParams;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    document_store::{DocumentQuery, DocumentStore, StoreError},
    responder::{Reply, Responder, ResponderError},
    speaker_selection::{SelectionCapability, SelectionCapabilityError},
    transcript_sink::{ExportError, TranscriptSink, render_transcript},
    turn_hook::{HookError, TurnHook},
};
pub use use_cases::persistence::{PersistOutcome, PersistencePipeline};
pub use use_cases::run_panel::{
    RunOutcome, RunPanelError, RunPanelInput, RunPanelUseCase, RunStatus, TASK_SOURCE,
};
pub use use_cases::session_writer::{SessionWriter, WriterReport};
pub use use_cases::speaker_selector::{Selection, SelectionError, SpeakerSelector, resolve_speaker};
