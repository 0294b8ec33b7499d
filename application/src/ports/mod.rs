//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement.

pub mod conversation_logger;
pub mod document_store;
pub mod responder;
pub mod speaker_selection;
pub mod transcript_sink;
pub mod turn_hook;
