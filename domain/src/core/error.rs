//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Task cannot be empty")]
    EmptyTask,

    #[error("No responders configured for the panel")]
    EmptyRoster,

    #[error("Responder name cannot be empty")]
    EmptyResponderName,

    #[error("Duplicate responder: {0}")]
    DuplicateResponder(String),

    #[error("Unknown responder: {0}")]
    UnknownResponder(String),

    #[error("Invalid termination setting: {0}")]
    InvalidTermination(String),

    #[error("Invalid session status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },
}
