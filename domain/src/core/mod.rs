//! Core domain concepts shared across all subdomains.
//!
//! - [`task::Task`]: the validated topic handed to the panel
//! - [`timestamp`]: the timestamp format used by transcripts and documents
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod task;
pub mod timestamp;
