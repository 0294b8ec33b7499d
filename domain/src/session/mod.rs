//! Persisted session domain.
//!
//! - [`entities::SessionDocument`]: durable summary of one run (status, running statistics)
//! - [`entities::MessageDocument`]: one persisted turn with its sequence number
//! - [`ids`]: session and message id generation

pub mod entities;
pub mod ids;
