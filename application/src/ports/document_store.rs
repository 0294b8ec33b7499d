//! Document store port
//!
//! A generic JSON document container partitioned by session id. Session and
//! message documents share the container and are told apart by `type`.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Store closed")]
    Closed,
}

/// The query shapes the pipeline needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentQuery {
    /// Message documents of one session, ascending by `sequence`
    MessagesBySession { session_id: String },
    /// Number of message documents of one session, as a single JSON number
    CountMessages { session_id: String },
    /// Session documents, most recent `timestamp` first
    RecentSessions { limit: usize },
    /// Number of session documents, as a single JSON number
    CountSessions,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. Fails with `Conflict` if the id exists.
    async fn create(&self, document: Value) -> Result<(), StoreError>;

    /// Insert or overwrite a document by id.
    async fn upsert(&self, document: Value) -> Result<(), StoreError>;

    /// Point read by id within a partition.
    async fn read(&self, id: &str, partition_key: &str) -> Result<Value, StoreError>;

    /// Overwrite an existing document. Fails with `NotFound` if absent.
    async fn replace(&self, id: &str, partition_key: &str, document: Value)
    -> Result<(), StoreError>;

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Value>, StoreError>;

    /// Release the underlying client. Later calls fail with `Closed`.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
