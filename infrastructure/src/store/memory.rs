//! In-process document store. Contents are lost when the process exits.

use super::query::{self, document_id};
use async_trait::async_trait;
use panel_application::{DocumentQuery, DocumentStore, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Value>>,
    closed: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(&self, document: Value) -> Result<(), StoreError> {
        self.ensure_open()?;
        let id = document_id(&document)?.to_string();
        let mut documents = self.documents.write().await;
        if documents.contains_key(&id) {
            return Err(StoreError::Conflict(id));
        }
        documents.insert(id, document);
        Ok(())
    }

    async fn upsert(&self, document: Value) -> Result<(), StoreError> {
        self.ensure_open()?;
        let id = document_id(&document)?.to_string();
        self.documents.write().await.insert(id, document);
        Ok(())
    }

    async fn read(&self, id: &str, partition_key: &str) -> Result<Value, StoreError> {
        self.ensure_open()?;
        self.documents
            .read()
            .await
            .get(id)
            .filter(|d| d["session_id"].as_str() == Some(partition_key))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn replace(
        &self,
        id: &str,
        partition_key: &str,
        document: Value,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut documents = self.documents.write().await;
        match documents.get_mut(id) {
            Some(slot) if slot["session_id"].as_str() == Some(partition_key) => {
                *slot = document;
                Ok(())
            }
            _ => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Value>, StoreError> {
        self.ensure_open()?;
        let documents = self.documents.read().await;
        Ok(query::evaluate(&query, documents.values()))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
