//! Persistence pipeline
//!
//! Session and message document lifecycle against a [`DocumentStore`].
//!
//! Every operation returns a [`PersistOutcome`] and never raises: a disabled
//! store, a store error, or a timeout all yield `NotPersisted`, are logged,
//! and bump a failure counter kept for diagnostics.
//!
//! `append_message` assigns `sequence = count + 1` from the store and
//! `update_statistics` is a read-modify-write of the session document. Both
//! assume a single writer per session; [`SessionWriter`] provides that.
//!
//! [`SessionWriter`]: super::session_writer::SessionWriter

use crate::config::RunParams;
use crate::ports::document_store::{DocumentQuery, DocumentStore, StoreError};
use chrono::Local;
use panel_domain::session::ids;
use panel_domain::{
    MessageDocument, SessionDocument, SessionStatistics, SessionStats, TeamInfo, TranscriptEntry,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of a best-effort persistence call
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome<T> {
    Persisted(T),
    NotPersisted,
}

impl<T> PersistOutcome<T> {
    pub fn is_persisted(&self) -> bool {
        matches!(self, PersistOutcome::Persisted(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            PersistOutcome::Persisted(value) => Some(value),
            PersistOutcome::NotPersisted => None,
        }
    }
}

pub struct PersistencePipeline {
    store: Option<Arc<dyn DocumentStore>>,
    timeout: Duration,
    failures: AtomicU64,
}

impl PersistencePipeline {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self {
            store: Some(store),
            timeout,
            failures: AtomicU64::new(0),
        }
    }

    /// A pipeline that persists nothing. Calls return `NotPersisted` without
    /// counting failures.
    pub fn disabled() -> Self {
        Self {
            store: None,
            timeout: Duration::from_secs(1),
            failures: AtomicU64::new(0),
        }
    }

    /// Pipeline for a run: bounded by `params.persistence_timeout`, disabled
    /// when there is no store.
    pub fn for_run(store: Option<Arc<dyn DocumentStore>>, params: &RunParams) -> Self {
        match store {
            Some(store) => Self::new(store, params.persistence_timeout),
            None => Self::disabled(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Number of failed or timed-out store calls so far
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, f: F) -> PersistOutcome<T>
    where
        F: FnOnce(Arc<dyn DocumentStore>) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let Some(store) = self.store.clone() else {
            return PersistOutcome::NotPersisted;
        };

        match tokio::time::timeout(self.timeout, f(store)).await {
            Ok(Ok(value)) => PersistOutcome::Persisted(value),
            Ok(Err(e)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!("Persistence '{}' failed: {}", operation, e);
                PersistOutcome::NotPersisted
            }
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Persistence '{}' timed out after {:?}",
                    operation, self.timeout
                );
                PersistOutcome::NotPersisted
            }
        }
    }

    // ==================== Write Side ====================

    /// Create a running session document and return its id.
    pub async fn create_session(&self, task: &str, team_info: TeamInfo) -> PersistOutcome<String> {
        let now = Local::now();
        let session_id = ids::session_id(now);
        let document = SessionDocument::open(session_id.clone(), task, team_info, now);

        let outcome = self
            .call("create_session", |store| async move {
                store.create(to_value(&document)?).await
            })
            .await;

        match outcome {
            PersistOutcome::Persisted(()) => {
                info!(session_id = %session_id, "Session created");
                PersistOutcome::Persisted(session_id)
            }
            PersistOutcome::NotPersisted => PersistOutcome::NotPersisted,
        }
    }

    /// Append one turn and return its sequence number.
    pub async fn append_message(
        &self,
        session_id: &str,
        entry: &TranscriptEntry,
    ) -> PersistOutcome<u64> {
        self.call("append_message", |store| async move {
            let counted = store
                .query(DocumentQuery::CountMessages {
                    session_id: session_id.to_string(),
                })
                .await?;
            let sequence = first_count(&counted) + 1;
            let document = MessageDocument::new(session_id, sequence, entry, Local::now());
            store.upsert(to_value(&document)?).await?;
            debug!(session_id, sequence, source = %entry.source, "Message persisted");
            Ok(sequence)
        })
        .await
    }

    /// Increment the running counters on the session document.
    pub async fn update_statistics(
        &self,
        session_id: &str,
        responder: &str,
    ) -> PersistOutcome<SessionStatistics> {
        self.call("update_statistics", |store| async move {
            let mut document: SessionDocument =
                from_value(store.read(session_id, session_id).await?)?;
            document.record_message(responder, Local::now());
            let statistics = document.statistics.clone();
            store
                .replace(session_id, session_id, to_value(&document)?)
                .await?;
            Ok(statistics)
        })
        .await
    }

    pub async fn complete_session(
        &self,
        session_id: &str,
        execution_time: f64,
        final_stats: SessionStats,
        termination_reason: Option<String>,
    ) -> PersistOutcome<()> {
        let outcome = self
            .call("complete_session", |store| async move {
                let mut document: SessionDocument =
                    from_value(store.read(session_id, session_id).await?)?;
                document
                    .complete(execution_time, final_stats, termination_reason, Local::now())
                    .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
                store
                    .replace(session_id, session_id, to_value(&document)?)
                    .await
            })
            .await;
        if outcome.is_persisted() {
            info!(session_id, "Session completed ({:.2}s)", execution_time);
        }
        outcome
    }

    pub async fn fail_session(
        &self,
        session_id: &str,
        execution_time: f64,
        final_stats: SessionStats,
        reason: &str,
    ) -> PersistOutcome<()> {
        let outcome = self
            .call("fail_session", |store| async move {
                let mut document: SessionDocument =
                    from_value(store.read(session_id, session_id).await?)?;
                document
                    .fail(execution_time, final_stats, reason, Local::now())
                    .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
                store
                    .replace(session_id, session_id, to_value(&document)?)
                    .await
            })
            .await;
        if outcome.is_persisted() {
            error!(session_id, "Session marked failed: {}", reason);
        }
        outcome
    }

    // ==================== Read Side ====================

    /// All messages of a session, ordered by sequence.
    pub async fn get_messages(&self, session_id: &str) -> PersistOutcome<Vec<MessageDocument>> {
        self.call("get_messages", |store| async move {
            let values = store
                .query(DocumentQuery::MessagesBySession {
                    session_id: session_id.to_string(),
                })
                .await?;
            let mut messages = values
                .into_iter()
                .map(from_value::<MessageDocument>)
                .collect::<Result<Vec<_>, _>>()?;
            messages.sort_by_key(|m| m.sequence);
            Ok(messages)
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> PersistOutcome<SessionDocument> {
        self.call("get_session", |store| async move {
            from_value(store.read(session_id, session_id).await?)
        })
        .await
    }

    /// Most recent sessions first.
    pub async fn get_sessions(&self, limit: usize) -> PersistOutcome<Vec<SessionDocument>> {
        self.call("get_sessions", |store| async move {
            let values = store.query(DocumentQuery::RecentSessions { limit }).await?;
            values
                .into_iter()
                .map(from_value::<SessionDocument>)
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    /// Reachability probe. Returns the number of stored sessions.
    pub async fn health_check(&self) -> PersistOutcome<u64> {
        self.call("health_check", |store| async move {
            let counted = store.query(DocumentQuery::CountSessions).await?;
            Ok(first_count(&counted))
        })
        .await
    }

    pub async fn close(&self) {
        if let Some(store) = &self.store
            && let Err(e) = store.close().await
        {
            warn!("Failed to close document store: {}", e);
        }
    }
}

fn first_count(values: &[Value]) -> u64 {
    values.first().and_then(Value::as_u64).unwrap_or(0)
}

fn to_value<T: Serialize>(document: &T) -> Result<Value, StoreError> {
    serde_json::to_value(document).map_err(|e| StoreError::InvalidDocument(e.to_string()))
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::InvalidDocument(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ports::document_store::DocumentStore;
    use async_trait::async_trait;
    use panel_domain::SessionStatus;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Minimal in-memory store for pipeline tests
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        docs: Mutex<BTreeMap<String, Value>>,
    }

    impl MemoryStore {
        fn id_of(document: &Value) -> Result<String, StoreError> {
            document["id"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| StoreError::InvalidDocument("missing id".into()))
        }

        fn of_type<'a>(docs: &'a BTreeMap<String, Value>, kind: &'a str) -> impl Iterator<Item = &'a Value> {
            docs.values().filter(move |d| d["type"] == kind)
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn create(&self, document: Value) -> Result<(), StoreError> {
            let id = Self::id_of(&document)?;
            let mut docs = self.docs.lock().unwrap();
            if docs.contains_key(&id) {
                return Err(StoreError::Conflict(id));
            }
            docs.insert(id, document);
            Ok(())
        }

        async fn upsert(&self, document: Value) -> Result<(), StoreError> {
            let id = Self::id_of(&document)?;
            self.docs.lock().unwrap().insert(id, document);
            Ok(())
        }

        async fn read(&self, id: &str, _partition_key: &str) -> Result<Value, StoreError> {
            self.docs
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(id.to_string()))
        }

        async fn replace(&self, id: &str, _pk: &str, document: Value) -> Result<(), StoreError> {
            let mut docs = self.docs.lock().unwrap();
            match docs.get_mut(id) {
                Some(slot) => {
                    *slot = document;
                    Ok(())
                }
                None => Err(StoreError::NotFound(id.to_string())),
            }
        }

        async fn query(&self, query: DocumentQuery) -> Result<Vec<Value>, StoreError> {
            let docs = self.docs.lock().unwrap();
            Ok(match query {
                DocumentQuery::MessagesBySession { session_id } => Self::of_type(&docs, "message")
                    .filter(|d| d["session_id"] == session_id.as_str())
                    .cloned()
                    .collect(),
                DocumentQuery::CountMessages { session_id } => {
                    let n = Self::of_type(&docs, "message")
                        .filter(|d| d["session_id"] == session_id.as_str())
                        .count();
                    vec![Value::from(n)]
                }
                DocumentQuery::RecentSessions { limit } => {
                    let mut sessions: Vec<Value> = Self::of_type(&docs, "session").cloned().collect();
                    sessions.sort_by(|a, b| {
                        b["timestamp"]
                            .as_f64()
                            .partial_cmp(&a["timestamp"].as_f64())
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    sessions.truncate(limit);
                    sessions
                }
                DocumentQuery::CountSessions => vec![Value::from(Self::of_type(&docs, "session").count())],
            })
        }
    }

    /// Store that fails every call
    pub(crate) struct UnreachableStore;

    #[async_trait]
    impl DocumentStore for UnreachableStore {
        async fn create(&self, _document: Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn upsert(&self, _document: Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn read(&self, _id: &str, _pk: &str) -> Result<Value, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn replace(&self, _id: &str, _pk: &str, _document: Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn query(&self, _query: DocumentQuery) -> Result<Vec<Value>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    /// Memory store whose message writes never complete
    #[derive(Default)]
    pub(crate) struct StalledStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl DocumentStore for StalledStore {
        async fn create(&self, document: Value) -> Result<(), StoreError> {
            self.inner.create(document).await
        }
        async fn upsert(&self, _document: Value) -> Result<(), StoreError> {
            std::future::pending().await
        }
        async fn read(&self, id: &str, pk: &str) -> Result<Value, StoreError> {
            self.inner.read(id, pk).await
        }
        async fn replace(&self, id: &str, pk: &str, document: Value) -> Result<(), StoreError> {
            self.inner.replace(id, pk, document).await
        }
        async fn query(&self, query: DocumentQuery) -> Result<Vec<Value>, StoreError> {
            self.inner.query(query).await
        }
    }

    fn pipeline() -> PersistencePipeline {
        PersistencePipeline::new(Arc::new(MemoryStore::default()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_sequences_are_one_to_n() {
        let pipeline = pipeline();
        let sid = pipeline
            .create_session("Plan an app", TeamInfo::default())
            .await
            .into_option()
            .unwrap();

        for (i, source) in ["a", "b", "a", "c"].iter().enumerate() {
            let seq = pipeline
                .append_message(&sid, &TranscriptEntry::text(*source, "x"))
                .await;
            assert_eq!(seq, PersistOutcome::Persisted(i as u64 + 1));
        }

        let messages = pipeline.get_messages(&sid).await.into_option().unwrap();
        let sequences: Vec<u64> = messages.iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
        assert_eq!(messages[2].source, "a");
    }

    #[tokio::test]
    async fn test_sequences_are_per_session() {
        let pipeline = pipeline();
        let s1 = pipeline.create_session("one", TeamInfo::default()).await.into_option().unwrap();
        let s2 = pipeline.create_session("two", TeamInfo::default()).await.into_option().unwrap();
        assert_ne!(s1, s2);

        pipeline.append_message(&s1, &TranscriptEntry::text("a", "x")).await;
        pipeline.append_message(&s1, &TranscriptEntry::text("a", "y")).await;
        let first_in_s2 = pipeline.append_message(&s2, &TranscriptEntry::text("b", "z")).await;
        assert_eq!(first_in_s2, PersistOutcome::Persisted(1));
    }

    #[tokio::test]
    async fn test_statistics_and_completion() {
        let pipeline = pipeline();
        let sid = pipeline.create_session("t", TeamInfo::default()).await.into_option().unwrap();

        pipeline.update_statistics(&sid, "a").await;
        pipeline.update_statistics(&sid, "b").await;
        let stats = pipeline.update_statistics(&sid, "a").await.into_option().unwrap();
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.agent_message_counts["a"], 2);

        assert!(
            pipeline
                .complete_session(&sid, 1.25, SessionStats::default(), Some("done".into()))
                .await
                .is_persisted()
        );
        let session = pipeline.get_session(&sid).await.into_option().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.termination_reason.as_deref(), Some("done"));
        assert_eq!(session.execution_time, Some(1.25));

        // completed -> failed is rejected and counted
        let before = pipeline.failure_count();
        assert!(
            !pipeline
                .fail_session(&sid, 2.0, SessionStats::default(), "late")
                .await
                .is_persisted()
        );
        assert_eq!(pipeline.failure_count(), before + 1);
    }

    #[tokio::test]
    async fn test_get_sessions_most_recent_first() {
        let pipeline = pipeline();
        let first = pipeline.create_session("first", TeamInfo::default()).await.into_option().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = pipeline.create_session("second", TeamInfo::default()).await.into_option().unwrap();

        let sessions = pipeline.get_sessions(10).await.into_option().unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);

        assert_eq!(pipeline.get_sessions(1).await.into_option().unwrap().len(), 1);
        assert_eq!(pipeline.health_check().await, PersistOutcome::Persisted(2));
    }

    #[tokio::test]
    async fn test_unreachable_store_never_raises() {
        let pipeline =
            PersistencePipeline::new(Arc::new(UnreachableStore), Duration::from_secs(5));

        assert_eq!(
            pipeline.create_session("t", TeamInfo::default()).await,
            PersistOutcome::NotPersisted
        );
        assert_eq!(
            pipeline.append_message("s", &TranscriptEntry::text("a", "x")).await,
            PersistOutcome::NotPersisted
        );
        assert_eq!(pipeline.get_messages("s").await, PersistOutcome::NotPersisted);
        assert_eq!(pipeline.health_check().await, PersistOutcome::NotPersisted);
        assert_eq!(pipeline.failure_count(), 4);
    }

    #[tokio::test]
    async fn test_disabled_pipeline_counts_nothing() {
        let pipeline = PersistencePipeline::disabled();
        assert!(!pipeline.is_enabled());
        assert_eq!(
            pipeline.create_session("t", TeamInfo::default()).await,
            PersistOutcome::NotPersisted
        );
        assert_eq!(pipeline.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_store_timeout_is_counted_not_raised() {
        let pipeline =
            PersistencePipeline::new(Arc::new(StalledStore::default()), Duration::from_millis(50));
        let sid = pipeline.create_session("t", TeamInfo::default()).await.into_option().unwrap();

        let started = std::time::Instant::now();
        let outcome = pipeline.append_message(&sid, &TranscriptEntry::text("a", "x")).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome, PersistOutcome::NotPersisted);
        assert_eq!(pipeline.failure_count(), 1);

        // The session document is still reachable
        assert!(pipeline.update_statistics(&sid, "a").await.is_persisted());
        assert_eq!(pipeline.failure_count(), 1);
    }

    #[test]
    fn test_for_run_uses_run_params_timeout() {
        let params = RunParams::default().with_persistence_timeout(Duration::from_millis(250));
        let pipeline = PersistencePipeline::for_run(Some(Arc::new(MemoryStore::default())), &params);
        assert!(pipeline.is_enabled());
        assert_eq!(pipeline.timeout(), Duration::from_millis(250));

        assert!(!PersistencePipeline::for_run(None, &params).is_enabled());
    }
}
