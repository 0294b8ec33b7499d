//! Background writer for one session.
//!
//! The turn loop hands each committed turn to [`SessionWriter::enqueue`],
//! which never blocks. A single spawned task drains the queue in FIFO order,
//! appending the message and then updating the session statistics, so the
//! pipeline's count-then-append and read-modify-write steps always see one
//! writer per session.

use super::persistence::{PersistOutcome, PersistencePipeline};
use panel_domain::TranscriptEntry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What the writer managed to persist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterReport {
    pub appended: u64,
    pub failed: u64,
    /// Turns queued but never written because the flush timed out
    pub abandoned: u64,
    /// Whether the queue drained before the flush deadline
    pub drained: bool,
}

#[derive(Default)]
struct Counters {
    appended: AtomicU64,
    failed: AtomicU64,
    handled: AtomicU64,
}

impl Counters {
    fn report(&self, queued: u64, drained: bool) -> WriterReport {
        let handled = self.handled.load(Ordering::Acquire);
        WriterReport {
            appended: self.appended.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            abandoned: queued.saturating_sub(handled),
            drained,
        }
    }
}

pub struct SessionWriter {
    session_id: String,
    tx: mpsc::UnboundedSender<TranscriptEntry>,
    handle: JoinHandle<()>,
    queued: AtomicU64,
    counters: Arc<Counters>,
}

impl SessionWriter {
    pub fn spawn(pipeline: Arc<PersistencePipeline>, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<TranscriptEntry>();
        let counters = Arc::new(Counters::default());

        let worker_session = session_id.clone();
        let worker_counters = Arc::clone(&counters);
        let handle = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                match pipeline.append_message(&worker_session, &entry).await {
                    PersistOutcome::Persisted(sequence) => {
                        worker_counters.appended.fetch_add(1, Ordering::AcqRel);
                        // Counters only follow messages that actually landed
                        if !pipeline
                            .update_statistics(&worker_session, &entry.source)
                            .await
                            .is_persisted()
                        {
                            worker_counters.failed.fetch_add(1, Ordering::AcqRel);
                        }
                        debug!(session_id = %worker_session, sequence, "Turn written");
                    }
                    PersistOutcome::NotPersisted => {
                        worker_counters.failed.fetch_add(1, Ordering::AcqRel);
                    }
                }
                worker_counters.handled.fetch_add(1, Ordering::AcqRel);
            }
        });

        Self {
            session_id,
            tx,
            handle,
            queued: AtomicU64::new(0),
            counters,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Queue a committed turn. Returns false if the worker has stopped.
    pub fn enqueue(&self, entry: TranscriptEntry) -> bool {
        let sent = self.tx.send(entry).is_ok();
        if sent {
            self.queued.fetch_add(1, Ordering::AcqRel);
        }
        sent
    }

    /// Close the queue and wait up to `timeout` for it to drain.
    ///
    /// On timeout the worker is aborted; the turns it had not finished are
    /// reported as `abandoned` and `drained` is false.
    pub async fn finish(self, timeout: Duration) -> WriterReport {
        let Self {
            session_id,
            tx,
            mut handle,
            queued,
            counters,
        } = self;
        drop(tx);
        let queued = queued.load(Ordering::Acquire);

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => counters.report(queued, true),
            Ok(Err(e)) => {
                warn!(session_id = %session_id, "Session writer task failed: {}", e);
                counters.report(queued, false)
            }
            Err(_) => {
                handle.abort();
                let report = counters.report(queued, false);
                warn!(
                    session_id = %session_id,
                    "Session writer did not drain within {:?}, abandoning {} queued writes",
                    timeout, report.abandoned
                );
                report
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::document_store::{DocumentQuery, DocumentStore, StoreError};
    use crate::use_cases::persistence::tests::{MemoryStore, StalledStore, UnreachableStore};
    use async_trait::async_trait;
    use panel_domain::TeamInfo;
    use serde_json::Value;

    /// Memory store whose every call sleeps, to shake out ordering bugs
    struct JitteryStore {
        inner: MemoryStore,
        step: std::sync::atomic::AtomicU64,
    }

    impl JitteryStore {
        async fn jitter(&self) {
            let n = self.step.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            tokio::time::sleep(Duration::from_millis((n * 7) % 5)).await;
        }
    }

    #[async_trait]
    impl DocumentStore for JitteryStore {
        async fn create(&self, document: Value) -> Result<(), StoreError> {
            self.jitter().await;
            self.inner.create(document).await
        }
        async fn upsert(&self, document: Value) -> Result<(), StoreError> {
            self.jitter().await;
            self.inner.upsert(document).await
        }
        async fn read(&self, id: &str, pk: &str) -> Result<Value, StoreError> {
            self.jitter().await;
            self.inner.read(id, pk).await
        }
        async fn replace(&self, id: &str, pk: &str, document: Value) -> Result<(), StoreError> {
            self.jitter().await;
            self.inner.replace(id, pk, document).await
        }
        async fn query(&self, query: DocumentQuery) -> Result<Vec<Value>, StoreError> {
            self.jitter().await;
            self.inner.query(query).await
        }
    }

    #[tokio::test]
    async fn test_fifo_sequences_under_jitter() {
        let store = Arc::new(JitteryStore {
            inner: MemoryStore::default(),
            step: Default::default(),
        });
        let pipeline = Arc::new(PersistencePipeline::new(store, Duration::from_secs(5)));
        let sid = pipeline
            .create_session("t", TeamInfo::default())
            .await
            .into_option()
            .unwrap();

        let writer = SessionWriter::spawn(pipeline.clone(), sid.clone());
        let sources = ["a", "b", "a", "c", "b", "a", "c", "a"];
        for (i, source) in sources.iter().enumerate() {
            assert!(writer.enqueue(TranscriptEntry::text(*source, format!("turn {}", i + 1))));
        }
        let report = writer.finish(Duration::from_secs(10)).await;
        assert!(report.drained);
        assert_eq!(report.appended, sources.len() as u64);
        assert_eq!(report.failed, 0);

        let messages = pipeline.get_messages(&sid).await.into_option().unwrap();
        let sequences: Vec<u64> = messages.iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, (1..=sources.len() as u64).collect::<Vec<_>>());
        for (message, i) in messages.iter().zip(1..) {
            assert_eq!(message.content, format!("turn {}", i));
        }

        let session = pipeline.get_session(&sid).await.into_option().unwrap();
        assert_eq!(session.statistics.total_messages, sources.len() as u64);
        assert_eq!(session.statistics.agent_message_counts["a"], 4);
    }

    #[tokio::test]
    async fn test_unreachable_store_counts_failures() {
        let pipeline = Arc::new(PersistencePipeline::new(
            Arc::new(UnreachableStore),
            Duration::from_secs(1),
        ));
        let writer = SessionWriter::spawn(pipeline, "session_x");
        writer.enqueue(TranscriptEntry::text("a", "x"));
        writer.enqueue(TranscriptEntry::text("b", "y"));

        let report = writer.finish(Duration::from_secs(5)).await;
        assert_eq!(
            report,
            WriterReport {
                appended: 0,
                failed: 2,
                abandoned: 0,
                drained: true,
            }
        );
    }

    #[tokio::test]
    async fn test_finish_with_nothing_queued() {
        let pipeline = Arc::new(PersistencePipeline::disabled());
        let writer = SessionWriter::spawn(pipeline, "session_y");
        assert_eq!(writer.session_id(), "session_y");
        let report = writer.finish(Duration::from_secs(1)).await;
        assert_eq!(
            report,
            WriterReport {
                drained: true,
                ..WriterReport::default()
            }
        );
    }

    #[tokio::test]
    async fn test_flush_timeout_aborts_and_reports_abandoned() {
        let pipeline = Arc::new(PersistencePipeline::new(
            Arc::new(StalledStore::default()),
            Duration::from_secs(30),
        ));
        let writer = SessionWriter::spawn(pipeline.clone(), "session_z");
        for i in 0..3 {
            writer.enqueue(TranscriptEntry::text("a", format!("turn {}", i)));
        }

        let started = std::time::Instant::now();
        let report = writer.finish(Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_secs(5));

        assert!(!report.drained);
        assert_eq!(report.appended, 0);
        assert_eq!(report.abandoned, 3);
        // Aborted mid-call, so the pipeline never saw a timeout
        assert_eq!(pipeline.failure_count(), 0);
    }
}
