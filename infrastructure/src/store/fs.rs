//! File-backed document store.
//!
//! Layout: `<root>/<session_id>/<id>.json`, one directory per partition.
//! Writes go to a temp file in the same directory, are synced, then renamed
//! over the target so a reader never sees a half-written document.

use super::query::{self, document_id, partition_key};
use async_trait::async_trait;
use panel_application::{DocumentQuery, DocumentStore, StoreError};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct FsDocumentStore {
    root: PathBuf,
    /// Serializes check-then-write sequences (create, replace)
    write_lock: Mutex<()>,
    /// Suffix source for temp files; a timed-out write may still be running
    temp_seq: AtomicU64,
    closed: AtomicBool,
}

fn unavailable(context: &str, e: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", context, e))
}

/// Ids become file names; refuse anything that could escape the root.
fn safe_segment(segment: &str) -> Result<&str, StoreError> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidDocument(format!(
            "unusable id or partition key: {:?}",
            segment
        )));
    }
    Ok(segment)
}

impl FsDocumentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| unavailable(&root.display().to_string(), e))?;
        debug!("Document store at {}", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            temp_seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn path_of(&self, id: &str, partition_key: &str) -> Result<PathBuf, StoreError> {
        Ok(self
            .root
            .join(safe_segment(partition_key)?)
            .join(format!("{}.json", safe_segment(id)?)))
    }

    /// `<id>.json.<pid>.<n>.tmp`, unique per write within this process.
    fn temp_path(&self, path: &Path) -> PathBuf {
        let n = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("json.{}.{}.tmp", std::process::id(), n))
    }

    async fn write_atomic(&self, path: &Path, document: &Value) -> Result<(), StoreError> {
        let Some(dir) = path.parent() else {
            return Err(StoreError::InvalidDocument(path.display().to_string()));
        };
        fs::create_dir_all(dir)
            .await
            .map_err(|e| unavailable(&dir.display().to_string(), e))?;

        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
        let tmp = self.temp_path(path);

        let written = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp).await
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!("Failed to remove temp file {}: {}", tmp.display(), cleanup);
            }
            return Err(unavailable(&path.display().to_string(), e));
        }
        Ok(())
    }

    async fn read_path(path: &Path) -> Result<Option<Value>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::InvalidDocument(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable(&path.display().to_string(), e)),
        }
    }

    async fn read_dir_documents(dir: &Path, out: &mut Vec<Value>) -> Result<(), StoreError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(unavailable(&dir.display().to_string(), e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| unavailable(&dir.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_path(&path).await {
                Ok(Some(document)) => out.push(document),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable document: {}", e),
            }
        }
        Ok(())
    }

    /// Documents in scope for `query`: one partition, or every partition.
    async fn scan(&self, query: &DocumentQuery) -> Result<Vec<Value>, StoreError> {
        let mut documents = Vec::new();
        match query {
            DocumentQuery::MessagesBySession { session_id }
            | DocumentQuery::CountMessages { session_id } => {
                let dir = self.root.join(safe_segment(session_id)?);
                Self::read_dir_documents(&dir, &mut documents).await?;
            }
            DocumentQuery::RecentSessions { .. } | DocumentQuery::CountSessions => {
                let mut partitions = fs::read_dir(&self.root)
                    .await
                    .map_err(|e| unavailable(&self.root.display().to_string(), e))?;
                while let Some(entry) = partitions
                    .next_entry()
                    .await
                    .map_err(|e| unavailable(&self.root.display().to_string(), e))?
                {
                    let dir = entry.path();
                    if !dir.is_dir() {
                        continue;
                    }
                    // A session document is named after its partition
                    let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                        continue;
                    };
                    let path = dir.join(format!("{}.json", name));
                    if let Some(document) = Self::read_path(&path).await? {
                        documents.push(document);
                    }
                }
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn create(&self, document: Value) -> Result<(), StoreError> {
        self.ensure_open()?;
        let path = self.path_of(document_id(&document)?, partition_key(&document)?)?;
        let _guard = self.write_lock.lock().await;
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::Conflict(document_id(&document)?.to_string()));
        }
        self.write_atomic(&path, &document).await
    }

    async fn upsert(&self, document: Value) -> Result<(), StoreError> {
        self.ensure_open()?;
        let path = self.path_of(document_id(&document)?, partition_key(&document)?)?;
        let _guard = self.write_lock.lock().await;
        self.write_atomic(&path, &document).await
    }

    async fn read(&self, id: &str, partition_key: &str) -> Result<Value, StoreError> {
        self.ensure_open()?;
        Self::read_path(&self.path_of(id, partition_key)?)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn replace(
        &self,
        id: &str,
        partition_key: &str,
        document: Value,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let path = self.path_of(id, partition_key)?;
        let _guard = self.write_lock.lock().await;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.write_atomic(&path, &document).await
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Value>, StoreError> {
        self.ensure_open()?;
        let documents = self.scan(&query).await?;
        Ok(query::evaluate(&query, documents.iter()))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> (tempfile::TempDir, FsDocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path().join("sessions")).await.unwrap();
        (dir, store)
    }

    fn session(id: &str, timestamp: f64) -> Value {
        json!({"id": id, "session_id": id, "type": "session", "timestamp": timestamp})
    }

    fn message(session_id: &str, sequence: u64) -> Value {
        json!({
            "id": format!("{}_msg_{:04}", session_id, sequence),
            "session_id": session_id,
            "type": "message",
            "sequence": sequence,
        })
    }

    #[tokio::test]
    async fn test_create_read_replace() {
        let (_dir, store) = store().await;
        store.create(session("s1", 1.0)).await.unwrap();
        assert_eq!(store.read("s1", "s1").await.unwrap()["timestamp"], 1.0);

        let mut updated = session("s1", 1.0);
        updated["status"] = json!("completed");
        store.replace("s1", "s1", updated).await.unwrap();
        assert_eq!(store.read("s1", "s1").await.unwrap()["status"], "completed");

        assert!(store.root().join("s1").join("s1.json").exists());
        assert!(!store.root().join("s1").join("s1.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let (_dir, store) = store().await;
        store.create(session("s1", 1.0)).await.unwrap();
        assert_eq!(
            store.create(session("s1", 2.0)).await,
            Err(StoreError::Conflict("s1".into()))
        );
    }

    #[tokio::test]
    async fn test_missing_documents() {
        let (_dir, store) = store().await;
        assert_eq!(
            store.read("nope", "nope").await,
            Err(StoreError::NotFound("nope".into()))
        );
        assert!(matches!(
            store.replace("nope", "nope", session("nope", 0.0)).await,
            Err(StoreError::NotFound(_))
        ));
        let messages = store
            .query(DocumentQuery::MessagesBySession {
                session_id: "nope".into(),
            })
            .await
            .unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_queries_across_partitions() {
        let (_dir, store) = store().await;
        store.create(session("s1", 1.0)).await.unwrap();
        store.create(session("s2", 2.0)).await.unwrap();
        for sequence in [2, 1, 3] {
            store.create(message("s1", sequence)).await.unwrap();
        }
        store.create(message("s2", 1)).await.unwrap();

        let messages = store
            .query(DocumentQuery::MessagesBySession {
                session_id: "s1".into(),
            })
            .await
            .unwrap();
        let sequences: Vec<u64> = messages.iter().map(|m| m["sequence"].as_u64().unwrap()).collect();
        assert_eq!(sequences, vec![1, 2, 3]);

        let count = store
            .query(DocumentQuery::CountMessages {
                session_id: "s1".into(),
            })
            .await
            .unwrap();
        assert_eq!(count, vec![json!(3)]);

        let recent = store.query(DocumentQuery::RecentSessions { limit: 5 }).await.unwrap();
        assert_eq!(recent[0]["id"], "s2");
        assert_eq!(recent.len(), 2);
        assert_eq!(
            store.query(DocumentQuery::CountSessions).await.unwrap(),
            vec![json!(2)]
        );
    }

    #[tokio::test]
    async fn test_rejects_path_escapes() {
        let (_dir, store) = store().await;
        let doc = json!({"id": "../evil", "session_id": "s1", "type": "message"});
        assert!(matches!(
            store.create(doc).await,
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FsDocumentStore::open(dir.path()).await.unwrap();
            store.create(session("s1", 1.0)).await.unwrap();
            store.close().await.unwrap();
            assert_eq!(store.read("s1", "s1").await, Err(StoreError::Closed));
        }
        let store = FsDocumentStore::open(dir.path()).await.unwrap();
        assert!(store.read("s1", "s1").await.is_ok());
    }

    #[tokio::test]
    async fn test_temp_files_are_unique_per_write() {
        let (_dir, store) = store().await;
        let target = store.root().join("s1").join("s1.json");
        let first = store.temp_path(&target);
        let second = store.temp_path(&target);
        assert_ne!(first, second);
        assert_eq!(first.parent(), target.parent());
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some("tmp"));
    }

    #[tokio::test]
    async fn test_writes_leave_no_temp_files() {
        let (_dir, store) = store().await;
        store.create(session("s1", 1.0)).await.unwrap();
        for sequence in 1..=3 {
            store.upsert(message("s1", sequence)).await.unwrap();
        }
        let mut updated = session("s1", 1.0);
        updated["status"] = json!("completed");
        store.replace("s1", "s1", updated).await.unwrap();

        let mut entries = fs::read_dir(store.root().join("s1")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        assert_eq!(
            names,
            vec!["s1.json", "s1_msg_0001.json", "s1_msg_0002.json", "s1_msg_0003.json"]
        );
        assert_eq!(store.read("s1", "s1").await.unwrap()["status"], "completed");
    }
}
