//! File-based todo store: one JSON file per snapshot.
//!
//! Layout: `<root>/<session>/todo_<YYYYmmdd_HHMMSS>.json`. Each file holds the
//! full list as a JSON array of `{"description", "completed"}` objects.
//! Saves never touch existing files; retention is left to the operator.

use async_trait::async_trait;
use chrono::Utc;
use clawloop_core::error::StoreError;
use clawloop_core::todo::{SessionId, SnapshotId, TodoRecord, TodoStore};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::session_file_name;

const SNAPSHOT_PREFIX: &str = "todo_";
const SNAPSHOT_EXT: &str = ".json";

/// Attempts at finding a free name within one second before giving up.
const MAX_SUFFIX: u32 = 999;

pub struct FileTodoStore {
    root: PathBuf,
}

impl FileTodoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(session_file_name(session))
    }

    fn is_snapshot_name(name: &str) -> bool {
        name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(SNAPSHOT_EXT)
    }

    /// `todo_20250101_120000.json`, then `todo_20250101_120000_001.json`, ...
    /// Both sort after the bare name and in suffix order.
    fn candidate_name(stamp: &str, attempt: u32) -> String {
        if attempt == 0 {
            format!("{SNAPSHOT_PREFIX}{stamp}{SNAPSHOT_EXT}")
        } else {
            format!("{SNAPSHOT_PREFIX}{stamp}_{attempt:03}{SNAPSHOT_EXT}")
        }
    }
}

#[async_trait]
impl TodoStore for FileTodoStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn list_snapshots(&self, session: &SessionId) -> Result<Vec<SnapshotId>, StoreError> {
        let dir = self.session_dir(session);
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to list {}: {e}",
                    dir.display()
                )));
            }
        };

        let mut ids = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to read directory entry: {e}")))?
        {
            if let Some(name) = entry.file_name().to_str()
                && Self::is_snapshot_name(name)
            {
                ids.push(SnapshotId(name.to_string()));
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn read(&self, session: &SessionId, id: &SnapshotId) -> Result<Vec<TodoRecord>, StoreError> {
        let path = self.session_dir(session).join(&id.0);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            warn!(snapshot = %id, error = %e, "Corrupt todo snapshot");
            StoreError::Corrupt {
                id: id.to_string(),
                reason: e.to_string(),
            }
        })
    }

    async fn write(&self, session: &SessionId, records: &[TodoRecord]) -> Result<SnapshotId, StoreError> {
        let dir = self.session_dir(session);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StoreError::Storage(format!("Failed to create todo directory: {e}"))
        })?;

        let body = serde_json::to_string_pretty(records)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize todos: {e}")))?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();

        for attempt in 0..=MAX_SUFFIX {
            let name = Self::candidate_name(&stamp, attempt);
            let path = dir.join(&name);
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            let mut file = match file {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StoreError::Storage(format!(
                        "Failed to create {}: {e}",
                        path.display()
                    )));
                }
            };
            file.write_all(body.as_bytes())
                .await
                .map_err(|e| StoreError::Storage(format!("Failed to write todo snapshot: {e}")))?;
            file.flush()
                .await
                .map_err(|e| StoreError::Storage(format!("Failed to flush todo snapshot: {e}")))?;

            debug!(session = %session, snapshot = %name, count = records.len(), "Todo snapshot written");
            return Ok(SnapshotId(name));
        }

        Err(StoreError::Storage(format!(
            "No free snapshot name for {stamp} after {MAX_SUFFIX} attempts"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(description: &str, completed: bool) -> TodoRecord {
        TodoRecord {
            description: description.into(),
            completed,
        }
    }

    #[tokio::test]
    async fn empty_session_has_no_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTodoStore::new(dir.path());
        let ids = store.list_snapshots(&SessionId::from("s1")).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTodoStore::new(dir.path());
        let session = SessionId::from("s1");

        let id = store
            .write(&session, &[record("write tests", false)])
            .await
            .unwrap();
        assert!(id.0.starts_with("todo_"));

        let records = store.read(&session, &id).await.unwrap();
        assert_eq!(records, vec![record("write tests", false)]);
    }

    #[tokio::test]
    async fn same_second_saves_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTodoStore::new(dir.path());
        let session = SessionId::from("s1");

        let first = store.write(&session, &[record("a", false)]).await.unwrap();
        let second = store.write(&session, &[record("b", true)]).await.unwrap();
        assert_ne!(first, second);
        assert!(second > first);

        let ids = store.list_snapshots(&session).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids.last(), Some(&second));
    }

    #[tokio::test]
    async fn suffix_order_is_lexicographic() {
        let base = FileTodoStore::candidate_name("20250101_120000", 0);
        let one = FileTodoStore::candidate_name("20250101_120000", 1);
        let ten = FileTodoStore::candidate_name("20250101_120000", 10);
        let next_second = FileTodoStore::candidate_name("20250101_120001", 0);
        assert!(base < one);
        assert!(one < ten);
        assert!(ten < next_second);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTodoStore::new(dir.path());
        store
            .write(&SessionId::from("a"), &[record("x", false)])
            .await
            .unwrap();
        assert!(store.list_snapshots(&SessionId::from("b")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTodoStore::new(dir.path());
        let session = SessionId::from("s1");
        let session_dir = store.session_dir(&session);
        std::fs::create_dir_all(&session_dir).unwrap();
        std::fs::write(session_dir.join("notes.txt"), "hi").unwrap();
        assert!(store.list_snapshots(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTodoStore::new(dir.path());
        let session = SessionId::from("s1");
        let session_dir = store.session_dir(&session);
        std::fs::create_dir_all(&session_dir).unwrap();
        std::fs::write(session_dir.join("todo_20250101_000000.json"), "{not json").unwrap();

        let ids = store.list_snapshots(&session).await.unwrap();
        let err = store.read(&session, &ids[0]).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn session_dir_is_single_component() {
        let store = FileTodoStore::new("/tmp/todos");
        let dir = store.session_dir(&SessionId::from("../escape"));
        assert_eq!(dir, PathBuf::from("/tmp/todos/..%2Fescape"));
        let dots = store.session_dir(&SessionId::from(".."));
        assert_eq!(dots, PathBuf::from("/tmp/todos/%2E%2E"));
    }

    #[tokio::test]
    async fn lookalike_session_ids_do_not_share_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTodoStore::new(dir.path());
        store.write(&SessionId::from("a.b"), &[record("dotted", false)]).await.unwrap();

        for other in ["a_b", "a/b"] {
            let ids = store.list_snapshots(&SessionId::from(other)).await.unwrap();
            assert!(ids.is_empty(), "{other} saw a.b's snapshot");
        }
        assert_eq!(store.list_snapshots(&SessionId::from("a.b")).await.unwrap().len(), 1);
    }
}
