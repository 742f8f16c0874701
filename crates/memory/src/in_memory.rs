//! In-memory todo store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use clawloop_core::error::StoreError;
use clawloop_core::todo::{SessionId, SnapshotId, TodoRecord, TodoStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps snapshots per session in insertion order.
/// Identifiers are zero-padded sequence numbers so lexicographic order is
/// creation order.
#[derive(Default, Clone)]
pub struct InMemoryTodoStore {
    sessions: Arc<RwLock<HashMap<SessionId, Vec<(SnapshotId, Vec<TodoRecord>)>>>>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots ever written for `session`.
    pub async fn snapshot_count(&self, session: &SessionId) -> usize {
        self.sessions
            .read()
            .await
            .get(session)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn list_snapshots(&self, session: &SessionId) -> Result<Vec<SnapshotId>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<SnapshotId> = sessions
            .get(session)
            .map(|snaps| snaps.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }

    async fn read(&self, session: &SessionId, id: &SnapshotId) -> Result<Vec<TodoRecord>, StoreError> {
        self.sessions
            .read()
            .await
            .get(session)
            .and_then(|snaps| snaps.iter().find(|(sid, _)| sid == id))
            .map(|(_, records)| records.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn write(&self, session: &SessionId, records: &[TodoRecord]) -> Result<SnapshotId, StoreError> {
        let mut sessions = self.sessions.write().await;
        let snaps = sessions.entry(session.clone()).or_default();
        let id = SnapshotId(format!("todo_{:010}.json", snaps.len()));
        snaps.push((id.clone(), records.to_vec()));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_list_read() {
        let store = InMemoryTodoStore::new();
        let session = SessionId::from("s");
        let records = vec![TodoRecord { description: "a".into(), completed: false }];

        let first = store.write(&session, &records).await.unwrap();
        let second = store.write(&session, &[]).await.unwrap();

        let ids = store.list_snapshots(&session).await.unwrap();
        assert_eq!(ids, vec![first.clone(), second]);
        assert_eq!(store.read(&session, &first).await.unwrap(), records);
        assert_eq!(store.snapshot_count(&session).await, 2);
    }

    #[tokio::test]
    async fn unknown_snapshot_is_not_found() {
        let store = InMemoryTodoStore::new();
        let err = store
            .read(&SessionId::from("s"), &SnapshotId("nope".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
