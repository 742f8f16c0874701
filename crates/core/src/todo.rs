//! Todo list types and the TodoStore trait.
//!
//! The store keeps a sequence of timestamped snapshots per session. Snapshots
//! are never merged: every save writes the whole list, and only the most
//! recent snapshot is ever read back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Identity of an agent session; scopes todo snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    /// Session identity for a sub-agent spawned from this session.
    ///
    /// Unique per spawn: a parent id may be reused across processes, and a
    /// child must never read snapshots left by an earlier child.
    pub fn child(&self, depth: usize, ordinal: usize) -> Self {
        Self(format!("{}-sub{}-{}-{}", self.0, depth, ordinal, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one persisted snapshot. Ordering is lexicographic, which
/// matches creation order for timestamp-encoded names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub String);

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One todo entry as held in a Context. `id` is positional and reassigned on
/// every load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: usize,
    pub description: String,
    pub completed: bool,
}

/// The persisted shape of a todo entry: no id, `completed` optional on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl TodoItem {
    /// Build items from persisted records, assigning ids by position.
    pub fn from_records(records: Vec<TodoRecord>) -> Vec<TodoItem> {
        records
            .into_iter()
            .enumerate()
            .map(|(id, r)| TodoItem {
                id,
                description: r.description,
                completed: r.completed,
            })
            .collect()
    }

    /// Strip ids for persistence.
    pub fn to_records(items: &[TodoItem]) -> Vec<TodoRecord> {
        items
            .iter()
            .map(|i| TodoRecord {
                description: i.description.clone(),
                completed: i.completed,
            })
            .collect()
    }

    /// True when the list is non-empty and every item is completed.
    pub fn all_completed(items: &[TodoItem]) -> bool {
        !items.is_empty() && items.iter().all(|i| i.completed)
    }
}

/// Session-scoped persistence for todo snapshots.
#[async_trait]
pub trait TodoStore: Send + Sync {
    fn name(&self) -> &str;

    /// Snapshot identifiers for `session`, sorted ascending by creation time.
    async fn list_snapshots(&self, session: &SessionId) -> Result<Vec<SnapshotId>, StoreError>;

    /// Decode one snapshot.
    async fn read(&self, session: &SessionId, id: &SnapshotId) -> Result<Vec<TodoRecord>, StoreError>;

    /// Write a new snapshot; never overwrites an existing one.
    async fn write(&self, session: &SessionId, records: &[TodoRecord]) -> Result<SnapshotId, StoreError>;
}
