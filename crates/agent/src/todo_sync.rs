//! Todo synchronizer: moves todo lists between a Context and the store.
//!
//! Loading never fails: a missing, unreadable or corrupt snapshot means
//! "no todos". Saving reports store errors so the dispatcher can fold them
//! into the tool result.

use chrono::Utc;
use clawloop_core::error::StoreError;
use clawloop_core::event::{DomainEvent, EventBus};
use clawloop_core::todo::{SessionId, SnapshotId, TodoItem, TodoStore};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct TodoSynchronizer {
    store: Arc<dyn TodoStore>,
    events: Arc<EventBus>,
}

impl TodoSynchronizer {
    pub fn new(store: Arc<dyn TodoStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    /// Latest snapshot for `session`, with ids reassigned by position.
    pub async fn load(&self, session: &SessionId) -> Vec<TodoItem> {
        let snapshots = match self.store.list_snapshots(session).await {
            Ok(s) => s,
            Err(e) => {
                warn!(session = %session, error = %e, "Listing todo snapshots failed, treating as empty");
                return Vec::new();
            }
        };

        let Some(latest) = snapshots.into_iter().max() else {
            return Vec::new();
        };

        match self.store.read(session, &latest).await {
            Ok(records) => {
                let items = TodoItem::from_records(records);
                debug!(session = %session, snapshot = %latest, count = items.len(), "Todo snapshot loaded");
                self.events.publish(DomainEvent::TodosLoaded {
                    session: session.to_string(),
                    count: items.len(),
                    timestamp: Utc::now(),
                });
                items
            }
            Err(e) => {
                warn!(session = %session, snapshot = %latest, error = %e, "Todo snapshot unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Persist the full list as a new snapshot.
    pub async fn save(&self, session: &SessionId, items: &[TodoItem]) -> Result<SnapshotId, StoreError> {
        let id = self
            .store
            .write(session, &TodoItem::to_records(items))
            .await?;
        self.events.publish(DomainEvent::TodosSaved {
            session: session.to_string(),
            snapshot: id.to_string(),
            count: items.len(),
            timestamp: Utc::now(),
        });
        Ok(id)
    }
}
