//! Domain event system: observable side effects of the control loop.
//!
//! Events are published when something interesting happens (a title change,
//! a tool run, a sub-agent spawn). Front-ends subscribe to react without the
//! loop knowing who is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::model::Phase;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// Topic detection classified the input as a new topic
    TitleChanged {
        session: String,
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// The loop entered a model-calling phase
    PhaseEntered {
        session: String,
        depth: usize,
        phase: Phase,
        timestamp: DateTime<Utc>,
    },

    /// A generic tool was executed
    ToolExecuted {
        session: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The permission gate refused a tool call
    PermissionDenied {
        session: String,
        tool_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A sub-agent was created
    SubAgentSpawned {
        parent_session: String,
        child_session: String,
        depth: usize,
        timestamp: DateTime<Utc>,
    },

    /// A sub-agent run returned
    SubAgentFinished {
        child_session: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },

    /// Message history was compacted
    ContextCompacted {
        session: String,
        messages_before: usize,
        tokens_before: usize,
        timestamp: DateTime<Utc>,
    },

    /// A todo snapshot replaced the in-memory list
    TodosLoaded {
        session: String,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A todo snapshot was written
    TodosSaved {
        session: String,
        snapshot: String,
        count: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
