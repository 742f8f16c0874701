//! Agent sessions: one node in the bounded sub-agent tree.
//!
//! A session owns its [`Context`] exclusively. The only way to create a
//! deeper session is [`AgentSession::spawn_child`], which refuses once the
//! depth limit is reached, so `depth <= max_depth` holds by construction.

use clawloop_core::context::Context;
use clawloop_core::model::ModelTier;
use clawloop_core::todo::SessionId;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{LoopError, SpawnError};

/// Default recursion bound: the root plus one level of children.
pub const DEFAULT_MAX_DEPTH: usize = 1;

#[derive(Debug)]
pub struct AgentSession {
    id: SessionId,
    pub context: Context,
    /// Tier of the most recent model call
    pub tier: ModelTier,
    depth: usize,
    max_depth: usize,
    children_spawned: usize,
}

impl AgentSession {
    /// A depth-0 session.
    pub fn root(id: SessionId, context: Context, max_depth: usize) -> Self {
        Self {
            id,
            context,
            tier: ModelTier::High,
            depth: 0,
            max_depth,
            children_spawned: 0,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn children_spawned(&self) -> usize {
        self.children_spawned
    }

    pub fn can_spawn(&self) -> bool {
        self.depth < self.max_depth
    }

    /// Create the session for a delegated task, one level down.
    ///
    /// The child's context holds exactly one user message (`task`) and no
    /// todos; project metadata is copied from the parent.
    pub fn spawn_child(&mut self, task: &str) -> Result<AgentSession, SpawnError> {
        if !self.can_spawn() {
            return Err(SpawnError::DepthExceeded {
                depth: self.depth,
                max_depth: self.max_depth,
            });
        }

        let ordinal = self.children_spawned;
        self.children_spawned += 1;
        let depth = self.depth + 1;

        Ok(AgentSession {
            id: self.id.child(depth, ordinal),
            context: self.context.for_task(task),
            tier: ModelTier::High,
            depth,
            max_depth: self.max_depth,
            children_spawned: 0,
        })
    }
}

/// A session reachable from more than one task.
///
/// Holding the guard is the run token: a second run on the same session is
/// refused instead of queued.
pub struct SharedSession {
    id: SessionId,
    inner: Mutex<AgentSession>,
}

impl SharedSession {
    pub fn new(session: AgentSession) -> Self {
        Self {
            id: session.id.clone(),
            inner: Mutex::new(session),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Take the session only if nobody is running it.
    pub fn try_claim(&self) -> Result<MutexGuard<'_, AgentSession>, LoopError> {
        self.inner
            .try_lock()
            .map_err(|_| LoopError::AlreadyRunning(self.id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawloop_core::message::Role;
    use clawloop_core::todo::TodoItem;
    use clawloop_core::workspace::Workspace;

    fn root(max_depth: usize) -> AgentSession {
        AgentSession::root(
            SessionId::from("root"),
            Context::new(Workspace::default()),
            max_depth,
        )
    }

    #[test]
    fn child_is_one_level_down_with_isolated_context() {
        let mut parent = root(1);
        parent.context.push(clawloop_core::message::Message::user("parent chatter"));
        parent.context.todo_list = vec![TodoItem {
            id: 0,
            description: "parent todo".into(),
            completed: false,
        }];

        let child = parent.spawn_child("find all TODOs").unwrap();
        assert_eq!(child.depth(), 1);
        assert_eq!(child.context.len(), 1);
        assert_eq!(child.context.messages()[0].role, Role::User);
        assert_eq!(child.context.messages()[0].content, "find all TODOs");
        assert!(child.context.todo_list.is_empty());
        assert!(child.id().as_str().starts_with("root-sub1-0-"));
        assert_eq!(parent.children_spawned(), 1);
    }

    #[test]
    fn spawning_at_max_depth_fails_closed() {
        let mut parent = root(1);
        let mut child = parent.spawn_child("task").unwrap();
        let err = child.spawn_child("deeper").unwrap_err();
        assert_eq!(err, SpawnError::DepthExceeded { depth: 1, max_depth: 1 });
        assert_eq!(child.children_spawned(), 0);
    }

    #[test]
    fn zero_max_depth_disables_sub_agents() {
        let mut parent = root(0);
        assert!(!parent.can_spawn());
        assert!(parent.spawn_child("task").is_err());
    }

    #[test]
    fn sibling_ids_are_distinct() {
        let mut parent = root(1);
        let a = parent.spawn_child("a").unwrap();
        let b = parent.spawn_child("b").unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn reused_root_id_never_repeats_child_ids() {
        let first = root(1).spawn_child("a").unwrap();
        let second = root(1).spawn_child("a").unwrap();
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn shared_session_refuses_a_second_claim() {
        let shared = SharedSession::new(root(1));
        let guard = shared.try_claim().unwrap();
        let err = shared.try_claim().unwrap_err();
        assert!(matches!(err, LoopError::AlreadyRunning(ref id) if id == "root"));
        drop(guard);
        assert!(shared.try_claim().is_ok());
    }
}
