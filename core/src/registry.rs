use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

#[derive(Debug)]
struct RegistryEntry {
    token: CancellationToken,
    parent_id: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    closed: bool,
    entries: HashMap<String, RegistryEntry>,
}

/// Live task tree of one session: task id -> (token, parent id).
///
/// Only running tasks are present. Children are found by scanning for
/// entries whose parent matches, so no back-references are kept. Once
/// closed, new tasks are refused.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    state: Mutex<RegistryState>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(
        &self,
        id: &str,
        token: CancellationToken,
        parent_id: Option<String>,
    ) -> Result<(), TaskError> {
        let mut state = self.lock();
        if state.closed {
            return Err(TaskError::cancelled("session closed"));
        }
        if state.entries.contains_key(id) {
            return Err(TaskError::DuplicateTaskId(id.to_string()));
        }
        state
            .entries
            .insert(id.to_string(), RegistryEntry { token, parent_id });
        Ok(())
    }

    /// Drop the entry without cancelling it. Returns whether it was present.
    pub fn remove(&self, id: &str) -> bool {
        self.lock().entries.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().entries.contains_key(id)
    }

    pub fn parent_of(&self, id: &str) -> Option<String> {
        self.lock().entries.get(id).and_then(|e| e.parent_id.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.lock().entries.keys().cloned().collect()
    }

    /// Cancel `id` and, transitively, every registered descendant.
    ///
    /// Unknown or already finished ids are a no-op. Returns the number of
    /// tokens cancelled.
    pub fn cancel_task(&self, id: &str) -> usize {
        let mut state = self.lock();
        let cancelled = cancel_subtree(&mut state.entries, id);
        if cancelled > 0 {
            tracing::debug!(task_id = %id, cancelled, "cancelled task subtree");
        }
        cancelled
    }

    /// Cancel every registered token and clear the registry.
    pub fn cancel_all(&self) -> usize {
        cancel_entries(&mut self.lock().entries)
    }

    /// Cancel everything and refuse further inserts. Idempotent.
    pub fn close(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;
        cancel_entries(&mut state.entries)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

fn cancel_entries(entries: &mut HashMap<String, RegistryEntry>) -> usize {
    let count = entries.len();
    for (_, entry) in entries.drain() {
        entry.token.cancel();
    }
    count
}

fn cancel_subtree(entries: &mut HashMap<String, RegistryEntry>, id: &str) -> usize {
    let mut cancelled = 0;
    if let Some(entry) = entries.remove(id) {
        entry.token.cancel();
        cancelled += 1;
    }

    let children: Vec<String> = entries
        .iter()
        .filter(|(_, e)| e.parent_id.as_deref() == Some(id))
        .map(|(child, _)| child.clone())
        .collect();

    for child in children {
        cancelled += cancel_subtree(entries, &child);
    }
    cancelled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(reg: &TaskRegistry, id: &str, parent: Option<&str>) -> CancellationToken {
        let token = CancellationToken::new();
        reg.insert(id, token.clone(), parent.map(str::to_string))
            .unwrap();
        token
    }

    #[test]
    fn cancel_propagates_to_descendants() {
        let reg = TaskRegistry::new();
        let root = register(&reg, "root", None);
        let child = register(&reg, "child", Some("root"));
        let grandchild = register(&reg, "grandchild", Some("child"));
        let other = register(&reg, "other", None);

        assert_eq!(reg.cancel_task("root"), 3);
        assert!(root.is_cancelled());
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
        assert!(!other.is_cancelled());
        assert_eq!(reg.ids(), vec!["other".to_string()]);
    }

    #[test]
    fn cancel_reaches_children_of_finished_parent() {
        let reg = TaskRegistry::new();
        let orphan = register(&reg, "child", Some("gone"));
        assert_eq!(reg.cancel_task("gone"), 1);
        assert!(orphan.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let reg = TaskRegistry::new();
        register(&reg, "a", None);
        assert_eq!(reg.cancel_task("a"), 1);
        assert_eq!(reg.cancel_task("a"), 0);
        assert_eq!(reg.cancel_task("never-registered"), 0);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let reg = TaskRegistry::new();
        register(&reg, "a", None);
        let err = reg
            .insert("a", CancellationToken::new(), None)
            .unwrap_err();
        assert!(matches!(err, TaskError::DuplicateTaskId(id) if id == "a"));
    }

    #[test]
    fn cancel_all_clears() {
        let reg = TaskRegistry::new();
        let a = register(&reg, "a", None);
        let b = register(&reg, "b", Some("a"));
        assert_eq!(reg.cancel_all(), 2);
        assert!(a.is_cancelled() && b.is_cancelled());
        assert!(reg.is_empty());
    }

    #[test]
    fn closed_registry_refuses_new_tasks() {
        let reg = TaskRegistry::new();
        let a = register(&reg, "a", None);
        assert_eq!(reg.close(), 1);
        assert!(a.is_cancelled());
        assert!(reg.is_closed());

        let err = reg
            .insert("b", CancellationToken::new(), None)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(reg.is_empty());
        assert_eq!(reg.close(), 0);
    }
}
