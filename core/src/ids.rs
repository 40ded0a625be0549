use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Session-scoped id source.
///
/// Ids are `{kind}-{prefix}-{n}`: the prefix is 8 hex chars of a v4 uuid
/// drawn once per session and `n` is a monotonic counter, so an id is never
/// handed out twice within a session. Task and form ids use separate
/// counters.
#[derive(Debug)]
pub struct IdGenerator {
    prefix: String,
    tasks: AtomicU64,
    forms: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self::with_prefix(&uuid[..8])
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            tasks: AtomicU64::new(0),
            forms: AtomicU64::new(0),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn next_task_id(&self) -> String {
        let n = self.tasks.fetch_add(1, Ordering::Relaxed) + 1;
        format!("task-{}-{}", self.prefix, n)
    }

    pub fn next_form_id(&self) -> String {
        let n = self.forms.fetch_add(1, Ordering::Relaxed) + 1;
        format!("form-{}-{}", self.prefix, n)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
