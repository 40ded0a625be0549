use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::event::{Event, LogMessage, MessageType};
use crate::form::FormBridge;
use crate::ids::IdGenerator;
use crate::registry::TaskRegistry;
use crate::sink::SharedSink;

use super::context::TaskContext;

/// Detail text attached to the failure event of a cancelled task.
pub const CANCELLED_DETAIL: &str = "Cancelled";

/// Detail text attached to the failure event of a task whose runner panicked.
pub const PANICKED_DETAIL: &str = "Panicked";

/// Everything an emitter shares with its session.
pub(crate) struct EmitterShared {
    pub(crate) sink: SharedSink,
    pub(crate) registry: Arc<TaskRegistry>,
    pub(crate) ids: Arc<IdGenerator>,
    pub(crate) forms: Option<Arc<FormBridge>>,
}

/// Creates task nodes under one parent (or at the root).
///
/// Cheap to clone. Every clone shares the session's sink, registry, id
/// generator and form bridge.
#[derive(Clone)]
pub struct TaskEmitter {
    shared: Arc<EmitterShared>,
    parent_id: Option<String>,
    parent_token: Option<CancellationToken>,
}

impl TaskEmitter {
    pub fn new(
        sink: SharedSink,
        registry: Arc<TaskRegistry>,
        ids: Arc<IdGenerator>,
        forms: Option<Arc<FormBridge>>,
    ) -> Self {
        Self {
            shared: Arc::new(EmitterShared {
                sink,
                registry,
                ids,
                forms,
            }),
            parent_id: None,
            parent_token: None,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.shared.registry
    }

    pub(crate) fn forms(&self) -> Option<&Arc<FormBridge>> {
        self.shared.forms.as_ref()
    }

    /// Emitter whose tasks are children of `parent_id`.
    pub fn child(&self, parent_id: impl Into<String>) -> Self {
        Self {
            shared: self.shared.clone(),
            parent_id: Some(parent_id.into()),
            parent_token: None,
        }
    }

    /// Child emitter of a running task. Tokens of its tasks are children
    /// of `token`, so cancelling the task reaches them even before they
    /// are registered.
    fn child_of(&self, parent_id: &str, token: &CancellationToken) -> Self {
        Self {
            shared: self.shared.clone(),
            parent_id: Some(parent_id.to_string()),
            parent_token: Some(token.clone()),
        }
    }

    pub(crate) fn emit_log(&self, id: &str, message: LogMessage) {
        self.emit_as(id, self.parent_id.clone(), message);
    }

    pub(crate) fn emit_as(&self, id: &str, parent_id: Option<String>, message: LogMessage) {
        self.shared.sink.emit(Event::Log {
            id: id.to_string(),
            parent_id,
            message,
        });
    }

    /// Emit a plain log line. Not tracked and not cancellable.
    pub fn log(&self, descriptor: LogMessage) {
        let id = self.shared.ids.next_task_id();
        self.emit_log(&id, descriptor);
    }

    /// Run `runner` as a tracked, cancellable task.
    ///
    /// The runner's error is always returned unchanged after the failure
    /// event has been emitted. The registry entry is gone by the time this
    /// settles, whatever the outcome.
    pub async fn run<T, F, Fut>(&self, descriptor: LogMessage, runner: F) -> Result<T, TaskError>
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        let id = self.shared.ids.next_task_id();
        let token = match &self.parent_token {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        self.shared
            .registry
            .insert(&id, token.clone(), self.parent_id.clone())?;
        let mut entry = RegistryEntryGuard {
            emitter: self,
            id: &id,
            settled: false,
        };

        self.emit_log(&id, descriptor);
        tracing::debug!(task_id = %id, parent_id = ?self.parent_id, "task started");
        self.emit_log(&id, LogMessage::progress(0.0));

        let ctx = TaskContext::new(
            id.clone(),
            self.parent_id.clone(),
            token.clone(),
            self.child_of(&id, &token),
        );
        let outcome = runner(ctx).await;
        entry.settled = true;

        match &outcome {
            Ok(_) => {
                tracing::debug!(task_id = %id, "task succeeded");
                self.emit_log(&id, LogMessage::progress(1.0));
            }
            Err(err) if err.is_cancelled() => {
                tracing::debug!(task_id = %id, reason = %err, "task cancelled");
                self.emit_log(&id, cancelled_update());
            }
            Err(err) => {
                tracing::debug!(task_id = %id, error = %err, "task failed");
                self.emit_log(
                    &id,
                    LogMessage::default()
                        .with_kind(MessageType::Error)
                        .with_detail(err.to_string())
                        .with_progress(-1.0),
                );
            }
        }

        outcome
    }
}

fn cancelled_update() -> LogMessage {
    LogMessage::default()
        .with_kind(MessageType::Warning)
        .with_detail(CANCELLED_DETAIL)
        .with_progress(-1.0)
}

/// Removes the registry entry when `run` settles or its future is dropped.
/// A drop before the runner settled (abort or panic) still reports a
/// terminal state to the observer.
struct RegistryEntryGuard<'a> {
    emitter: &'a TaskEmitter,
    id: &'a str,
    settled: bool,
}

impl Drop for RegistryEntryGuard<'_> {
    fn drop(&mut self) {
        self.emitter.shared.registry.remove(self.id);
        if self.settled {
            return;
        }
        let update = if std::thread::panicking() {
            tracing::debug!(task_id = %self.id, "task panicked");
            LogMessage::default()
                .with_kind(MessageType::Error)
                .with_detail(PANICKED_DETAIL)
                .with_progress(-1.0)
        } else {
            tracing::debug!(task_id = %self.id, "task dropped");
            cancelled_update()
        };
        self.emitter.emit_log(self.id, update);
    }
}
