//! One session per UI panel: owns the registry, the form bridge, the id
//! space and the sink; routes inbound commands; tears everything down.

mod hub;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::TaskError;
use crate::event::InboundCommand;
use crate::form::FormBridge;
use crate::ids::IdGenerator;
use crate::registry::TaskRegistry;
use crate::sink::SharedSink;
use crate::task::TaskEmitter;

pub use hub::SessionHub;

/// What a session teardown cleaned up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Teardown {
    pub tasks_cancelled: usize,
    pub forms_rejected: usize,
}

pub struct TaskSession {
    ids: Arc<IdGenerator>,
    registry: Arc<TaskRegistry>,
    forms: Option<Arc<FormBridge>>,
    root: TaskEmitter,
    closed: AtomicBool,
}

impl TaskSession {
    /// Session with a form bridge.
    pub fn new(sink: SharedSink) -> Self {
        Self::with_config(sink, &SessionConfig::default())
    }

    /// Session without a form bridge; `request_form` fails fast.
    pub fn without_forms(sink: SharedSink) -> Self {
        Self::with_config(
            sink,
            &SessionConfig {
                forms_enabled: false,
            },
        )
    }

    pub fn with_config(sink: SharedSink, cfg: &SessionConfig) -> Self {
        let ids = Arc::new(IdGenerator::new());
        let registry = Arc::new(TaskRegistry::new());
        let forms = cfg
            .forms_enabled
            .then(|| Arc::new(FormBridge::new(sink.clone(), ids.clone())));
        let root = TaskEmitter::new(sink, registry.clone(), ids.clone(), forms.clone());

        tracing::info!(session = %ids.prefix(), forms = cfg.forms_enabled, "session opened");

        Self {
            ids,
            registry,
            forms,
            root,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        self.ids.prefix()
    }

    /// Root emitter; tasks created through it have no parent.
    pub fn emitter(&self) -> TaskEmitter {
        self.root.clone()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn forms(&self) -> Option<&FormBridge> {
        self.forms.as_deref()
    }

    pub fn cancel_task(&self, id: &str) -> usize {
        self.registry.cancel_task(id)
    }

    /// Route one command from the observer.
    ///
    /// Cancelling an unknown task is fine; answering an unknown form is an
    /// error and changes nothing.
    pub fn handle_inbound(&self, command: InboundCommand) -> Result<(), TaskError> {
        match command {
            InboundCommand::CancelTask { id } => {
                let cancelled = self.cancel_task(&id);
                if cancelled == 0 {
                    tracing::debug!(task_id = %id, "cancel for task not running");
                }
                Ok(())
            }
            InboundCommand::FormResponse { form_response } => match &self.forms {
                Some(forms) => forms.respond(form_response),
                None => Err(TaskError::NoFormBridge),
            },
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Cancel every live task and reject every pending form. Tasks and
    /// forms started afterwards fail with a cancellation error. Idempotent.
    pub fn close(&self) -> Teardown {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Teardown::default();
        }
        let teardown = Teardown {
            tasks_cancelled: self.registry.close(),
            forms_rejected: self.forms.as_ref().map(|f| f.close()).unwrap_or(0),
        };
        tracing::info!(
            session = %self.id(),
            tasks = teardown.tasks_cancelled,
            forms = teardown.forms_rejected,
            "session closed"
        );
        teardown
    }
}

impl Drop for TaskSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FormResponse, LogMessage};
    use crate::sink::RecordingSink;
    use serde_json::json;

    #[tokio::test]
    async fn cancel_unknown_task_is_ok() {
        let session = TaskSession::new(RecordingSink::new());
        session
            .handle_inbound(InboundCommand::CancelTask {
                id: "task-nope-1".into(),
            })
            .unwrap();
    }

    #[test]
    fn form_response_without_bridge_is_rejected() {
        let session = TaskSession::without_forms(RecordingSink::new());
        let err = session
            .handle_inbound(InboundCommand::FormResponse {
                form_response: FormResponse::cancel("form-x-1"),
            })
            .unwrap_err();
        assert!(matches!(err, TaskError::NoFormBridge));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let session = TaskSession::new(RecordingSink::new());
        let emitter = session.emitter();
        let task = tokio::spawn(async move {
            emitter
                .run(LogMessage::summary("ask"), |ctx| async move {
                    ctx.request_form_value("continue?", json!({ "type": "boolean" }))
                        .await
                })
                .await
        });
        while session.forms().map(|f| f.pending_count()) != Some(1) {
            tokio::task::yield_now().await;
        }

        let first = session.close();
        assert_eq!(first.tasks_cancelled, 1);
        assert_eq!(first.forms_rejected, 1);
        assert_eq!(session.close(), Teardown::default());
        assert!(task.await.unwrap().unwrap_err().is_cancelled());
        assert!(session.registry().is_empty());
    }

    #[tokio::test]
    async fn closed_session_refuses_new_tasks() {
        let sink = RecordingSink::new();
        let session = TaskSession::new(sink.clone());
        session.close();

        let started = std::sync::atomic::AtomicBool::new(false);
        let err = session
            .emitter()
            .run(LogMessage::summary("late"), |_ctx| async {
                started.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!started.load(std::sync::atomic::Ordering::SeqCst));
        assert!(session.registry().is_empty());
        assert!(sink.is_empty());
    }
}
