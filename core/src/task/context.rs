use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::event::LogMessage;

use super::emitter::TaskEmitter;

/// Handle given to a runner: its own id, an updater, a child emitter, the
/// cancellation token and form access.
#[derive(Clone)]
pub struct TaskContext {
    id: String,
    parent_id: Option<String>,
    token: CancellationToken,
    emitter: TaskEmitter,
}

impl TaskContext {
    pub(crate) fn new(
        id: String,
        parent_id: Option<String>,
        token: CancellationToken,
        emitter: TaskEmitter,
    ) -> Self {
        Self {
            id,
            parent_id,
            token,
            emitter,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Emitter for child tasks of this task.
    pub fn emitter(&self) -> &TaskEmitter {
        &self.emitter
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Re-emit this task's log entry with only the given fields.
    pub fn update(&self, update: LogMessage) {
        self.emitter.emit_as(&self.id, self.parent_id.clone(), update);
    }

    pub fn set_progress(&self, progress: f64) {
        self.update(LogMessage::progress(progress));
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn check_cancelled(&self) -> Result<(), TaskError> {
        if self.token.is_cancelled() {
            Err(TaskError::cancelled(format!("task {} cancelled", self.id)))
        } else {
            Ok(())
        }
    }

    /// Race `work` against this task's token.
    pub async fn until_cancelled<T, F>(&self, work: F) -> Result<T, TaskError>
    where
        F: Future<Output = Result<T, TaskError>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(TaskError::cancelled(format!("task {} cancelled", self.id))),
            res = work => res,
        }
    }

    /// Abort-aware sleep.
    pub async fn sleep(&self, duration: Duration) -> Result<(), TaskError> {
        self.until_cancelled(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }

    /// Ask the observer for structured input and decode the answer.
    pub async fn request_form<T: DeserializeOwned>(
        &self,
        message: impl Into<String>,
        schema: Value,
    ) -> Result<T, TaskError> {
        let value = self.request_form_value(message, schema).await?;
        serde_json::from_value(value).map_err(|e| TaskError::InvalidFormData {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }

    pub async fn request_form_value(
        &self,
        message: impl Into<String>,
        schema: Value,
    ) -> Result<Value, TaskError> {
        let forms = self.emitter.forms().ok_or(TaskError::NoFormBridge)?;
        forms.request(&self.id, message, schema).await
    }
}
