use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::TaskError;
use crate::event::{Event, FormRequest, FormResponse};
use crate::ids::IdGenerator;
use crate::sink::SharedSink;

type Reply = oneshot::Sender<Result<Value, TaskError>>;

#[derive(Default)]
struct PendingForms {
    closed: bool,
    requests: HashMap<String, Reply>,
}

/// Correlates outstanding "ask the user" requests with their waiters.
pub struct FormBridge {
    sink: SharedSink,
    ids: Arc<IdGenerator>,
    pending: Mutex<PendingForms>,
}

impl FormBridge {
    pub fn new(sink: SharedSink, ids: Arc<IdGenerator>) -> Self {
        Self {
            sink,
            ids,
            pending: Mutex::new(PendingForms::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PendingForms> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emit a `promptForm` event and wait for the matching response.
    pub async fn request(
        &self,
        parent_id: &str,
        message: impl Into<String>,
        schema: Value,
    ) -> Result<Value, TaskError> {
        let id = self.ids.next_form_id();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.lock();
            if pending.closed {
                return Err(TaskError::cancelled("session closed"));
            }
            pending.requests.insert(id.clone(), tx);
        }
        let _guard = PendingGuard { bridge: self, id: &id };

        tracing::debug!(form_id = %id, parent_id = %parent_id, "form requested");
        self.sink.emit(Event::PromptForm {
            form_request: FormRequest {
                id: id.clone(),
                parent_id: parent_id.to_string(),
                message: message.into(),
                schema,
            },
        });

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(TaskError::cancelled("form request dropped")),
        }
    }

    /// Settle the pending request named by `response.id`.
    pub fn respond(&self, response: FormResponse) -> Result<(), TaskError> {
        let reply = self
            .lock()
            .requests
            .remove(&response.id)
            .ok_or_else(|| TaskError::UnknownFormRequest(response.id.clone()))?;

        let outcome = if response.is_cancelled {
            Err(TaskError::cancelled("form cancelled by user"))
        } else {
            Ok(response.form_data.unwrap_or(Value::Null))
        };

        if reply.send(outcome).is_err() {
            tracing::debug!(form_id = %response.id, "form waiter already gone");
        }
        Ok(())
    }

    /// Reject every pending request and refuse new ones.
    pub fn close(&self) -> usize {
        let requests = {
            let mut pending = self.lock();
            pending.closed = true;
            std::mem::take(&mut pending.requests)
        };
        let count = requests.len();
        for (_, reply) in requests {
            let _ = reply.send(Err(TaskError::cancelled("session closed")));
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.lock().requests.keys().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Removes the table entry when the requesting future settles or is dropped.
struct PendingGuard<'a> {
    bridge: &'a FormBridge,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.bridge.lock().requests.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use serde_json::json;

    fn bridge() -> (Arc<FormBridge>, Arc<RecordingSink>) {
        let sink = RecordingSink::new();
        let ids = Arc::new(IdGenerator::with_prefix("t"));
        (Arc::new(FormBridge::new(sink.clone(), ids)), sink)
    }

    async fn wait_for_pending(bridge: &FormBridge) -> String {
        loop {
            if let Some(id) = bridge.pending_ids().into_iter().next() {
                return id;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn response_resolves_request() {
        let (bridge, sink) = bridge();
        let waiter = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.request("task-t-1", "x", json!({})).await })
        };

        let id = wait_for_pending(&bridge).await;
        assert_eq!(id, "form-t-1");
        bridge
            .respond(FormResponse::submit(&id, json!({ "name": "main" })))
            .unwrap();

        let value = waiter.await.unwrap().unwrap();
        assert_eq!(value, json!({ "name": "main" }));
        assert_eq!(bridge.pending_count(), 0);
        assert_eq!(sink.view().forms()[0].parent_id, "task-t-1");
    }

    #[tokio::test]
    async fn cancelled_response_rejects() {
        let (bridge, _sink) = bridge();
        let waiter = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.request("task-t-1", "x", json!({})).await })
        };
        let id = wait_for_pending(&bridge).await;
        bridge.respond(FormResponse::cancel(&id)).unwrap();
        let err = waiter.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn unknown_response_fails_fast() {
        let (bridge, _sink) = bridge();
        let err = bridge
            .respond(FormResponse::submit("form-t-99", json!(null)))
            .unwrap_err();
        assert!(matches!(err, TaskError::UnknownFormRequest(id) if id == "form-t-99"));
    }

    #[tokio::test]
    async fn close_rejects_pending_and_future_requests() {
        let (bridge, _sink) = bridge();
        let waiter = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.request("task-t-1", "x", json!({})).await })
        };
        wait_for_pending(&bridge).await;

        assert_eq!(bridge.close(), 1);
        assert!(waiter.await.unwrap().unwrap_err().is_cancelled());

        let late = bridge.request("task-t-1", "y", json!({})).await;
        assert!(late.unwrap_err().is_cancelled());
        assert!(bridge.is_closed());
    }

    #[tokio::test]
    async fn dropped_request_leaves_no_entry() {
        let (bridge, _sink) = bridge();
        let handle = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.request("task-t-1", "x", json!({})).await })
        };
        wait_for_pending(&bridge).await;
        handle.abort();
        let _ = handle.await;
        assert_eq!(bridge.pending_count(), 0);
    }
}
