use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::SessionConfig;
use crate::error::TaskError;
use crate::event::InboundCommand;
use crate::sink::SharedSink;

use super::{TaskSession, Teardown};

/// Sessions keyed by UI panel.
#[derive(Default)]
pub struct SessionHub {
    config: SessionConfig,
    sessions: Mutex<HashMap<String, Arc<TaskSession>>>,
}

impl SessionHub {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<TaskSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a session for `panel`, tearing down any previous one.
    pub fn open(&self, panel: &str, sink: SharedSink) -> Arc<TaskSession> {
        let session = Arc::new(TaskSession::with_config(sink, &self.config));
        let previous = self.lock().insert(panel.to_string(), session.clone());
        if let Some(previous) = previous {
            previous.close();
        }
        session
    }

    pub fn get(&self, panel: &str) -> Option<Arc<TaskSession>> {
        self.lock().get(panel).cloned()
    }

    /// Deliver a command to the panel's session. Commands for closed
    /// panels are dropped.
    pub fn route(&self, panel: &str, command: InboundCommand) -> Result<(), TaskError> {
        match self.get(panel) {
            Some(session) => session.handle_inbound(command),
            None => {
                tracing::warn!(panel = %panel, "inbound command for unknown panel");
                Ok(())
            }
        }
    }

    pub fn close(&self, panel: &str) -> Option<Teardown> {
        let session = self.lock().remove(panel)?;
        Some(session.close())
    }

    pub fn close_all(&self) -> Teardown {
        let sessions: Vec<_> = self.lock().drain().map(|(_, s)| s).collect();
        sessions
            .iter()
            .map(|s| s.close())
            .fold(Teardown::default(), |acc, t| Teardown {
                tasks_cancelled: acc.tasks_cancelled + t.tasks_cancelled,
                forms_rejected: acc.forms_rejected + t.forms_rejected,
            })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
