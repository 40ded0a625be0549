use std::collections::HashMap;

use super::{Event, FormRequest, LogMessage, ProgressState};

/// Observer-side fold of an event history.
///
/// Applies partial `log` updates per id the way a UI would, and remembers
/// every progress value seen for each task.
#[derive(Debug, Default, Clone)]
pub struct TaskView {
    order: Vec<String>,
    entries: HashMap<String, ViewEntry>,
    forms: Vec<FormRequest>,
}

#[derive(Debug, Default, Clone)]
struct ViewEntry {
    parent_id: Option<String>,
    message: LogMessage,
    progress: Vec<f64>,
}

impl TaskView {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut view = Self::default();
        for event in events {
            view.apply(event);
        }
        view
    }

    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Log {
                id,
                parent_id,
                message,
            } => {
                let entry = match self.entries.get_mut(id) {
                    Some(entry) => entry,
                    None => {
                        self.order.push(id.clone());
                        self.entries.entry(id.clone()).or_default()
                    }
                };
                if parent_id.is_some() {
                    entry.parent_id = parent_id.clone();
                }
                entry.message.merge(message);
                if let Some(p) = message.progress {
                    entry.progress.push(p);
                }
            }
            Event::PromptForm { form_request } => self.forms.push(form_request.clone()),
        }
    }

    /// Task ids in order of first appearance.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn message(&self, id: &str) -> Option<&LogMessage> {
        self.entries.get(id).map(|e| &e.message)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.entries.get(id).and_then(|e| e.parent_id.as_deref())
    }

    pub fn children_of(&self, id: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|child| self.parent_of(child) == Some(id))
            .map(String::as_str)
            .collect()
    }

    /// First id whose current summary equals `summary`.
    pub fn find_by_summary(&self, summary: &str) -> Option<&str> {
        self.order
            .iter()
            .find(|id| {
                self.entries
                    .get(*id)
                    .and_then(|e| e.message.summary.as_deref())
                    == Some(summary)
            })
            .map(String::as_str)
    }

    pub fn progress_history(&self, id: &str) -> &[f64] {
        self.entries
            .get(id)
            .map(|e| e.progress.as_slice())
            .unwrap_or(&[])
    }

    pub fn state(&self, id: &str) -> Option<ProgressState> {
        self.message(id)
            .and_then(|m| m.progress)
            .map(ProgressState::classify)
    }

    pub fn forms(&self) -> &[FormRequest] {
        &self.forms
    }
}
