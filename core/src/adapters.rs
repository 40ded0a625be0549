//! Text-plus-severity helpers on top of [`TaskEmitter`] and [`TaskContext`].

use crate::event::{LogMessage, MessageType};
use crate::task::{TaskContext, TaskEmitter};

/// First line becomes the summary, the rest (if any) the detail.
pub fn text_message(text: &str, kind: MessageType) -> LogMessage {
    let text = text.trim_end();
    let message = match text.split_once('\n') {
        Some((summary, detail)) => LogMessage::summary(summary.trim_end()).with_detail(detail),
        None => LogMessage::summary(text),
    };
    message.with_kind(kind)
}

impl TaskEmitter {
    pub fn message(&self, text: &str, kind: MessageType) {
        self.log(text_message(text, kind));
    }

    pub fn info(&self, text: &str) {
        self.message(text, MessageType::Info);
    }

    pub fn success(&self, text: &str) {
        self.message(text, MessageType::Success);
    }

    pub fn warn(&self, text: &str) {
        self.message(text, MessageType::Warning);
    }

    pub fn error(&self, text: &str) {
        self.message(text, MessageType::Error);
    }
}

impl TaskContext {
    /// Replace this task's summary/detail with `text`.
    pub fn update_text(&self, text: &str, kind: MessageType) {
        self.update(text_message(text, kind));
    }
}
