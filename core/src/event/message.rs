use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity shown next to a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

/// Payload of a `log` event.
///
/// Every field is optional. An update carries only the fields it changes;
/// absent fields leave the observer's displayed state untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMessage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// `0` started, `(0, 1)` busy, `1` done, negative failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_schema: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<String>>,
}

impl LogMessage {
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Self::default()
        }
    }

    pub fn progress(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: MessageType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_form_schema(mut self, schema: Value) -> Self {
        self.form_schema = Some(schema);
        self
    }

    pub fn with_form_data(mut self, data: Value) -> Self {
        self.form_data = Some(data);
        self
    }

    pub fn with_buttons<I, S>(mut self, buttons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.buttons = Some(buttons.into_iter().map(Into::into).collect());
        self
    }

    /// Apply a partial update: fields present in `update` overwrite ours.
    pub fn merge(&mut self, update: &LogMessage) {
        if update.kind.is_some() {
            self.kind = update.kind;
        }
        if update.summary.is_some() {
            self.summary = update.summary.clone();
        }
        if update.detail.is_some() {
            self.detail = update.detail.clone();
        }
        if update.progress.is_some() {
            self.progress = update.progress;
        }
        if update.form_schema.is_some() {
            self.form_schema = update.form_schema.clone();
        }
        if update.form_data.is_some() {
            self.form_data = update.form_data.clone();
        }
        if update.buttons.is_some() {
            self.buttons = update.buttons.clone();
        }
    }
}

/// Coarse reading of a progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Started,
    Busy,
    Succeeded,
    Failed,
}

impl ProgressState {
    pub fn classify(progress: f64) -> Self {
        if progress < 0.0 {
            Self::Failed
        } else if progress == 0.0 {
            Self::Started
        } else if progress >= 1.0 {
            Self::Succeeded
        } else {
            Self::Busy
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}
