//! Events crossing the boundary to the observer, and the commands it sends back.
//!
//! ```text
//! outbound  {"command":"log","id":..,"parentId":..,"message":{..}}
//!           {"command":"promptForm","formRequest":{"id":..,"parentId":..,"message":..,"schema":..}}
//! inbound   {"command":"formResponse","formResponse":{"id":..,"isCancelled":..,"formData":..}}
//!           {"command":"cancelTask","id":..}
//! ```

mod message;
mod view;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use message::{LogMessage, MessageType, ProgressState};
pub use view::TaskView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum Event {
    #[serde(rename = "log")]
    Log {
        id: String,
        #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<String>,
        message: LogMessage,
    },

    #[serde(rename = "promptForm")]
    PromptForm {
        #[serde(rename = "formRequest")]
        form_request: FormRequest,
    },
}

impl Event {
    /// Id of the task (for `log`) or form request (for `promptForm`).
    pub fn id(&self) -> &str {
        match self {
            Self::Log { id, .. } => id,
            Self::PromptForm { form_request } => &form_request.id,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Self::Log { parent_id, .. } => parent_id.as_deref(),
            Self::PromptForm { form_request } => Some(&form_request.parent_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRequest {
    pub id: String,
    pub parent_id: String,
    pub message: String,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub id: String,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Value>,
}

impl FormResponse {
    pub fn submit(id: impl Into<String>, form_data: Value) -> Self {
        Self {
            id: id.into(),
            is_cancelled: false,
            form_data: Some(form_data),
        }
    }

    pub fn cancel(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_cancelled: true,
            form_data: None,
        }
    }
}

/// Commands sent by the observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum InboundCommand {
    #[serde(rename = "formResponse")]
    FormResponse {
        #[serde(rename = "formResponse")]
        form_response: FormResponse,
    },

    #[serde(rename = "cancelTask")]
    CancelTask { id: String },
}
