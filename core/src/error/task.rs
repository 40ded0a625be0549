use std::sync::Arc;

use thiserror::Error;

/// Protocol-level error codes carried alongside a [`TaskError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    GeneralError = 1,
    ValidationError = 3,
    TaskNotFound = 10,
    Cancelled = 31,
    FormError = 70,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Failure of a task, a combinator or a form request.
///
/// Cloneable so that one failure can settle every sibling waiting on it.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("{0}")]
    Runner(Arc<anyhow::Error>),

    #[error("form requests are unavailable: no form bridge attached")]
    NoFormBridge,

    #[error("unknown form request: {0}")]
    UnknownFormRequest(String),

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("form response '{id}' has unexpected shape: {reason}")]
    InvalidFormData { id: String, reason: String },

    #[error("sibling index {index} out of range ({len} siblings)")]
    UnknownSibling { index: usize, len: usize },
}

impl TaskError {
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled(reason.into())
    }

    pub fn runner(err: impl Into<anyhow::Error>) -> Self {
        Self::Runner(Arc::new(err.into()))
    }

    /// Shorthand for a runner failure carrying only a message.
    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self::Runner(Arc::new(anyhow::anyhow!("{message}")))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Cancelled(_) => ErrorCode::Cancelled,
            Self::Runner(_) => ErrorCode::GeneralError,
            Self::NoFormBridge => ErrorCode::FormError,
            Self::UnknownFormRequest(_) => ErrorCode::FormError,
            Self::InvalidFormData { .. } => ErrorCode::FormError,
            Self::DuplicateTaskId(_) => ErrorCode::ValidationError,
            Self::UnknownSibling { .. } => ErrorCode::TaskNotFound,
        }
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runner(Arc::new(err))
    }
}

impl From<tokio::task::JoinError> for TaskError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self::cancelled("task aborted")
        } else {
            Self::msg(format!("task panicked: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_distinguishable() {
        let err = TaskError::cancelled("user request");
        assert!(err.is_cancelled());
        assert_eq!(err.error_code(), ErrorCode::Cancelled);
        assert_eq!(err.to_string(), "cancelled: user request");
    }

    #[test]
    fn runner_failure_keeps_message() {
        let err: TaskError = anyhow::anyhow!("git push rejected").into();
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "git push rejected");
        assert_eq!(err.clone().to_string(), err.to_string());
    }
}
