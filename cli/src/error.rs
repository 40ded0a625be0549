use tasklog_core::TaskError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("task failed: {0}")]
    Task(#[from] TaskError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

// 0: success
// 1: task failed
// 11: config error
// 20: IO / command error
// 50: internal/uncategorized
// 130: cancelled
pub fn exit_code_for_error(e: &CliError) -> i32 {
    match e {
        CliError::Config(_) => 11,
        CliError::Command(_) => 20,
        CliError::Io(_) => 20,
        CliError::Task(te) if te.is_cancelled() => 130,
        CliError::Task(_) => 1,
        CliError::Anyhow(_) => 50,
    }
}
