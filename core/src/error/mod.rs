pub mod task;

pub use task::{ErrorCode, TaskError};
