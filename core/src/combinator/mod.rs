//! Combinators that compose several runners into one tracked task.
//!
//! - [`concurrent`]: all-of, results in input order.
//! - [`dependent`]: all-of where each runner can await its siblings.

mod concurrent;
mod dependent;

pub use concurrent::{concurrent, concurrent_labeled};
pub use dependent::{dependent, dependent_runner, DependentRunner, SiblingResults};
