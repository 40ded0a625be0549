//! Hierarchical task orchestration with structured progress reporting.
//!
//! A [`TaskSession`] owns the live task tree of one observer (a UI panel).
//! Runners are started through a [`TaskEmitter`]; each gets a
//! [`TaskContext`] to report progress, spawn child tasks, observe
//! cancellation and ask the observer for structured input.
//!
//! ```text
//! TaskSession ── sink ──────────────► observer (Event::Log / Event::PromptForm)
//!   ├─ TaskRegistry   id -> (token, parent)
//!   ├─ FormBridge     form id -> waiter
//!   └─ TaskEmitter ── run(descriptor, runner)
//!                       └─ TaskContext ── emitter() ── run(..)   (children)
//! observer ── InboundCommand ──► TaskSession::handle_inbound
//! ```

pub mod adapters;
pub mod combinator;
pub mod config;
pub mod error;
pub mod event;
pub mod events_in;
pub mod events_out;
pub mod form;
pub mod ids;
pub mod registry;
pub mod session;
pub mod sink;
pub mod task;

pub use adapters::text_message;
pub use combinator::{
    concurrent, concurrent_labeled, dependent, dependent_runner, DependentRunner, SiblingResults,
};
pub use error::TaskError;
pub use event::{Event, FormRequest, FormResponse, InboundCommand, LogMessage, MessageType};
pub use registry::TaskRegistry;
pub use session::{SessionHub, TaskSession, Teardown};
pub use sink::{EventSink, FnSink, RecordingSink, SharedSink};
pub use task::{runner, Runner, TaskContext, TaskEmitter, TaskFuture};
