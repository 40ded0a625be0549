//! Task emitter: the primitive that creates one task node.
//!
//! ```text
//! emitter.run(descriptor, runner)
//!   ├─ registry.insert(id -> token, parent)   token = parent.child_token()
//!   ├─ log(id, descriptor)
//!   ├─ log(id, progress = 0)
//!   ├─ runner(TaskContext { id, token, child emitter })
//!   ├─ log(id, progress = 1 | -1 + detail)    also on drop or panic
//!   └─ registry.remove(id)
//! ```

mod context;
mod emitter;

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::TaskError;

pub use context::TaskContext;
pub use emitter::{TaskEmitter, CANCELLED_DETAIL, PANICKED_DETAIL};

pub type TaskFuture<T> = BoxFuture<'static, Result<T, TaskError>>;

/// Type-erased runner accepted by the combinators.
pub type Runner<T> = Box<dyn FnOnce(TaskContext) -> TaskFuture<T> + Send>;

/// Box a closure into a [`Runner`].
pub fn runner<T, F, Fut>(f: F) -> Runner<T>
where
    F: FnOnce(TaskContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
{
    Box::new(move |ctx| f(ctx).boxed())
}
