use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::TaskError;
use crate::task::{Runner, TaskContext, TaskFuture};

use super::concurrent::concurrent;

type Slot<T> = Shared<BoxFuture<'static, Result<T, TaskError>>>;

/// Eventual results of every runner in a dependent group, in input order.
///
/// Each slot is written exactly once, when its runner settles. Awaiting
/// the caller's own slot never completes.
pub struct SiblingResults<T> {
    slots: Arc<Vec<Slot<T>>>,
}

impl<T> Clone for SiblingResults<T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

impl<T> SiblingResults<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Wait for sibling `index`. Its failure is returned as-is.
    pub async fn get(&self, index: usize) -> Result<T, TaskError> {
        let slot = self
            .slots
            .get(index)
            .cloned()
            .ok_or(TaskError::UnknownSibling {
                index,
                len: self.slots.len(),
            })?;
        slot.await
    }

    /// Wait for siblings `0..index`, in order.
    pub async fn preceding(&self, index: usize) -> Result<Vec<T>, TaskError> {
        let mut values = Vec::with_capacity(index);
        for j in 0..index {
            values.push(self.get(j).await?);
        }
        Ok(values)
    }
}

/// Runner that also receives its siblings' eventual results.
pub type DependentRunner<T> =
    Box<dyn FnOnce(TaskContext, SiblingResults<T>) -> TaskFuture<T> + Send>;

/// Box a closure into a [`DependentRunner`].
pub fn dependent_runner<T, F, Fut>(f: F) -> DependentRunner<T>
where
    F: FnOnce(TaskContext, SiblingResults<T>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
{
    Box::new(move |ctx, siblings| f(ctx, siblings).boxed())
}

/// Start every runner concurrently; ordering comes from runners awaiting
/// the siblings they depend on.
///
/// Slots are allocated before anything starts. A runner that fails writes
/// its error into its slot, and a runner that never runs (or is dropped)
/// closes its slot, so dependents reject instead of hanging.
pub fn dependent<T>(runners: Vec<DependentRunner<T>>) -> Runner<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let mut senders = Vec::with_capacity(runners.len());
    let mut slots = Vec::with_capacity(runners.len());
    for _ in 0..runners.len() {
        let (tx, rx) = oneshot::channel::<Result<T, TaskError>>();
        senders.push(tx);
        slots.push(
            rx.map(|res| {
                res.unwrap_or_else(|_| {
                    Err(TaskError::cancelled("sibling finished without a result"))
                })
            })
            .boxed()
            .shared(),
        );
    }
    let siblings = SiblingResults {
        slots: Arc::new(slots),
    };

    let wrapped = runners
        .into_iter()
        .zip(senders)
        .map(|(runner, tx)| {
            let siblings = siblings.clone();
            Box::new(move |ctx: TaskContext| {
                async move {
                    let outcome = runner(ctx, siblings).await;
                    let _ = tx.send(outcome.clone());
                    outcome
                }
                .boxed()
            }) as Runner<T>
        })
        .collect();

    concurrent(wrapped)
}
