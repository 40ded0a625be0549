use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};

use crate::error::TaskError;
use crate::event::LogMessage;
use crate::task::{Runner, TaskContext};

/// Run every runner as a child task labelled `Task k` (1-based).
pub fn concurrent<T>(runners: Vec<Runner<T>>) -> Runner<Vec<T>>
where
    T: Send + 'static,
{
    let labeled = runners
        .into_iter()
        .enumerate()
        .map(|(k, runner)| (format!("Task {}", k + 1), runner))
        .collect();
    concurrent_labeled(labeled)
}

/// Run every runner concurrently as a child task with the given summary.
///
/// Children are spawned, so a failing child does not stop its siblings;
/// the combinator itself rejects with the first failure in completion
/// order. Child tokens derive from the group's token, so cancelling the
/// group reaches children that have not been polled yet. The parent's progress advances by `1 / N` per success. Results
/// come back in input order.
pub fn concurrent_labeled<T>(runners: Vec<(String, Runner<T>)>) -> Runner<Vec<T>>
where
    T: Send + 'static,
{
    Box::new(move |ctx: TaskContext| {
        async move {
            ctx.check_cancelled()?;

            let total = runners.len();
            let mut pending = FuturesUnordered::new();
            for (index, (label, runner)) in runners.into_iter().enumerate() {
                let emitter = ctx.emitter().clone();
                let handle = tokio::spawn(async move {
                    emitter.run(LogMessage::summary(label), runner).await
                });
                pending.push(async move { (index, handle.await) });
            }

            let mut results: Vec<Option<T>> = (0..total).map(|_| None).collect();
            let mut completed = 0usize;

            while let Some((index, joined)) = pending.next().await {
                let value = joined??;
                results[index] = Some(value);
                completed += 1;
                // The final 1.0 comes from the emitter once we return.
                if completed < total {
                    ctx.set_progress(completed as f64 / total as f64);
                }
            }

            Ok::<_, TaskError>(results.into_iter().flatten().collect())
        }
        .boxed()
    })
}
