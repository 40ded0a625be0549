#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tasklog_core::event::{Event, TaskView};
use tasklog_core::{RecordingSink, TaskSession};

pub fn session() -> (TaskSession, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    (TaskSession::new(sink.clone()), sink)
}

/// Poll `cond` until it holds. Sleeps between polls so paused-clock tests
/// can auto-advance.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    while !cond() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Summaries of tasks in the order they reported success.
pub fn success_order(events: &[Event], view: &TaskView) -> Vec<String> {
    events
        .iter()
        .filter_map(|ev| match ev {
            Event::Log { id, message, .. } if message.progress == Some(1.0) => {
                view.message(id).and_then(|m| m.summary.clone())
            }
            _ => None,
        })
        .collect()
}
