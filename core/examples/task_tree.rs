//! Runs a small task tree against an in-memory sink and prints the events.

use std::time::Duration;

use anyhow::Result;
use tasklog_core::{
    concurrent, runner, Event, LogMessage, RecordingSink, TaskContext, TaskError, TaskSession,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let sink = RecordingSink::new();
    let session = TaskSession::new(sink.clone());

    let fetches = ["origin", "upstream", "fork"]
        .into_iter()
        .enumerate()
        .map(|(i, remote)| {
            runner(move |ctx: TaskContext| async move {
                ctx.update(LogMessage::default().with_detail(format!("fetching {remote}")));
                ctx.sleep(Duration::from_millis(50 * (i as u64 + 1))).await?;
                Ok::<_, TaskError>(remote)
            })
        })
        .collect();

    let remotes = session
        .emitter()
        .run(LogMessage::summary("Fetch remotes"), concurrent(fetches))
        .await?;
    session.emitter().info(&format!("fetched {}", remotes.join(", ")));

    for event in sink.events() {
        let line = serde_json::to_string(&event)?;
        match event {
            Event::Log { .. } => println!("log    {line}"),
            Event::PromptForm { .. } => println!("prompt {line}"),
        }
    }
    Ok(())
}
