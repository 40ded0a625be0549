//! Demo task trees driven by `tasklog demo`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tasklog_core::{
    concurrent, concurrent_labeled, dependent, dependent_runner, runner, LogMessage, MessageType,
    Runner, TaskContext, TaskEmitter, TaskError,
};

use crate::commands::cli::Scenario;

/// Run `scenario` under `emitter` and return a one-line outcome.
pub async fn run_scenario(
    scenario: Scenario,
    emitter: TaskEmitter,
    step: Duration,
) -> Result<String, TaskError> {
    match scenario {
        Scenario::Concurrent => fetch_remotes(&emitter, step).await,
        Scenario::Dependent => release_pipeline(&emitter, step).await,
        Scenario::Form => commit_changes(&emitter, step).await,
        Scenario::Nested => index_workspace(&emitter, step).await,
    }
}

async fn fetch_remotes(emitter: &TaskEmitter, step: Duration) -> Result<String, TaskError> {
    let remotes = [("origin", 3), ("upstream", 1), ("fork", 2)];
    let fetches: Vec<(String, Runner<String>)> = remotes
        .into_iter()
        .map(|(remote, units)| {
            let fetch = runner(move |ctx: TaskContext| async move {
                ctx.update(LogMessage::default().with_detail(format!("git fetch {remote}")));
                ctx.sleep(step * units).await?;
                Ok::<_, TaskError>(remote.to_string())
            });
            (format!("Fetch {remote}"), fetch)
        })
        .collect();

    let fetched = emitter
        .run(LogMessage::summary("Fetch remotes"), concurrent_labeled(fetches))
        .await?;
    Ok(format!("fetched {}", fetched.join(", ")))
}

async fn release_pipeline(emitter: &TaskEmitter, step: Duration) -> Result<String, TaskError> {
    let build = dependent_runner(move |ctx: TaskContext, _siblings| async move {
        ctx.update(LogMessage::default().with_detail("cargo build --release"));
        ctx.sleep(step * 2).await?;
        Ok::<_, TaskError>("artifact-0.1.0.tar.gz".to_string())
    });
    let test = dependent_runner(move |ctx: TaskContext, siblings| async move {
        let artifact: String = siblings.get(0).await?;
        ctx.update(LogMessage::default().with_detail(format!("testing {artifact}")));
        ctx.sleep(step).await?;
        Ok::<_, TaskError>("42 passed".to_string())
    });
    let package = dependent_runner(move |ctx: TaskContext, siblings| async move {
        let before: Vec<String> = siblings.preceding(2).await?;
        ctx.update(LogMessage::default().with_detail(format!("signing {}", before[0])));
        ctx.sleep(step).await?;
        Ok::<_, TaskError>(format!("{} ({})", before[0], before[1]))
    });

    let results = emitter
        .run(
            LogMessage::summary("Release pipeline"),
            dependent(vec![build, test, package]),
        )
        .await?;
    Ok(format!("released {}", results[2]))
}

#[derive(Debug, Deserialize)]
struct CommitForm {
    message: String,
    #[serde(default)]
    push: bool,
}

async fn commit_changes(emitter: &TaskEmitter, step: Duration) -> Result<String, TaskError> {
    emitter
        .run(
            LogMessage::summary("Commit changes"),
            move |ctx: TaskContext| async move {
                let form: CommitForm = ctx
                    .request_form(
                        "Describe the commit",
                        json!({
                            "type": "object",
                            "required": ["message"],
                            "properties": {
                                "message": { "type": "string" },
                                "push": { "type": "boolean", "default": false }
                            }
                        }),
                    )
                    .await?;

                ctx.emitter().message(
                    &format!("git commit -m {:?}\n1 file changed", form.message),
                    MessageType::Info,
                );
                ctx.set_progress(0.5);

                if form.push {
                    ctx.emitter()
                        .run(LogMessage::summary("Push"), |push: TaskContext| async move {
                            push.sleep(step).await
                        })
                        .await?;
                }
                Ok::<_, TaskError>(format!("committed {:?}", form.message))
            },
        )
        .await
}

fn index_folder(folder: &'static str, files: u32, step: Duration) -> Runner<u32> {
    runner(move |ctx: TaskContext| async move {
        for n in 1..=files {
            ctx.emitter()
                .run(
                    LogMessage::summary(format!("{folder}/file{n}.rs")),
                    |file: TaskContext| async move { file.sleep(step).await },
                )
                .await?;
            ctx.set_progress(f64::from(n) / f64::from(files + 1));
        }
        Ok::<_, TaskError>(files)
    })
}

async fn index_workspace(emitter: &TaskEmitter, step: Duration) -> Result<String, TaskError> {
    let folders = vec![
        index_folder("src", 40, step),
        index_folder("tests", 25, step),
        index_folder("benches", 10, step),
    ];
    let counts = emitter
        .run(LogMessage::summary("Index workspace"), concurrent(folders))
        .await?;
    Ok(format!("indexed {} files", counts.iter().sum::<u32>()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tasklog_core::{FormResponse, InboundCommand, RecordingSink, TaskSession};

    const STEP: Duration = Duration::from_millis(10);

    #[tokio::test(start_paused = true)]
    async fn concurrent_scenario_reports_input_order() {
        let sink = RecordingSink::new();
        let session = TaskSession::new(sink.clone());
        let out = run_scenario(Scenario::Concurrent, session.emitter(), STEP)
            .await
            .unwrap();
        assert_eq!(out, "fetched origin, upstream, fork");
        assert!(session.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dependent_scenario_chains_results() {
        let session = TaskSession::new(RecordingSink::new());
        let out = run_scenario(Scenario::Dependent, session.emitter(), STEP)
            .await
            .unwrap();
        assert_eq!(out, "released artifact-0.1.0.tar.gz (42 passed)");
    }

    #[tokio::test(start_paused = true)]
    async fn form_scenario_waits_for_answer() {
        let sink = RecordingSink::new();
        let session = Arc::new(TaskSession::new(sink.clone()));

        let responder = {
            let session = session.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                loop {
                    if let Some(form) = sink.view().forms().first().cloned() {
                        session
                            .handle_inbound(InboundCommand::FormResponse {
                                form_response: FormResponse::submit(
                                    form.id,
                                    json!({ "message": "fix typo", "push": true }),
                                ),
                            })
                            .unwrap();
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
        };

        let out = run_scenario(Scenario::Form, session.emitter(), STEP)
            .await
            .unwrap();
        responder.await.unwrap();
        assert_eq!(out, "committed \"fix typo\"");
        assert!(sink.view().find_by_summary("Push").is_some());
    }

    #[tokio::test]
    async fn form_scenario_without_bridge_fails() {
        let session = TaskSession::without_forms(RecordingSink::new());
        let err = run_scenario(Scenario::Form, session.emitter(), STEP)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::NoFormBridge));
    }

    #[tokio::test(start_paused = true)]
    async fn nested_scenario_stops_on_cancel() {
        let sink = RecordingSink::new();
        let session = Arc::new(TaskSession::new(sink.clone()));
        let task = {
            let emitter = session.emitter();
            tokio::spawn(async move { run_scenario(Scenario::Nested, emitter, STEP).await })
        };

        while sink.view().find_by_summary("Index workspace").is_none()
            || session.registry().len() < 4
        {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let root = sink
            .view()
            .find_by_summary("Index workspace")
            .unwrap()
            .to_string();
        session
            .handle_inbound(InboundCommand::CancelTask { id: root })
            .unwrap();

        assert!(task.await.unwrap().unwrap_err().is_cancelled());
        tokio::time::sleep(STEP).await;
        assert!(session.registry().is_empty());
    }
}
