use std::sync::Arc;
use std::time::Duration;

use tasklog_core::config::AppConfig;
use tasklog_core::event::{ProgressState, TaskView};
use tasklog_core::events_in::pump_inbound;
use tasklog_core::events_out::start_events_out;
use tasklog_core::{Event, EventSink, FnSink, RecordingSink, SharedSink, TaskSession};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use crate::commands::cli::DemoArgs;
use crate::error::CliError;
use crate::scenarios::run_scenario;

/// Run one demo scenario over stdio and return the process exit code.
///
/// Events go to the configured `events_out`; stdin is read as JSONL
/// `formResponse`/`cancelTask` commands. Ctrl-C tears the session down,
/// which cancels every live task and rejects every pending form.
pub async fn run_demo(args: DemoArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let out = start_events_out(&cfg.events_out)
        .await
        .map_err(CliError::Command)?;

    let recording = RecordingSink::new();
    let sink: SharedSink = {
        let recording = recording.clone();
        let out_tx = out.as_ref().map(|o| o.tx.clone());
        Arc::new(FnSink(move |event: Event| {
            if let Some(tx) = &out_tx {
                tx.emit(event.clone());
            }
            recording.emit(event);
        }))
    };

    let mut session_cfg = cfg.session.clone();
    if args.no_forms {
        session_cfg.forms_enabled = false;
    }
    let session = Arc::new(TaskSession::with_config(sink, &session_cfg));

    let shutdown = CancellationToken::new();
    let pump = {
        let session = session.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            pump_inbound(stdin, &session, shutdown).await
        })
    };

    let step = Duration::from_millis(args.step_ms);
    let scenario = run_scenario(args.scenario, session.emitter(), step);
    tokio::pin!(scenario);

    let result = tokio::select! {
        res = &mut scenario => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, closing session");
            session.close();
            scenario.await
        }
    };

    shutdown.cancel();
    match pump.await {
        Ok(Ok(stats)) => tracing::debug!(
            routed = stats.routed,
            rejected = stats.rejected,
            malformed = stats.malformed,
            "inbound pump stopped"
        ),
        Ok(Err(e)) => tracing::warn!(error = %e, "reading stdin failed"),
        Err(e) => tracing::warn!(error = %e, "inbound pump task failed"),
    }
    session.close();
    drop(session);

    if let Some(out) = out {
        let dropped = out.tx.dropped_count();
        out.finish().await;
        if dropped > 0 {
            tracing::warn!(dropped, "events_out dropped lines (queue full)");
        }
    }

    summarize(&recording.view());

    match result {
        Ok(outcome) => {
            tracing::info!(scenario = ?args.scenario, %outcome, "scenario finished");
            Ok(0)
        }
        Err(e) => Err(CliError::Task(e)),
    }
}

pub fn print_config(cfg: &AppConfig) -> Result<i32, CliError> {
    let s = toml::to_string_pretty(cfg).map_err(|e| CliError::Command(e.to_string()))?;
    print!("{s}");
    Ok(0)
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    succeeded: usize,
    failed: usize,
    unfinished: usize,
}

fn tally(view: &TaskView) -> Tally {
    let mut t = Tally::default();
    for id in view.ids() {
        match view.state(id) {
            Some(ProgressState::Succeeded) => t.succeeded += 1,
            Some(ProgressState::Failed) => t.failed += 1,
            Some(ProgressState::Started | ProgressState::Busy) => t.unfinished += 1,
            None => {}
        }
    }
    t
}

fn summarize(view: &TaskView) {
    let t = tally(view);
    tracing::info!(
        succeeded = t.succeeded,
        failed = t.failed,
        unfinished = t.unfinished,
        forms = view.forms().len(),
        "task summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tasklog_core::{LogMessage, TaskError};

    #[tokio::test]
    async fn tally_counts_terminal_states() {
        let recording = RecordingSink::new();
        let session = TaskSession::new(recording.clone());
        let emitter = session.emitter();

        emitter
            .run(LogMessage::summary("ok"), |_ctx| async { Ok(()) })
            .await
            .unwrap();
        let _ = emitter
            .run(LogMessage::summary("bad"), |_ctx| async {
                Err::<(), _>(TaskError::msg("nope"))
            })
            .await;
        emitter.info("plain note");

        assert_eq!(
            tally(&recording.view()),
            Tally {
                succeeded: 1,
                failed: 1,
                unfinished: 0
            }
        );
    }
}
