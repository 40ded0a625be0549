use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::EventsOutConfig;
use crate::event::Event;
use crate::sink::EventSink;

const STDOUT_PATH: &str = "stdout:";

fn audit_preview(s: &str) -> String {
    const MAX: usize = 120;
    if s.len() <= MAX {
        return s.to_string();
    }
    let end = s
        .char_indices()
        .take_while(|(i, _)| *i < MAX)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let mut out = s[..end].to_string();
    out.push('…');
    out
}

#[derive(Clone)]
enum LineTx {
    /// `drop_when_full`: lines that do not fit are counted and dropped.
    Bounded(mpsc::Sender<String>),
    /// Never drops; emitters must not block.
    Unbounded(mpsc::UnboundedSender<String>),
}

enum LineRx {
    Bounded(mpsc::Receiver<String>),
    Unbounded(mpsc::UnboundedReceiver<String>),
}

impl LineRx {
    async fn recv(&mut self) -> Option<String> {
        match self {
            LineRx::Bounded(rx) => rx.recv().await,
            LineRx::Unbounded(rx) => rx.recv().await,
        }
    }
}

fn line_channel(cfg: &EventsOutConfig) -> (LineTx, LineRx) {
    if cfg.drop_when_full {
        let (tx, rx) = mpsc::channel::<String>(cfg.channel_capacity.max(1));
        (LineTx::Bounded(tx), LineRx::Bounded(rx))
    } else {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        (LineTx::Unbounded(tx), LineRx::Unbounded(rx))
    }
}

/// Sending half of the JSONL event writer. Implements [`EventSink`].
#[derive(Clone)]
pub struct EventsOutTx {
    tx: LineTx,
    dropped: Arc<AtomicU64>,
}

impl EventsOutTx {
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn send_line(&self, line: String) {
        match &self.tx {
            LineTx::Bounded(tx) => match tx.try_send(line) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                // writer closed
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            },
            LineTx::Unbounded(tx) => {
                // Err means the writer closed.
                let _ = tx.send(line);
            }
        }
    }
}

impl EventSink for EventsOutTx {
    fn emit(&self, event: Event) {
        match serde_json::to_string(&event) {
            Ok(line) => self.send_line(line),
            Err(e) => tracing::warn!(error = %e, "failed to encode event"),
        }
    }
}

/// Running writer task plus its sender.
pub struct EventsOut {
    pub tx: EventsOutTx,
    task: JoinHandle<()>,
}

impl EventsOut {
    /// Drop our sender and wait for the writer to drain and flush. Other
    /// clones of the sender keep the writer alive until they are dropped.
    pub async fn finish(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "events_out writer task failed");
        }
    }
}

pub async fn start_events_out(cfg: &EventsOutConfig) -> Result<Option<EventsOut>, String> {
    if !cfg.enabled || cfg.path.trim().is_empty() {
        return Ok(None);
    }

    let writer: Box<dyn AsyncWrite + Unpin + Send> = if cfg.path == STDOUT_PATH {
        Box::new(tokio::io::stdout())
    } else {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cfg.path)
            .await
            .map_err(|e| format!("open events_out {} failed: {}", cfg.path, e))?;
        Box::new(file)
    };

    Ok(Some(spawn_events_writer(writer, cfg, cfg.path == STDOUT_PATH)))
}

pub fn spawn_events_writer(
    mut writer: Box<dyn AsyncWrite + Unpin + Send>,
    cfg: &EventsOutConfig,
    audit: bool,
) -> EventsOut {
    let (tx, mut rx) = line_channel(cfg);

    let task = tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            if !line.ends_with('\n') {
                line.push('\n');
            }
            if audit {
                tracing::debug!(
                    target: "tasklog.stdout_audit",
                    kind = "events_out",
                    bytes = line.len(),
                    preview = %audit_preview(line.trim_end())
                );
            }
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                tracing::warn!(error = %e, "events_out write failed");
                return;
            }
            if writer.flush().await.is_err() {
                return;
            }
        }

        let _ = writer.flush().await;
    });

    EventsOut {
        tx: EventsOutTx {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LogMessage;

    fn sample(id: &str) -> Event {
        Event::Log {
            id: id.into(),
            parent_id: None,
            message: LogMessage::summary("step"),
        }
    }

    #[tokio::test]
    async fn writes_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let cfg = EventsOutConfig {
            path: path.to_string_lossy().to_string(),
            ..EventsOutConfig::default()
        };

        let out = start_events_out(&cfg).await.unwrap().unwrap();
        out.tx.emit(sample("task-a-1"));
        out.tx.emit(sample("task-a-2"));
        out.finish().await;

        let text = std::fs::read_to_string(&path).unwrap();
        let ids: Vec<String> = text
            .lines()
            .map(|l| serde_json::from_str::<Event>(l).unwrap().id().to_string())
            .collect();
        assert_eq!(ids, vec!["task-a-1", "task-a-2"]);
    }

    #[tokio::test]
    async fn disabled_config_starts_nothing() {
        let cfg = EventsOutConfig {
            enabled: false,
            ..EventsOutConfig::default()
        };
        assert!(start_events_out(&cfg).await.unwrap().is_none());
    }

    fn sender(cfg: &EventsOutConfig) -> (EventsOutTx, LineRx) {
        let (tx, rx) = line_channel(cfg);
        let out = EventsOutTx {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (out, rx)
    }

    #[test]
    fn full_queue_drops_exactly_the_overflow() {
        let cfg = EventsOutConfig {
            channel_capacity: 2,
            drop_when_full: true,
            ..EventsOutConfig::default()
        };
        let (out, rx) = sender(&cfg);

        std::thread::scope(|s| {
            for _ in 0..4 {
                let out = out.clone();
                s.spawn(move || {
                    for _ in 0..25 {
                        out.send_line("{}".to_string());
                    }
                });
            }
        });

        let LineRx::Bounded(mut rx) = rx else {
            panic!("drop_when_full uses a bounded queue");
        };
        let mut queued = 0;
        while rx.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, 2);
        assert_eq!(out.dropped_count(), 98);
    }

    #[test]
    fn unbounded_queue_never_drops() {
        let cfg = EventsOutConfig {
            channel_capacity: 2,
            ..EventsOutConfig::default()
        };
        let (out, _rx) = sender(&cfg);
        for _ in 0..100 {
            out.send_line("{}".to_string());
        }
        assert_eq!(out.dropped_count(), 0);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let preview = audit_preview(&long);
        assert!(preview.ends_with('…'));
        assert!(preview.len() <= 124);
    }
}
