use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::event::InboundCommand;
use crate::session::TaskSession;

/// Counters for one run of [`pump_inbound`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub routed: usize,
    pub rejected: usize,
    pub malformed: usize,
}

/// Read JSONL commands from `reader` and route them to `session` until EOF
/// or `shutdown` fires. Bad lines are logged and skipped.
pub async fn pump_inbound<R>(
    reader: R,
    session: &TaskSession,
    shutdown: CancellationToken,
) -> std::io::Result<PumpStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = PumpStats::default();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<InboundCommand>(trimmed) {
            Ok(command) => match session.handle_inbound(command) {
                Ok(()) => stats.routed += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "inbound command rejected");
                    stats.rejected += 1;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, line = %trimmed, "failed to parse inbound command");
                stats.malformed += 1;
            }
        }
    }

    Ok(stats)
}
