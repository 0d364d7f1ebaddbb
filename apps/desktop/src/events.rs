//! Replays engine output into the progress channels.
//!
//! Input is JSON lines, one [`ChannelMessage`] per line:
//!
//! ```text
//! {"channel":"upload-progress","payload":{"upload_id":"u-1","event_type":"Start",...}}
//! ```

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use s3deck_protocol::envelope::ChannelMessage;
use s3deck_transfer::ProgressChannels;

/// Line counters for one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PumpStats {
    pub lines: usize,
    pub published: usize,
    /// Blank lines or lines that are not a channel message.
    pub skipped: usize,
    /// Messages no listener was subscribed to.
    pub undelivered: usize,
}

/// Reads every line from `reader` and publishes it on `channels`.
///
/// Bad lines are logged and skipped. Stops at end of input.
pub async fn pump_lines<R>(reader: R, channels: &ProgressChannels) -> std::io::Result<PumpStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = PumpStats::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        stats.lines += 1;
        let line = line.trim();
        if line.is_empty() {
            stats.skipped += 1;
            continue;
        }

        let msg: ChannelMessage = match serde_json::from_str(line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(line = stats.lines, "skipping malformed line: {e}");
                stats.skipped += 1;
                continue;
            }
        };

        if channels.publish(msg).await == 0 {
            stats.undelivered += 1;
        } else {
            stats.published += 1;
        }
    }

    debug!(?stats, "input exhausted");
    Ok(stats)
}
