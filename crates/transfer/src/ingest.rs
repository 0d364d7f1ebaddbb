//! The single writer that feeds engine progress into the registry.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use s3deck_protocol::constants::TransferDirection;
use s3deck_protocol::envelope::ChannelMessage;

use crate::channel::{ProgressChannels, Subscription};
use crate::event::TransferEvent;
use crate::registry::{ApplyOutcome, TransferRegistry};

/// Counters reported when the ingestor stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub applied: usize,
    pub clamped: usize,
    pub ignored: usize,
    pub malformed: usize,
}

impl IngestStats {
    fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Created | ApplyOutcome::Updated => self.applied += 1,
            ApplyOutcome::Clamped(_) => self.clamped += 1,
            ApplyOutcome::Ignored(_) => self.ignored += 1,
        }
    }
}

/// Subscribes to the upload and download progress channels and applies
/// every event to a [`TransferRegistry`].
pub struct Ingestor {
    registry: Arc<TransferRegistry>,
    channels: ProgressChannels,
}

impl Ingestor {
    pub fn new(registry: Arc<TransferRegistry>, channels: ProgressChannels) -> Self {
        Self { registry, channels }
    }

    /// Subscribes to both progress channels, then runs the ingestor on a
    /// background task until `cancel` fires or the channels go away.
    ///
    /// Listeners are registered before this returns, so anything published
    /// afterwards is delivered. The task owns the subscriptions and releases
    /// them on every exit path, abort included.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<IngestStats> {
        let Ingestor { registry, channels } = self;
        if cancel.is_cancelled() {
            debug!("ingestor cancelled before subscribing");
            return tokio::spawn(async { IngestStats::default() });
        }

        let uploads = channels.listen(TransferDirection::Upload.channel());
        let downloads = channels.listen(TransferDirection::Download.channel());
        // Only the engine side keeps the hub alive; once it is gone the
        // subscriptions close and the loop ends.
        drop(channels);
        info!("progress ingestion started");

        tokio::spawn(ingest(registry, uploads, downloads, cancel))
    }
}

async fn ingest(
    registry: Arc<TransferRegistry>,
    mut uploads: Subscription,
    mut downloads: Subscription,
    cancel: CancellationToken,
) -> IngestStats {
    let mut stats = IngestStats::default();
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            msg = uploads.recv() => Some(msg),
            msg = downloads.recv() => Some(msg),
        };
        let Some(msg) = next else {
            // Apply what was already delivered before stopping.
            for sub in [&mut uploads, &mut downloads] {
                while let Some(msg) = sub.try_recv() {
                    apply_message(&registry, &msg, &mut stats);
                }
            }
            break;
        };
        let Some(msg) = msg else {
            debug!("progress channels closed");
            break;
        };
        apply_message(&registry, &msg, &mut stats);
    }

    info!(
        applied = stats.applied,
        clamped = stats.clamped,
        ignored = stats.ignored,
        malformed = stats.malformed,
        "progress ingestion stopped"
    );
    stats
}

fn apply_message(registry: &TransferRegistry, msg: &ChannelMessage, stats: &mut IngestStats) {
    match TransferEvent::from_message(msg) {
        Ok(event) => stats.record(registry.apply(event)),
        Err(e) => {
            warn!(channel = %msg.channel, "dropping progress message: {e}");
            stats.malformed += 1;
        }
    }
}
