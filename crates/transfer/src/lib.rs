//! Transfer progress tracking.
//!
//! The transfer engine reports progress on two named channels
//! (`upload-progress`, `download-progress`). An [`Ingestor`] task subscribes
//! to both, decodes each payload into a [`TransferEvent`] and applies it to
//! the [`TransferRegistry`], which the UI queries.

mod channel;
mod event;
mod ingest;
mod registry;
mod types;

pub use channel::{DEFAULT_CHANNEL_CAPACITY, ProgressChannels, Subscription};
pub use event::{EventError, TransferEvent};
pub use ingest::{IngestStats, Ingestor};
pub use registry::{Anomaly, ApplyOutcome, ChangeCallback, TransferRegistry};
pub use types::{Transfer, TransferCounts, TransferStatus, name_from_path};
