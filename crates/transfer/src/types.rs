use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use s3deck_protocol::constants::TransferDirection;

/// Lifecycle state of a transfer.
///
/// `Finished` is absorbing. `Stopping` is a transient side-state entered on
/// a stop request and left on continue. `Failed` is shown to the user but
/// still accepts progress, since the engine owns retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Transferring,
    Stopping,
    Finished,
    Failed,
}

impl TransferStatus {
    pub fn is_finished(self) -> bool {
        self == TransferStatus::Finished
    }
}

/// One upload or download as tracked by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: String,
    /// File name shown to the user, derived from the source path.
    pub name: String,
    #[serde(rename = "type")]
    pub direction: TransferDirection,
    pub status: TransferStatus,
    pub total_size: u64,
    /// Never exceeds `total_size`; never decreases.
    pub transferred_size: u64,
    /// Bytes added by the most recent progress event.
    pub increment: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Transfer {
    pub(crate) fn new(
        id: String,
        path: &str,
        direction: TransferDirection,
        total_size: u64,
        transferred_size: u64,
    ) -> Self {
        Self {
            id,
            name: name_from_path(path).to_string(),
            direction,
            status: TransferStatus::Transferring,
            total_size,
            transferred_size,
            increment: 0,
            finished_at: None,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }
}

/// Number of transfers in each view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCounts {
    pub uploading: usize,
    pub downloading: usize,
    pub finished: usize,
    /// Not finished and currently in the failed display state. Also counted
    /// under `uploading` or `downloading`.
    pub failed: usize,
}

/// Last component of a path, accepting both `/` and `\` separators.
///
/// The engine reports local paths as the OS gives them, so a Windows path
/// can reach a registry running anywhere.
pub fn name_from_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}
