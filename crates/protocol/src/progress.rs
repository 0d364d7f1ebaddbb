//! Progress payloads emitted by the transfer engine.

use serde::{Deserialize, Serialize};

/// Kind of progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressEventType {
    Start,
    End,
    Stop,
    Continue,
    Update,
    Failed,
}

/// One progress notification as the engine emits it.
///
/// `file_path` is only present on `Start`, `error` only on `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub event_type: ProgressEventType,
    #[serde(rename = "upload_id", alias = "transfer_id")]
    pub transfer_id: String,
    #[serde(default)]
    pub transferred_size: u64,
    #[serde(default)]
    pub total_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressPayload {
    fn bare(event_type: ProgressEventType, transfer_id: impl Into<String>) -> Self {
        Self {
            event_type,
            transfer_id: transfer_id.into(),
            transferred_size: 0,
            total_size: 0,
            file_path: None,
            error: None,
        }
    }

    pub fn start(
        transfer_id: impl Into<String>,
        file_path: impl Into<String>,
        total_size: u64,
        transferred_size: u64,
    ) -> Self {
        Self {
            file_path: Some(file_path.into()),
            total_size,
            transferred_size,
            ..Self::bare(ProgressEventType::Start, transfer_id)
        }
    }

    pub fn update(transfer_id: impl Into<String>, transferred_size: u64) -> Self {
        Self {
            transferred_size,
            ..Self::bare(ProgressEventType::Update, transfer_id)
        }
    }

    pub fn end(transfer_id: impl Into<String>, transferred_size: u64) -> Self {
        Self {
            transferred_size,
            ..Self::bare(ProgressEventType::End, transfer_id)
        }
    }

    pub fn stop(transfer_id: impl Into<String>) -> Self {
        Self::bare(ProgressEventType::Stop, transfer_id)
    }

    pub fn resume(transfer_id: impl Into<String>) -> Self {
        Self::bare(ProgressEventType::Continue, transfer_id)
    }

    pub fn failed(transfer_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::bare(ProgressEventType::Failed, transfer_id)
        }
    }
}
