use s3deck_protocol::constants::TransferDirection;
use s3deck_protocol::envelope::ChannelMessage;
use s3deck_protocol::{ProgressEventType, ProgressPayload};

/// Reason reported when a failed event carries no message.
const UNKNOWN_FAILURE: &str = "transfer failed";

/// A decoded progress event, ready to apply to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Start {
        id: String,
        direction: TransferDirection,
        path: String,
        total_size: u64,
        transferred_size: u64,
    },
    Update {
        id: String,
        transferred_size: u64,
    },
    End {
        id: String,
        transferred_size: u64,
    },
    Stop {
        id: String,
    },
    Continue {
        id: String,
    },
    Failed {
        id: String,
        reason: String,
    },
}

/// A payload that could not be turned into a [`TransferEvent`].
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("malformed progress payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("start event for {0} has no file path")]
    MissingPath(String),

    #[error("unknown progress channel: {0}")]
    UnknownChannel(String),
}

impl TransferEvent {
    /// Id of the transfer this event refers to.
    pub fn id(&self) -> &str {
        match self {
            TransferEvent::Start { id, .. }
            | TransferEvent::Update { id, .. }
            | TransferEvent::End { id, .. }
            | TransferEvent::Stop { id }
            | TransferEvent::Continue { id }
            | TransferEvent::Failed { id, .. } => id,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            TransferEvent::Start { .. } => "start",
            TransferEvent::Update { .. } => "update",
            TransferEvent::End { .. } => "end",
            TransferEvent::Stop { .. } => "stop",
            TransferEvent::Continue { .. } => "continue",
            TransferEvent::Failed { .. } => "failed",
        }
    }

    /// Converts an engine payload received on the channel for `direction`.
    pub fn from_payload(
        direction: TransferDirection,
        payload: ProgressPayload,
    ) -> Result<Self, EventError> {
        let id = payload.transfer_id;
        Ok(match payload.event_type {
            ProgressEventType::Start => {
                let path = payload
                    .file_path
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| EventError::MissingPath(id.clone()))?;
                TransferEvent::Start {
                    id,
                    direction,
                    path,
                    total_size: payload.total_size,
                    transferred_size: payload.transferred_size,
                }
            }
            ProgressEventType::Update => TransferEvent::Update {
                id,
                transferred_size: payload.transferred_size,
            },
            ProgressEventType::End => TransferEvent::End {
                id,
                transferred_size: payload.transferred_size,
            },
            ProgressEventType::Stop => TransferEvent::Stop { id },
            ProgressEventType::Continue => TransferEvent::Continue { id },
            ProgressEventType::Failed => TransferEvent::Failed {
                id,
                reason: payload.error.unwrap_or_else(|| UNKNOWN_FAILURE.to_string()),
            },
        })
    }

    /// Decodes a channel message, taking the direction from its channel name.
    pub fn from_message(msg: &ChannelMessage) -> Result<Self, EventError> {
        let direction = TransferDirection::from_channel(&msg.channel)
            .ok_or_else(|| EventError::UnknownChannel(msg.channel.clone()))?;
        Self::from_payload(direction, msg.parse_payload()?)
    }
}
