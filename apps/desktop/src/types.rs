//! DTOs returned by commands.
//!
//! camelCase throughout, the shape the front end reads.

use serde::{Deserialize, Serialize};

use s3deck_auth::Session;
use s3deck_transfer::{IngestStats, Transfer, TransferCounts};

/// Current authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfoDto {
    pub authenticated: bool,
    pub identity_id: Option<String>,
    pub refreshing: bool,
}

impl SessionInfoDto {
    pub fn from_session(session: Option<&Session>, refreshing: bool) -> Self {
        Self {
            authenticated: session.is_some(),
            identity_id: session.map(|s| s.identity_id().to_string()),
            refreshing,
        }
    }
}

/// Registry snapshot printed at the end of a replay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummaryDto {
    pub counts: TransferCounts,
    pub uploading: Vec<Transfer>,
    pub downloading: Vec<Transfer>,
    pub finished: Vec<Transfer>,
    pub ingest: IngestStats,
}
