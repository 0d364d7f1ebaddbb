//! Object-store and transfer-engine collaborators.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use s3deck_protocol::{AwsCredentials, ServiceError};

/// Boxed future returned by collaborator calls.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

/// One object returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Result of listing a prefix with a delimiter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    pub objects: Vec<ObjectEntry>,
    /// Sub-prefixes rolled up at the delimiter, i.e. folders.
    pub common_prefixes: Vec<String>,
}

/// Object store the browser talks to.
///
/// Implementations report expired credentials as
/// [`FailureKind::ExpiredToken`](s3deck_protocol::FailureKind::ExpiredToken).
pub trait ObjectStore: Send + Sync {
    fn list<'a>(
        &'a self,
        credentials: &'a AwsCredentials,
        region: &'a str,
        bucket: &'a str,
        prefix: &'a str,
        delimiter: &'a str,
    ) -> StoreFuture<'a, ObjectListing>;

    /// Writes a zero-length object at `key`.
    fn put_empty<'a>(
        &'a self,
        credentials: &'a AwsCredentials,
        region: &'a str,
        bucket: &'a str,
        key: &'a str,
    ) -> StoreFuture<'a, ()>;
}

/// An upload handed to the transfer engine.
///
/// `key` is the destination folder prefix; the engine appends the file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub request_id: Uuid,
    pub file_path: String,
    pub region: String,
    pub bucket: String,
    pub key: String,
    #[serde(rename = "creds")]
    pub credentials: AwsCredentials,
}

/// Engine performing the actual data transfer.
///
/// Progress for submitted transfers arrives separately on the progress
/// channels, keyed by the id this returns.
pub trait TransferEngine: Send + Sync {
    fn submit(&self, request: TransferRequest) -> StoreFuture<'_, String>;
}
