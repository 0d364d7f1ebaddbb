//! Wire types shared between the s3deck core and its collaborators.
//!
//! Everything here is plain serde data: credentials handed out by the
//! identity provider, the provider setting the user enters, progress
//! payloads emitted by the transfer engine, and the closed failure
//! taxonomy every collaborator reports through.

pub mod constants;
pub mod envelope;
pub mod error;
pub mod progress;
pub mod types;

pub use error::{FailureKind, ServiceError};
pub use progress::{ProgressEventType, ProgressPayload};
pub use types::{AuthTokens, AwsCredentials, CognitoSetting};
