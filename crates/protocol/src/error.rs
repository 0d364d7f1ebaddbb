//! Failure taxonomy reported by the identity provider, the object store
//! and the transfer engine.

use serde::{Deserialize, Serialize};

/// Closed set of failure kinds a collaborator can report.
///
/// The coordinator dispatches on [`FailureKind::ExpiredToken`]; every
/// other kind is surfaced to the caller untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The temporary credentials used for the call are no longer valid.
    ExpiredToken,
    /// The identity provider rejected the username/password or refresh token.
    InvalidCredentials,
    /// The call never reached the service or the connection dropped.
    NetworkError,
    /// Anything the collaborator could not classify further.
    Other,
}

impl FailureKind {
    /// Classifies a service error code as reported by the SDKs
    /// (`"ExpiredToken"`, `"NotAuthorizedException"`, ...).
    pub fn from_code(code: &str) -> Self {
        match code {
            "ExpiredToken" | "ExpiredTokenException" | "RequestExpired" => {
                FailureKind::ExpiredToken
            }
            "NotAuthorizedException" | "InvalidClientTokenId" | "AccessDenied"
            | "UserNotFoundException" => FailureKind::InvalidCredentials,
            "NetworkingError" | "TimeoutError" | "DispatchFailure" => FailureKind::NetworkError,
            _ => FailureKind::Other,
        }
    }
}

/// A typed failure from a collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ServiceError {
    pub kind: FailureKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ExpiredToken, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NetworkError, message)
    }

    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidCredentials, message)
    }

    /// Returns `true` if this failure means the credentials have expired.
    pub fn is_expired(&self) -> bool {
        self.kind == FailureKind::ExpiredToken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_codes() {
        assert_eq!(FailureKind::from_code("ExpiredToken"), FailureKind::ExpiredToken);
        assert_eq!(
            FailureKind::from_code("NotAuthorizedException"),
            FailureKind::InvalidCredentials
        );
        assert_eq!(
            FailureKind::from_code("DispatchFailure"),
            FailureKind::NetworkError
        );
        assert_eq!(FailureKind::from_code("NoSuchBucket"), FailureKind::Other);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = ServiceError::expired("token expired at 12:00");
        assert!(err.is_expired());
        assert_eq!(err.to_string(), "ExpiredToken: token expired at 12:00");
    }
}
