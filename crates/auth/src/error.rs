//! Error types for credentialed calls and login.

use s3deck_protocol::ServiceError;
use s3deck_settings::SettingsError;

/// Outcome of a call made through [`with_reauth`](crate::ReauthCoordinator::with_reauth).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReauthError {
    /// The call itself failed. After a refresh-and-retry this may again be
    /// an expiry; it is returned as-is.
    #[error(transparent)]
    Service(ServiceError),

    /// No session, or no identity-provider setting to refresh with.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The identity provider rejected the refresh. The session was cleared.
    #[error("credential refresh failed: {0}")]
    RefreshFailed(ServiceError),

    /// The refresh did not resolve within the configured bound.
    #[error("timed out waiting for credential refresh")]
    RefreshTimeout,

    /// The task performing the refresh went away without resolving it.
    #[error("credential refresh abandoned")]
    Abandoned,
}

impl ReauthError {
    /// Returns `true` if the underlying call reported expired credentials.
    pub fn is_credential_expired(&self) -> bool {
        matches!(self, ReauthError::Service(e) if e.is_expired())
    }

    /// Returns `true` if the user has to log in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ReauthError::NotAuthenticated | ReauthError::RefreshFailed(_)
        )
    }
}

impl From<ServiceError> for ReauthError {
    fn from(err: ServiceError) -> Self {
        ReauthError::Service(err)
    }
}

/// Errors from an interactive login.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("identity provider is not configured")]
    NotConfigured,

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("login rejected: {0}")]
    Provider(ServiceError),

    #[error("timed out waiting for the identity provider")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use s3deck_protocol::FailureKind;

    use super::*;

    #[test]
    fn expired_service_error_is_detected() {
        let err = ReauthError::Service(ServiceError::expired("gone"));
        assert!(err.is_credential_expired());
        assert!(!err.requires_login());
    }

    #[test]
    fn refresh_failure_requires_login() {
        let err = ReauthError::RefreshFailed(ServiceError::new(
            FailureKind::InvalidCredentials,
            "revoked",
        ));
        assert!(err.requires_login());
        assert!(!err.is_credential_expired());
        assert!(ReauthError::NotAuthenticated.requires_login());
        assert!(!ReauthError::RefreshTimeout.requires_login());
    }
}
