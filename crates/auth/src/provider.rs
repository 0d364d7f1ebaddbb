//! Identity-provider collaborator.

use std::future::Future;
use std::pin::Pin;

use s3deck_protocol::{AuthTokens, CognitoSetting, ServiceError};

/// Boxed future returned by [`IdentityProvider`] calls.
pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = Result<AuthTokens, ServiceError>> + Send + 'a>>;

/// Abstract identity provider.
///
/// The app implements this on top of the provider SDK. Keeping it a trait
/// keeps the coordinator testable with mocks.
pub trait IdentityProvider: Send + Sync {
    /// Exchanges a username/password for a refresh token and credentials.
    fn login<'a>(
        &'a self,
        setting: &'a CognitoSetting,
        username: &'a str,
        password: &'a str,
    ) -> ProviderFuture<'a>;

    /// Exchanges a refresh token for a new refresh token and credentials.
    ///
    /// Providers that rotate refresh tokens invalidate `refresh_token` on
    /// success.
    fn refresh<'a>(&'a self, setting: &'a CognitoSetting, refresh_token: &'a str)
    -> ProviderFuture<'a>;
}
