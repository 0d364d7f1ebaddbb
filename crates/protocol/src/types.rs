use std::fmt;

use serde::{Deserialize, Serialize};

/// Temporary credentials issued by the identity pool.
///
/// Persisted in camelCase (the settings file format); the snake_case
/// aliases accept what the transfer engine echoes back.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsCredentials {
    #[serde(alias = "access_key_id")]
    pub access_key_id: String,
    #[serde(alias = "secret_access_key")]
    pub secret_access_key: String,
    #[serde(alias = "session_token")]
    pub session_token: String,
    #[serde(alias = "identity_id")]
    pub identity_id: String,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("identity_id", &self.identity_id)
            .finish()
    }
}

/// Identity-provider and bucket setting entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitoSetting {
    pub region: String,
    pub bucket: String,
    pub client_id: String,
    pub user_pool_id: String,
    pub identity_pool_id: String,
}

impl CognitoSetting {
    /// Login provider name used when exchanging an id token for
    /// identity-pool credentials.
    pub fn login_provider(&self) -> String {
        format!(
            "cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }
}

/// Result of a successful login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub refresh_token: String,
    pub credentials: AwsCredentials,
}
