//! Reauthentication coordinator and the retry-once wrapper.
//!
//! The coordinator is the only writer of the [`CredentialStore`]. It commits
//! sessions on login and refresh, clears them on logout or when the
//! identity provider rejects a refresh, and restores them from the
//! settings store on start-up.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use s3deck_protocol::constants::{KEY_AWS_CREDENTIALS, KEY_REFRESH_TOKEN};
use s3deck_protocol::{AuthTokens, AwsCredentials, CognitoSetting, ServiceError};
use s3deck_settings::{SettingsExt, SettingsStore};

use crate::error::{LoginError, ReauthError};
use crate::gate::{Admission, RefreshGate, RefreshOutcome, RefreshWaiter};
use crate::provider::IdentityProvider;
use crate::state::{CredentialStore, Session};

/// Default bound on a refresh call and on waiting for one.
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// What to do when the retried call reports expired credentials again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatedExpiryPolicy {
    /// Return the expiry to the caller and keep the session; the next call
    /// goes through the refresh flow again.
    #[default]
    Surface,
    /// Return the expiry and clear the session.
    ForceLogout,
}

/// Coordinator tuning.
#[derive(Debug, Clone)]
pub struct ReauthConfig {
    /// Bound on a provider call and on a waiter blocked on the gate.
    /// `None` waits indefinitely.
    pub refresh_timeout: Option<Duration>,
    pub repeated_expiry: RepeatedExpiryPolicy,
}

impl Default for ReauthConfig {
    fn default() -> Self {
        Self {
            refresh_timeout: Some(DEFAULT_REFRESH_TIMEOUT),
            repeated_expiry: RepeatedExpiryPolicy::default(),
        }
    }
}

/// Owns the session and serialises every change to it.
pub struct ReauthCoordinator {
    provider: Arc<dyn IdentityProvider>,
    settings: Arc<dyn SettingsStore>,
    store: CredentialStore,
    gate: RefreshGate,
    config: ReauthConfig,
}

impl ReauthCoordinator {
    /// Creates a coordinator with no session. Call [`restore`](Self::restore)
    /// to pick up a persisted one.
    pub fn new(provider: Arc<dyn IdentityProvider>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            provider,
            settings,
            store: CredentialStore::new(),
            gate: RefreshGate::new(),
            config: ReauthConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReauthConfig) -> Self {
        self.config = config;
        self
    }

    /// The last committed session.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.store.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Returns `true` while a refresh or login is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.gate.is_locked()
    }

    /// The settings store sessions are persisted to.
    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    /// Loads a persisted session, if a complete one exists.
    ///
    /// Returns `true` when a session was restored. A refresh token without
    /// credentials (or the reverse) is ignored.
    pub fn restore(&self) -> bool {
        let token = self.settings.get_as::<String>(KEY_REFRESH_TOKEN);
        let credentials = self.settings.get_as::<AwsCredentials>(KEY_AWS_CREDENTIALS);
        match (token, credentials) {
            (Ok(Some(refresh_token)), Ok(Some(credentials))) if !refresh_token.is_empty() => {
                let session = self.store.commit(AuthTokens {
                    refresh_token,
                    credentials,
                });
                info!(
                    identity = %session.identity_id(),
                    generation = session.generation,
                    "restored persisted session"
                );
                true
            }
            (Ok(None), Ok(None)) => {
                debug!("no persisted session");
                false
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("failed to read persisted session: {e}");
                false
            }
            _ => {
                warn!("persisted session is incomplete, ignoring it");
                false
            }
        }
    }

    /// Logs in with a username and password.
    ///
    /// Serialised with refreshes through the same gate: a login started
    /// while a refresh is in flight waits for it first.
    pub async fn login(&self, username: &str, password: &str) -> Result<Arc<Session>, LoginError> {
        let setting = self
            .settings
            .cognito_setting()?
            .ok_or(LoginError::NotConfigured)?;

        loop {
            let lease = match self.gate.enter() {
                Admission::Leader(lease) => lease,
                Admission::Follower(waiter) => {
                    let _ = self.wait(waiter).await;
                    continue;
                }
            };

            let call = self.provider.login(&setting, username, password);
            let result = match self.config.refresh_timeout {
                Some(bound) => match tokio::time::timeout(bound, call).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("login timed out");
                        lease.resolve(RefreshOutcome::Unchanged);
                        return Err(LoginError::Timeout);
                    }
                },
                None => call.await,
            };

            return match result {
                Ok(tokens) => {
                    let session = self.store.commit(tokens);
                    self.persist(&session);
                    info!(
                        identity = %session.identity_id(),
                        generation = session.generation,
                        "logged in"
                    );
                    lease.resolve(RefreshOutcome::Refreshed(Arc::clone(&session)));
                    Ok(session)
                }
                Err(e) => {
                    warn!(error = %e, "login rejected");
                    // The old session still stands; callers waiting on this
                    // gate need their own refresh.
                    lease.resolve(RefreshOutcome::Unchanged);
                    Err(LoginError::Provider(e))
                }
            };
        }
    }

    /// Clears the session in memory and on disk.
    pub fn logout(&self) {
        let had_session = self.store.clear();
        if let Err(e) = self
            .settings
            .remove_many(&[KEY_REFRESH_TOKEN, KEY_AWS_CREDENTIALS])
        {
            warn!("failed to remove persisted session: {e}");
        }
        if had_session {
            info!("logged out");
        }
    }

    /// Runs a credentialed call with refresh-and-retry-once semantics.
    ///
    /// 1. No session: [`ReauthError::NotAuthenticated`], `op` is not called.
    /// 2. `op` succeeds or fails with anything but an expiry: returned as-is.
    /// 3. `op` reports expiry: one refresh is coordinated (shared with any
    ///    concurrent callers) and `op` is retried once with the new session.
    ///    The retry's result is returned verbatim, even another expiry.
    pub async fn with_reauth<T, F, Fut>(&self, op: F) -> Result<T, ReauthError>
    where
        F: Fn(Arc<Session>) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let session = self.store.snapshot().ok_or(ReauthError::NotAuthenticated)?;
        let used = session.generation;

        let expired = match op(session).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_expired() => e,
            Err(e) => return Err(ReauthError::Service(e)),
        };
        debug!(generation = used, reason = %expired.message, "credentials expired");

        let fresh = self.refresh_after_expiry(used).await?;
        let retried_with = fresh.generation;

        match op(fresh).await {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_expired() {
                    self.on_repeated_expiry(retried_with);
                }
                Err(ReauthError::Service(e))
            }
        }
    }

    /// Obtains a session newer than generation `used`, refreshing at most
    /// once across all concurrent callers.
    pub async fn refresh_after_expiry(&self, used: u64) -> Result<Arc<Session>, ReauthError> {
        loop {
            let lease = match self.gate.enter() {
                Admission::Leader(lease) => lease,
                Admission::Follower(waiter) => {
                    debug!(generation = used, "refresh in flight, waiting");
                    match self.wait(waiter).await {
                        RefreshOutcome::Unchanged => {
                            debug!(generation = used, "gate released without a refresh");
                            continue;
                        }
                        outcome => return outcome.into_result(),
                    }
                }
            };

            let outcome = self.refresh_as_leader(used).await;
            lease.resolve(outcome.clone());
            return outcome.into_result();
        }
    }

    async fn refresh_as_leader(&self, used: u64) -> RefreshOutcome {
        let Some(current) = self.store.snapshot() else {
            return RefreshOutcome::Failed(ReauthError::NotAuthenticated);
        };

        // A refresh finished between the failed call and now.
        if current.generation != used {
            debug!(
                used,
                current = current.generation,
                "credentials already refreshed"
            );
            return RefreshOutcome::Refreshed(current);
        }

        if current.refresh_token.is_empty() {
            return RefreshOutcome::Failed(ReauthError::NotAuthenticated);
        }
        let setting = match self.settings.cognito_setting() {
            Ok(Some(setting)) => setting,
            Ok(None) => {
                debug!("no identity-provider setting, cannot refresh");
                return RefreshOutcome::Failed(ReauthError::NotAuthenticated);
            }
            Err(e) => {
                warn!("failed to read identity-provider setting: {e}");
                return RefreshOutcome::Failed(ReauthError::NotAuthenticated);
            }
        };

        info!(generation = used, "refreshing credentials");
        match self.call_refresh(&setting, &current.refresh_token).await {
            Ok(tokens) => match self.store.replace_if_current(used, tokens) {
                Some(session) => {
                    self.persist(&session);
                    info!(generation = session.generation, "credentials refreshed");
                    RefreshOutcome::Refreshed(session)
                }
                None => {
                    // Logged out (or in again) while the refresh was in flight.
                    debug!("session changed during refresh, discarding result");
                    match self.store.snapshot() {
                        Some(session) => RefreshOutcome::Refreshed(session),
                        None => RefreshOutcome::Failed(ReauthError::NotAuthenticated),
                    }
                }
            },
            Err(ReauthError::RefreshTimeout) => {
                warn!(generation = used, "credential refresh timed out");
                RefreshOutcome::Failed(ReauthError::RefreshTimeout)
            }
            Err(e) => {
                warn!(error = %e, "credential refresh rejected, logging out");
                self.logout();
                RefreshOutcome::Failed(e)
            }
        }
    }

    async fn call_refresh(
        &self,
        setting: &CognitoSetting,
        refresh_token: &str,
    ) -> Result<AuthTokens, ReauthError> {
        let call = self.provider.refresh(setting, refresh_token);
        let result = match self.config.refresh_timeout {
            Some(bound) => tokio::time::timeout(bound, call)
                .await
                .map_err(|_| ReauthError::RefreshTimeout)?,
            None => call.await,
        };
        result.map_err(ReauthError::RefreshFailed)
    }

    async fn wait(&self, waiter: RefreshWaiter) -> RefreshOutcome {
        match self.config.refresh_timeout {
            Some(bound) => tokio::time::timeout(bound, waiter.outcome())
                .await
                .unwrap_or(RefreshOutcome::Failed(ReauthError::RefreshTimeout)),
            None => waiter.outcome().await,
        }
    }

    fn on_repeated_expiry(&self, generation: u64) {
        match self.config.repeated_expiry {
            RepeatedExpiryPolicy::Surface => {
                warn!(generation, "credentials expired again after refresh");
            }
            RepeatedExpiryPolicy::ForceLogout => {
                warn!(
                    generation,
                    "credentials expired again after refresh, logging out"
                );
                // Only drop the session the retry actually used.
                if self.store.generation() == Some(generation) {
                    self.logout();
                }
            }
        }
    }

    fn persist(&self, session: &Session) {
        let credentials = match serde_json::to_value(&session.credentials) {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to encode credentials: {e}");
                return;
            }
        };
        let entries = vec![
            (KEY_REFRESH_TOKEN.to_string(), json!(session.refresh_token)),
            (KEY_AWS_CREDENTIALS.to_string(), credentials),
        ];
        if let Err(e) = self.settings.set_many(entries) {
            warn!("failed to persist session: {e}");
        }
    }
}
