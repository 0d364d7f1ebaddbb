use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use s3deck_auth::{IdentityProvider, ProviderFuture, ReauthCoordinator};
use s3deck_objects::{
    ObjectBrowser, ObjectListing, ObjectStore, StoreFuture, TransferEngine, TransferRequest,
};
use s3deck_protocol::{AwsCredentials, CognitoSetting, ServiceError};
use s3deck_settings::SettingsStore;
use s3deck_transfer::{IngestStats, Ingestor, ProgressChannels, TransferRegistry};

use crate::config::AppConfig;

/// External services the app is wired to.
pub struct Collaborators {
    pub provider: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn ObjectStore>,
    pub engine: Arc<dyn TransferEngine>,
}

impl Collaborators {
    /// Collaborators that fail every call with a network error.
    ///
    /// Used when no provider SDK is linked; persisted state and progress
    /// replay still work.
    pub fn offline() -> Self {
        let offline = Arc::new(Offline);
        Self {
            provider: offline.clone(),
            store: offline.clone(),
            engine: offline,
        }
    }
}

struct Offline;

fn offline_error() -> ServiceError {
    ServiceError::network("no identity provider or object store is linked")
}

impl IdentityProvider for Offline {
    fn login<'a>(
        &'a self,
        _setting: &'a CognitoSetting,
        _username: &'a str,
        _password: &'a str,
    ) -> ProviderFuture<'a> {
        Box::pin(async { Err(offline_error()) })
    }

    fn refresh<'a>(
        &'a self,
        _setting: &'a CognitoSetting,
        _refresh_token: &'a str,
    ) -> ProviderFuture<'a> {
        Box::pin(async { Err(offline_error()) })
    }
}

impl ObjectStore for Offline {
    fn list<'a>(
        &'a self,
        _credentials: &'a AwsCredentials,
        _region: &'a str,
        _bucket: &'a str,
        _prefix: &'a str,
        _delimiter: &'a str,
    ) -> StoreFuture<'a, ObjectListing> {
        Box::pin(async { Err(offline_error()) })
    }

    fn put_empty<'a>(
        &'a self,
        _credentials: &'a AwsCredentials,
        _region: &'a str,
        _bucket: &'a str,
        _key: &'a str,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async { Err(offline_error()) })
    }
}

impl TransferEngine for Offline {
    fn submit(&self, _request: TransferRequest) -> StoreFuture<'_, String> {
        Box::pin(async { Err(offline_error()) })
    }
}

/// Progress channels, the registry they feed and the ingestion task.
pub struct TransferHub {
    pub registry: Arc<TransferRegistry>,
    pub channels: ProgressChannels,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<IngestStats>>>,
}

impl TransferHub {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            registry: Arc::new(TransferRegistry::new()),
            channels: ProgressChannels::new(channel_capacity),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Starts ingestion. Subsequent calls are no-ops.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap();
        if task.is_some() {
            return;
        }
        let ingestor = Ingestor::new(self.registry.clone(), self.channels.clone());
        *task = Some(ingestor.spawn(self.cancel.clone()));
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Stops ingestion after applying whatever was already delivered.
    pub async fn shutdown(&self) -> IngestStats {
        self.cancel.cancel();
        let task = self.task.lock().unwrap().take();
        match task {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                tracing::error!("ingestion task failed: {e}");
                IngestStats::default()
            }),
            None => IngestStats::default(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub config: AppConfig,
    pub settings: Arc<dyn SettingsStore>,
    pub auth: Arc<ReauthCoordinator>,
    pub browser: ObjectBrowser,
    pub transfers: TransferHub,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        settings: Arc<dyn SettingsStore>,
        collaborators: Collaborators,
    ) -> Self {
        let auth = Arc::new(
            ReauthCoordinator::new(collaborators.provider, settings.clone())
                .with_config(config.reauth()),
        );
        let browser = ObjectBrowser::new(auth.clone(), collaborators.store, collaborators.engine);
        let transfers = TransferHub::new(config.channel_capacity);
        Self {
            config,
            settings,
            auth,
            browser,
            transfers,
        }
    }
}
