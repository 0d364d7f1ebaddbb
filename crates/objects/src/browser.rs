use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use s3deck_auth::{ReauthCoordinator, ReauthError};
use s3deck_protocol::CognitoSetting;
use s3deck_protocol::constants::{FOLDER_DELIMITER, PRIVATE_ROOT};
use s3deck_settings::{SettingsError, SettingsExt};

use crate::content::{Content, contents_from_listing};
use crate::store::{ObjectStore, TransferEngine, TransferRequest};

/// Errors from object browser operations.
#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("identity provider is not configured")]
    NotConfigured,

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("invalid file path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Reauth(#[from] ReauthError),
}

impl BrowseError {
    /// Returns `true` if the user has to log in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, BrowseError::Reauth(e) if e.requires_login())
    }
}

/// Folder operations on the signed-in user's private area.
///
/// Folders are written `/`, `/photos/`, `/photos/2023/`: rooted and
/// slash-terminated, relative to `private/<identityId>`.
pub struct ObjectBrowser {
    auth: Arc<ReauthCoordinator>,
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn TransferEngine>,
}

impl ObjectBrowser {
    pub fn new(
        auth: Arc<ReauthCoordinator>,
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn TransferEngine>,
    ) -> Self {
        Self {
            auth,
            store,
            engine,
        }
    }

    /// Lists the files and sub-folders of `folder`.
    pub async fn list_contents(&self, folder: &str) -> Result<Vec<Content>, BrowseError> {
        let folder = normalize_folder(folder);
        let setting = self.setting()?;
        let store = &self.store;

        let contents = self
            .auth
            .with_reauth(|session| {
                let (setting, folder) = (&setting, &folder);
                async move {
                    let prefix = user_prefix(session.identity_id(), folder);
                    store
                        .list(
                            &session.credentials,
                            &setting.region,
                            &setting.bucket,
                            &prefix,
                            FOLDER_DELIMITER,
                        )
                        .await
                        .map(|listing| contents_from_listing(&prefix, listing))
                }
            })
            .await?;
        debug!(folder = %folder, entries = contents.len(), "listed folder");
        Ok(contents)
    }

    /// Creates `folder` and returns its normalised name.
    pub async fn create_folder(&self, folder: &str) -> Result<String, BrowseError> {
        let folder = normalize_folder(folder);
        let setting = self.setting()?;
        let store = &self.store;

        self.auth
            .with_reauth(|session| {
                let (setting, folder) = (&setting, &folder);
                async move {
                    let key = user_prefix(session.identity_id(), folder);
                    store
                        .put_empty(&session.credentials, &setting.region, &setting.bucket, &key)
                        .await
                }
            })
            .await?;
        info!(folder = %folder, "created folder");
        Ok(folder)
    }

    /// Hands the local file at `path` to the transfer engine for upload into
    /// `folder`. Returns the engine's transfer id.
    pub async fn upload_file(&self, path: &str, folder: &str) -> Result<String, BrowseError> {
        if Path::new(path).file_name().is_none() {
            return Err(BrowseError::InvalidPath(path.to_string()));
        }
        let folder = normalize_folder(folder);
        let setting = self.setting()?;
        let engine = &self.engine;

        let id = self
            .auth
            .with_reauth(|session| {
                let request = TransferRequest {
                    request_id: Uuid::new_v4(),
                    file_path: path.to_string(),
                    region: setting.region.clone(),
                    bucket: setting.bucket.clone(),
                    key: user_prefix(session.identity_id(), &folder),
                    credentials: session.credentials.clone(),
                };
                engine.submit(request)
            })
            .await?;
        info!(transfer = %id, path, folder = %folder, "upload submitted");
        Ok(id)
    }

    fn setting(&self) -> Result<CognitoSetting, BrowseError> {
        self.auth
            .settings()
            .cognito_setting()?
            .ok_or(BrowseError::NotConfigured)
    }
}

/// Object-key prefix of `folder` for the given identity.
pub fn user_prefix(identity_id: &str, folder: &str) -> String {
    format!("{PRIVATE_ROOT}/{identity_id}{folder}")
}

/// Makes `folder` rooted and slash-terminated. Empty means the root.
pub fn normalize_folder(folder: &str) -> String {
    let trimmed = folder.trim_matches('/');
    if trimmed.is_empty() {
        return FOLDER_DELIMITER.to_string();
    }
    format!("/{trimmed}/")
}
