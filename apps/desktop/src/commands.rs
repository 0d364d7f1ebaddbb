//! Front-end commands.
//!
//! Each command reports failures as a display string. An error that needs
//! the user to log in again is prefixed with [`LOGIN_REQUIRED`] so the
//! front end can route to the login screen.

use s3deck_objects::{BrowseError, Content};
use s3deck_protocol::CognitoSetting;
use s3deck_settings::SettingsExt;
use s3deck_transfer::{Transfer, TransferCounts};

use crate::state::AppState;
use crate::types::SessionInfoDto;

pub const LOGIN_REQUIRED: &str = "login required";

fn browse_error(e: BrowseError) -> String {
    if e.requires_login() {
        format!("{LOGIN_REQUIRED}: {e}")
    } else {
        e.to_string()
    }
}

// Session

pub async fn login(
    state: &AppState,
    username: String,
    password: String,
) -> Result<SessionInfoDto, String> {
    let session = state
        .auth
        .login(&username, &password)
        .await
        .map_err(|e| e.to_string())?;
    Ok(SessionInfoDto::from_session(Some(&session), false))
}

pub async fn logout(state: &AppState) -> Result<(), String> {
    state.auth.logout();
    Ok(())
}

pub async fn get_session(state: &AppState) -> Result<SessionInfoDto, String> {
    let session = state.auth.current();
    Ok(SessionInfoDto::from_session(
        session.as_deref(),
        state.auth.is_refreshing(),
    ))
}

// Objects

pub async fn list_contents(state: &AppState, folder: String) -> Result<Vec<Content>, String> {
    state
        .browser
        .list_contents(&folder)
        .await
        .map_err(browse_error)
}

pub async fn create_folder(state: &AppState, folder: String) -> Result<String, String> {
    state
        .browser
        .create_folder(&folder)
        .await
        .map_err(browse_error)
}

/// Hands a local file to the transfer engine and returns the transfer id
/// its progress will be reported under.
pub async fn upload_file(
    state: &AppState,
    path: String,
    folder: String,
) -> Result<String, String> {
    state
        .browser
        .upload_file(&path, &folder)
        .await
        .map_err(browse_error)
}

// Transfers

pub async fn get_uploading(state: &AppState) -> Result<Vec<Transfer>, String> {
    Ok(state.transfers.registry.uploading())
}

pub async fn get_downloading(state: &AppState) -> Result<Vec<Transfer>, String> {
    Ok(state.transfers.registry.downloading())
}

pub async fn get_finished(state: &AppState) -> Result<Vec<Transfer>, String> {
    Ok(state.transfers.registry.finished())
}

pub async fn get_transfer_counts(state: &AppState) -> Result<TransferCounts, String> {
    Ok(state.transfers.registry.counts())
}

// Settings

pub async fn get_cognito_setting(state: &AppState) -> Result<Option<CognitoSetting>, String> {
    state.settings.cognito_setting().map_err(|e| e.to_string())
}

/// Stores a new provider setting. The current session was issued by the
/// old provider, so it is discarded.
pub async fn set_cognito_setting(
    state: &AppState,
    setting: CognitoSetting,
) -> Result<(), String> {
    let previous = state
        .settings
        .cognito_setting()
        .map_err(|e| e.to_string())?;
    state
        .settings
        .set_cognito_setting(&setting)
        .map_err(|e| e.to_string())?;
    if previous.as_ref() != Some(&setting) && state.auth.is_authenticated() {
        tracing::info!("identity provider setting changed, logging out");
        state.auth.logout();
    }
    Ok(())
}

pub async fn get_download_path(state: &AppState) -> Result<Option<String>, String> {
    state.settings.download_path().map_err(|e| e.to_string())
}

pub async fn set_download_path(state: &AppState, path: String) -> Result<(), String> {
    if path.trim().is_empty() {
        return Err("download path must not be empty".into());
    }
    state
        .settings
        .set_download_path(&path)
        .map_err(|e| e.to_string())
}
