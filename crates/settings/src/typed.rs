use serde::Serialize;
use serde::de::DeserializeOwned;

use s3deck_protocol::CognitoSetting;
use s3deck_protocol::constants::{KEY_COGNITO_SETTING, KEY_DOWNLOAD_PATH};

use crate::{SettingsError, SettingsStore};

/// Typed accessors on top of any [`SettingsStore`].
pub trait SettingsExt {
    /// Reads and decodes the value under `key`.
    ///
    /// A value that fails to decode is reported as an error rather than
    /// treated as absent.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SettingsError>;

    /// Encodes and stores `value` under `key`.
    fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SettingsError>;

    /// The stored identity-provider setting, if the user has entered one.
    fn cognito_setting(&self) -> Result<Option<CognitoSetting>, SettingsError> {
        self.get_as(KEY_COGNITO_SETTING)
    }

    fn set_cognito_setting(&self, setting: &CognitoSetting) -> Result<(), SettingsError> {
        self.set_as(KEY_COGNITO_SETTING, setting)
    }

    /// The directory downloads are written to.
    fn download_path(&self) -> Result<Option<String>, SettingsError> {
        self.get_as(KEY_DOWNLOAD_PATH)
    }

    fn set_download_path(&self, path: &str) -> Result<(), SettingsError> {
        self.set_as(KEY_DOWNLOAD_PATH, &path)
    }
}

impl<S: SettingsStore + ?Sized> SettingsExt for S {
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SettingsError> {
        match self.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SettingsError> {
        self.set(key, serde_json::to_value(value)?)
    }
}
