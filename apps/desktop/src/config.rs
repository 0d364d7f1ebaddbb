//! Desktop configuration.
//!
//! Optional JSON file at `<config dir>/s3deck/config.json`. Every field has
//! a default; a missing file or one that fails to parse yields defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use s3deck_auth::{ReauthConfig, RepeatedExpiryPolicy};
use s3deck_transfer::DEFAULT_CHANNEL_CAPACITY;

const DEFAULT_LOG_FILTER: &str = "info,s3deck=debug";
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 30;

/// On-disk shape of `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
struct AppConfigFile {
    #[serde(default)]
    settings_path: Option<PathBuf>,
    #[serde(default)]
    log_filter: Option<String>,
    /// `0` disables the bound.
    #[serde(default)]
    refresh_timeout_secs: Option<u64>,
    #[serde(default)]
    logout_on_repeated_expiry: bool,
    #[serde(default)]
    channel_capacity: Option<usize>,
}

/// Resolved desktop configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Where session tokens and user settings are persisted.
    pub settings_path: Option<PathBuf>,
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub refresh_timeout: Option<Duration>,
    pub logout_on_repeated_expiry: bool,
    /// Per-subscription buffer of the progress channels.
    pub channel_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: s3deck_settings::default_settings_path(),
            log_filter: DEFAULT_LOG_FILTER.into(),
            refresh_timeout: Some(Duration::from_secs(DEFAULT_REFRESH_TIMEOUT_SECS)),
            logout_on_repeated_expiry: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Loads the config from its default location.
    pub fn load() -> anyhow::Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::warn!("no config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Loads the config from `path`.
    ///
    /// Missing file: defaults. Unparseable file: defaults, with a warning.
    /// Unreadable file: error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if !path.exists() {
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let Ok(file) = serde_json::from_str::<AppConfigFile>(&content) else {
            tracing::warn!(
                path = %path.display(),
                "failed to parse app config, using defaults"
            );
            return Ok(config);
        };

        if let Some(p) = file.settings_path {
            config.settings_path = Some(p);
        }
        if let Some(filter) = file.log_filter.filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }
        if let Some(secs) = file.refresh_timeout_secs {
            config.refresh_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config.logout_on_repeated_expiry = file.logout_on_repeated_expiry;
        if let Some(cap) = file.channel_capacity.filter(|&c| c > 0) {
            config.channel_capacity = cap;
        }
        Ok(config)
    }

    /// Coordinator settings derived from this config.
    pub fn reauth(&self) -> ReauthConfig {
        ReauthConfig {
            refresh_timeout: self.refresh_timeout,
            repeated_expiry: if self.logout_on_repeated_expiry {
                RepeatedExpiryPolicy::ForceLogout
            } else {
                RepeatedExpiryPolicy::Surface
            },
        }
    }
}

/// Default config file path: `<config dir>/s3deck/config.json`.
pub fn config_path() -> Option<PathBuf> {
    s3deck_settings::config_dir().map(|d| d.join("s3deck").join("config.json"))
}
