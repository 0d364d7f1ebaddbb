//! Durable settings for s3deck.
//!
//! A flat key/value store (JSON values) holding the identity-provider
//! setting, the download directory and the persisted session tokens.
//! The core only talks to the [`SettingsStore`] trait; [`JsonFileStore`]
//! and [`MemoryStore`] are the two implementations shipped here.

mod paths;
mod store;
mod typed;

pub use paths::{config_dir, default_settings_path};
pub use store::{JsonFileStore, MemoryStore, SettingsStore};
pub use typed::SettingsExt;

/// Errors from settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
