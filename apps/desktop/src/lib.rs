pub mod commands;
pub mod config;
pub mod events;
pub mod state;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use s3deck_settings::{JsonFileStore, MemoryStore, SettingsStore};

use config::AppConfig;
use state::{AppState, Collaborators};
use types::TransferSummaryDto;

/// Opens the settings store at the configured path, falling back to an
/// in-memory store when there is no usable path.
pub fn open_settings(config: &AppConfig) -> Arc<dyn SettingsStore> {
    config
        .settings_path
        .clone()
        .and_then(|path| {
            JsonFileStore::new(path)
                .map_err(|e| tracing::warn!("failed to load settings: {e}"))
                .ok()
        })
        .map(|store| Arc::new(store) as Arc<dyn SettingsStore>)
        .unwrap_or_else(|| {
            tracing::warn!("settings will not be persisted");
            Arc::new(MemoryStore::new())
        })
}

/// Replays progress from stdin and prints the resulting transfer views.
pub async fn run() -> anyhow::Result<()> {
    let (cfg, load_error) = match AppConfig::load() {
        Ok(c) => (c, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting s3deck");
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "failed to load config, using defaults");
    }

    let settings = open_settings(&cfg);
    let state = AppState::new(cfg, settings, Collaborators::offline());

    if state.auth.restore() {
        let session = commands::get_session(&state)
            .await
            .map_err(anyhow::Error::msg)?;
        tracing::info!(identity = ?session.identity_id, "session available");
    }

    state.transfers.start();
    let pumped = events::pump_lines(
        BufReader::new(tokio::io::stdin()),
        &state.transfers.channels,
    )
    .await
    .context("reading progress input")?;
    let ingest = state.transfers.shutdown().await;
    tracing::info!(lines = pumped.lines, skipped = pumped.skipped, "replay finished");

    let summary = TransferSummaryDto {
        counts: commands::get_transfer_counts(&state)
            .await
            .map_err(anyhow::Error::msg)?,
        uploading: commands::get_uploading(&state)
            .await
            .map_err(anyhow::Error::msg)?,
        downloading: commands::get_downloading(&state)
            .await
            .map_err(anyhow::Error::msg)?,
        finished: commands::get_finished(&state)
            .await
            .map_err(anyhow::Error::msg)?,
        ingest,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
