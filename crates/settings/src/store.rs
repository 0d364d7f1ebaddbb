use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

use crate::SettingsError;

/// Durable key/value storage for settings and session tokens.
///
/// Values survive process restarts. Multi-key writes go through
/// [`set_many`](Self::set_many) / [`remove_many`](Self::remove_many) so an
/// implementation can commit them in one write.
pub trait SettingsStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.set_many(vec![(key.to_string(), value)])
    }

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), SettingsError> {
        self.remove_many(&[key])
    }

    /// Stores several values at once.
    fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), SettingsError>;

    /// Removes several keys at once.
    fn remove_many(&self, keys: &[&str]) -> Result<(), SettingsError>;
}

/// Settings cached in memory and persisted to a JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Opens a store, loading existing values from disk.
    pub fn new(path: PathBuf) -> Result<Self, SettingsError> {
        let values = load_values(&path)?;
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns all stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.values.read().unwrap().keys().cloned().collect()
    }

    /// Writes the current values to disk.
    fn persist(&self, map: &BTreeMap<String, Value>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(map)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        set_permissions_0600(&self.path);
        debug!("persisted {} setting(s) to {:?}", map.len(), self.path);
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().unwrap().get(key).cloned()
    }

    fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), SettingsError> {
        let mut map = self.values.write().unwrap();
        let mut next = map.clone();
        next.extend(entries);
        self.persist(&next)?;
        *map = next;
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), SettingsError> {
        let mut map = self.values.write().unwrap();
        if !keys.iter().any(|key| map.contains_key(*key)) {
            return Ok(());
        }
        let mut next = map.clone();
        for key in keys {
            next.remove(*key);
        }
        // Memory only changes once the file does.
        self.persist(&next)?;
        *map = next;
        Ok(())
    }
}

/// Loads values from a JSON file on disk.
fn load_values(path: &Path) -> Result<BTreeMap<String, Value>, SettingsError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let data = std::fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let values: BTreeMap<String, Value> = serde_json::from_str(&data)?;
    debug!("loaded {} setting(s) from {:?}", values.len(), path);
    Ok(values)
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Volatile store, for tests and for running without a settings file.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().unwrap().get(key).cloned()
    }

    fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), SettingsError> {
        let mut map = self.values.write().unwrap();
        map.extend(entries);
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), SettingsError> {
        let mut map = self.values.write().unwrap();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}
