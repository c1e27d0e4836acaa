// Config store for notebook settings.
//
// Settings file: `~/.daybook/config.toml` (or an explicit path).
// Every effective change is published per key on a broadcast channel so the
// runtime can re-arm timers and rebind the repository.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use daybook_common::settings::{SettingKey, SettingValue, Settings};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Root directory for daybook global state: `~/.daybook/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".daybook"))
}

/// Path to the default settings file: `~/.daybook/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Read settings from `path`. A missing file yields defaults.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(e) => Err(ConfigError::Io(e)),
    }
}

/// Write settings to `path`, creating parent directories.
pub fn save_settings(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = toml::to_string_pretty(settings)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Typed key-value store over [`Settings`] with change notifications.
pub struct ConfigStore {
    path: Option<PathBuf>,
    settings: RwLock<Settings>,
    changes: broadcast::Sender<SettingKey>,
}

impl ConfigStore {
    /// Store backed by a settings file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let settings = load_settings(&path)?;
        debug!(path = %path.display(), "settings loaded");
        Ok(Self::build(Some(path), settings))
    }

    /// Store backed by `~/.daybook/config.toml`.
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(default_config_path().ok_or(ConfigError::NoHomeDir)?)
    }

    /// Store that never touches disk.
    pub fn in_memory(settings: Settings) -> Self {
        Self::build(None, settings)
    }

    fn build(path: Option<PathBuf>, settings: Settings) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { path, settings: RwLock::new(settings), changes }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// A fresh snapshot of every setting.
    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SettingKey> {
        self.changes.subscribe()
    }

    /// Update one setting. Persists and notifies only when the value changed.
    /// Returns whether it changed.
    pub fn set(&self, value: SettingValue) -> Result<bool, ConfigError> {
        let key = value.key();
        let snapshot = {
            let mut settings = self.write();
            let previous = settings.clone();
            if !settings.apply(value) {
                return Ok(false);
            }
            if let Err(error) = self.persist(&settings) {
                *settings = previous;
                return Err(error);
            }
            settings.clone()
        };

        info!(key = %key, "setting updated");
        debug!(?snapshot, "settings after update");
        self.publish(key);
        Ok(true)
    }

    /// Re-read the settings file and notify each changed key.
    pub fn reload(&self) -> Result<Vec<SettingKey>, ConfigError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        let fresh = load_settings(path)?;
        let changed = {
            let mut settings = self.write();
            let changed = settings.diff(&fresh);
            *settings = fresh;
            changed
        };

        for key in &changed {
            self.publish(*key);
        }
        if !changed.is_empty() {
            info!(keys = ?changed, "settings reloaded");
        }
        Ok(changed)
    }

    fn persist(&self, settings: &Settings) -> Result<(), ConfigError> {
        match &self.path {
            Some(path) => save_settings(settings, path),
            None => Ok(()),
        }
    }

    fn publish(&self, key: SettingKey) {
        // No subscribers is fine: one-shot commands do not listen.
        let _ = self.changes.send(key);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Settings> {
        self.settings.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::open(dir.path().join("config.toml")).unwrap();
        assert_eq!(store.get(), Settings::default());
    }

    #[test]
    fn invalid_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "autoCommit = \"yes\"").unwrap();
        assert!(matches!(ConfigStore::open(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn set_persists_and_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep").join("config.toml");
        let store = ConfigStore::open(&path).unwrap();

        assert!(store.set(SettingValue::AutoCommitInterval(5)).unwrap());
        assert!(store.set(SettingValue::NotebookPath(Some("/tmp/nb".into()))).unwrap());

        let on_disk = load_settings(&path).unwrap();
        assert_eq!(on_disk.auto_commit_interval, 5);
        assert_eq!(on_disk.notebook_path, Some(PathBuf::from("/tmp/nb")));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("autoCommitInterval = 5"));
    }

    #[test]
    fn set_notifies_only_on_change() {
        let store = ConfigStore::in_memory(Settings::default());
        let mut rx = store.subscribe();

        assert!(store.set(SettingValue::AutoSync(true)).unwrap());
        assert!(!store.set(SettingValue::AutoSync(true)).unwrap());

        assert_eq!(rx.try_recv().unwrap(), SettingKey::AutoSync);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reload_publishes_changed_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let store = ConfigStore::open(&path).unwrap();
        let mut rx = store.subscribe();

        let mut edited = Settings::default();
        edited.auto_commit = true;
        edited.auto_commit_interval = 3;
        save_settings(&edited, &path).unwrap();

        let changed = store.reload().unwrap();
        assert_eq!(changed, vec![SettingKey::AutoCommit, SettingKey::AutoCommitInterval]);
        assert_eq!(rx.try_recv().unwrap(), SettingKey::AutoCommit);
        assert_eq!(rx.try_recv().unwrap(), SettingKey::AutoCommitInterval);
        assert_eq!(store.get(), edited);

        assert!(store.reload().unwrap().is_empty());
    }

    #[test]
    fn in_memory_reload_is_a_no_op() {
        let store = ConfigStore::in_memory(Settings::default());
        assert!(store.reload().unwrap().is_empty());
        assert!(store.path().is_none());
    }

    #[test]
    fn default_config_path_is_under_home() {
        let path = default_config_path().expect("home directory");
        assert!(path.ends_with(".daybook/config.toml"));
    }
}
