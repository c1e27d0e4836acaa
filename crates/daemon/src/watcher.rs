// Config file watcher: inotify/fsevents on the settings directory, filtered
// down to writes of the settings file itself.
//
// The parent directory is watched rather than the file so editors that save
// by rename (write temp, move over) are still seen.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

/// Capacity for the internal event channel. Bursts collapse into one reload.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// The settings file was written, replaced or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFileChanged {
    pub path: PathBuf,
}

pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    file: PathBuf,
}

impl ConfigWatcher {
    /// Start watching `config_path`. Its parent directory is created if missing.
    pub fn start(config_path: &Path) -> Result<(Self, mpsc::Receiver<ConfigFileChanged>)> {
        let file_name = config_path
            .file_name()
            .map(OsString::from)
            .with_context(|| format!("config path has no file name: {}", config_path.display()))?;
        let parent = match config_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
        let dir = parent
            .canonicalize()
            .with_context(|| format!("failed to canonicalize config directory: {}", parent.display()))?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let dir_for_filter = dir.clone();
        let name_for_filter = file_name.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Some(changed) = translate_event(&event, &dir_for_filter, &name_for_filter) {
                    // A full channel already holds a pending reload.
                    if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(changed) {
                        debug!("config event channel closed, stopping event dispatch");
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "config watcher error");
            }
        })
        .context("failed to create config watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch directory: {}", dir.display()))?;

        let file = dir.join(&file_name);
        debug!(path = %file.display(), "config watcher started");

        Ok((Self { _watcher: watcher, file }, rx))
    }

    /// Canonical path of the watched settings file.
    pub fn file(&self) -> &Path {
        &self.file
    }
}

/// Map a `notify::Event` to a settings-file change, if it touches the file.
fn translate_event(event: &Event, dir: &Path, file_name: &OsString) -> Option<ConfigFileChanged> {
    match &event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => {}
        EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => {
            trace!("skipping metadata-only modify event");
            return None;
        }
        EventKind::Modify(_) => {}
        _ => {
            trace!(kind = ?event.kind, "skipping non-content event");
            return None;
        }
    }

    event
        .paths
        .iter()
        .find(|p| p.parent() == Some(dir) && p.file_name() == Some(file_name.as_os_str()))
        .map(|p| ConfigFileChanged { path: p.clone() })
}
