// Daybook service object: owns the config store, document registry, sync
// coordinator and status bar, and implements the host commands on top of them.
//
// Constructed once per process and passed to whatever drives it (the CLI for
// one-shot commands, `run_standalone` for the long-running daemon).

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use daybook_common::note::{daily_note_content, daily_note_file_name, DEFAULT_NOTE_EXTENSION};
use daybook_common::settings::{check_interval, IntervalError, SettingKey, SettingValue, Settings};
use daybook_common::text::count_words;
use daybook_common::time::{now_timestamp, today};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ConfigStore};
use crate::documents::{DocumentError, DocumentRegistry, DocumentStore};
use crate::git::coordinator::{CommitReport, SyncCoordinator, SyncOutcome};
use crate::git::worker::{CommandExecutor, ProcessCommandExecutor};
use crate::notification::{Notifier, TracingNotifier};
use crate::status_bar::{StatusBar, Widget};
use crate::watcher::ConfigWatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    New,
    Ready,
    Terminated,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("notebook path is not configured; run `daybook setup <PATH>` first")]
    NotebookNotConfigured,

    #[error("git is not enabled for this notebook; run `daybook git` to enable it")]
    GitDisabled,

    #[error(transparent)]
    Interval(#[from] IntervalError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("failed to create {path}: {source}")]
    Create { path: PathBuf, source: io::Error },
}

/// Snapshot for `daybook status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: LifecycleState,
    pub notebook_configured: bool,
    pub settings: Settings,
    pub auto_commit_active: bool,
    pub status_bar: Vec<Widget>,
}

#[derive(Debug)]
struct RuntimeState {
    lifecycle: LifecycleState,
    notebook_configured: bool,
}

pub struct Daybook<E: CommandExecutor + Clone = ProcessCommandExecutor> {
    config: Arc<ConfigStore>,
    documents: Arc<DocumentRegistry>,
    notifier: Arc<dyn Notifier>,
    coordinator: Arc<SyncCoordinator<E>>,
    status_bar: Mutex<StatusBar>,
    state: Mutex<RuntimeState>,
}

impl Daybook<ProcessCommandExecutor> {
    pub fn new(config: Arc<ConfigStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_executor(config, notifier, ProcessCommandExecutor)
    }
}

impl<E: CommandExecutor + Clone> Daybook<E> {
    pub fn with_executor(config: Arc<ConfigStore>, notifier: Arc<dyn Notifier>, executor: E) -> Self {
        let documents = Arc::new(DocumentRegistry::new());
        let coordinator = Arc::new(SyncCoordinator::with_executor(
            config.clone(),
            documents.clone(),
            notifier.clone(),
            executor,
        ));
        Self {
            config,
            documents,
            notifier,
            coordinator,
            status_bar: Mutex::new(StatusBar::new()),
            state: Mutex::new(RuntimeState {
                lifecycle: LifecycleState::New,
                notebook_configured: false,
            }),
        }
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn documents(&self) -> &Arc<DocumentRegistry> {
        &self.documents
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator<E>> {
        &self.coordinator
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lock_state().lifecycle
    }

    pub fn notebook_configured(&self) -> bool {
        self.lock_state().notebook_configured
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Bring the notebook up: initialise git and arm auto-commit as configured.
    pub async fn activate(&self) {
        let settings = self.config.get();
        self.lock_state().notebook_configured = settings.notebook_path().is_some();

        if settings.enable_git {
            self.coordinator.initialize_repository().await;
            if settings.auto_commit {
                self.coordinator.schedule_auto_commit();
            }
        }

        self.refresh_status_bar();
        self.lock_state().lifecycle = LifecycleState::Ready;
        info!(
            notebook = ?settings.notebook_path(),
            git = settings.enable_git,
            auto_commit = settings.auto_commit,
            "daybook activated"
        );
    }

    /// Stop the timer and release the status bar.
    pub fn deactivate(&self) {
        self.coordinator.stop_auto_commit();
        self.lock_status_bar().dispose_all();
        self.lock_state().lifecycle = LifecycleState::Terminated;
        info!("daybook deactivated");
    }

    /// React to one changed setting.
    pub async fn apply_setting_change(&self, key: SettingKey) {
        let settings = self.config.get();
        debug!(key = %key, "applying setting change");

        match key {
            SettingKey::NotebookPath => {
                self.lock_state().notebook_configured = settings.notebook_path().is_some();
                self.coordinator.unbind();
                if settings.notebook_path().is_none() {
                    self.coordinator.stop_auto_commit();
                } else if settings.enable_git {
                    self.coordinator.initialize_repository().await;
                    if settings.auto_commit {
                        self.coordinator.schedule_auto_commit();
                    }
                }
            }
            SettingKey::EnableGit => {
                if settings.enable_git {
                    self.coordinator.initialize_repository().await;
                    if settings.auto_commit {
                        self.coordinator.schedule_auto_commit();
                    }
                } else {
                    self.coordinator.stop_auto_commit();
                }
            }
            SettingKey::AutoCommit => {
                if settings.enable_git && settings.auto_commit {
                    self.coordinator.schedule_auto_commit();
                } else {
                    self.coordinator.stop_auto_commit();
                }
            }
            SettingKey::AutoCommitInterval => {
                if settings.enable_git && settings.auto_commit {
                    self.coordinator.schedule_auto_commit();
                }
            }
            SettingKey::NotebookName | SettingKey::CommitMessage | SettingKey::AutoSync => {}
        }

        self.refresh_status_bar();
    }

    // ── Notes ──────────────────────────────────────────────────────

    /// Path of today's note, created with a dated heading if absent.
    pub fn open_today_note(&self) -> Result<PathBuf, CommandError> {
        let notebook = self.require_notebook()?;
        let date = today();
        let path = notebook.join(daily_note_file_name(date, DEFAULT_NOTE_EXTENSION));

        if !path.exists() {
            std::fs::create_dir_all(&notebook)
                .map_err(|source| CommandError::Create { path: notebook.clone(), source })?;
            std::fs::write(&path, daily_note_content(date))
                .map_err(|source| CommandError::Create { path: path.clone(), source })?;
            info!(path = %path.display(), "daily note created");
        }

        self.documents.open(&path)?;
        self.refresh_status_bar();
        Ok(path)
    }

    /// Append the current timestamp to today's note and save it.
    pub fn insert_timestamp(&self) -> Result<String, CommandError> {
        let path = self.open_today_note()?;
        let stamp = now_timestamp();
        self.documents.append(&path, &format!("{stamp}\n"))?;
        self.documents.save(&path)?;
        self.refresh_status_bar();
        Ok(stamp)
    }

    /// Point daybook at `path` (created if missing), optionally renaming it.
    pub async fn set_up_notebook(
        &self,
        path: &Path,
        name: Option<String>,
    ) -> Result<PathBuf, CommandError> {
        let path = absolute(path);
        std::fs::create_dir_all(&path)
            .map_err(|source| CommandError::Create { path: path.clone(), source })?;

        let mut changed = Vec::new();
        if self.config.set(SettingValue::NotebookPath(Some(path.clone())))? {
            changed.push(SettingKey::NotebookPath);
        }
        if let Some(name) = name {
            if self.config.set(SettingValue::NotebookName(name))? {
                changed.push(SettingKey::NotebookName);
            }
        }
        for key in changed {
            self.apply_setting_change(key).await;
        }

        self.lock_state().notebook_configured = true;
        self.notifier.info(&format!("Notebook set up at {}", path.display()));
        Ok(path)
    }

    // ── Git commands ───────────────────────────────────────────────

    pub async fn toggle_enable_git(&self) -> Result<bool, CommandError> {
        let enabled = !self.config.get().enable_git;
        self.update(SettingValue::EnableGit(enabled)).await?;
        self.notifier.info(if enabled { "Git enabled." } else { "Git disabled." });
        Ok(enabled)
    }

    pub async fn commit_now(&self) -> Result<CommitReport, CommandError> {
        self.require_git()?;
        Ok(self.coordinator.commit().await)
    }

    pub async fn sync_now(&self) -> Result<SyncOutcome, CommandError> {
        self.require_git()?;
        Ok(self.coordinator.sync().await)
    }

    pub async fn toggle_auto_commit(&self) -> Result<bool, CommandError> {
        let settings = self.require_git()?;
        let enabled = !settings.auto_commit;
        self.update(SettingValue::AutoCommit(enabled)).await?;
        self.notifier.info(if enabled { "Auto commit enabled." } else { "Auto commit disabled." });
        Ok(enabled)
    }

    pub async fn reset_auto_commit_interval(&self, minutes: u32) -> Result<u32, CommandError> {
        self.require_git()?;
        let minutes = check_interval(minutes).inspect_err(|e| {
            self.notifier.error(&format!("Invalid auto-commit interval: {e}."));
        })?;
        self.update(SettingValue::AutoCommitInterval(minutes)).await?;
        self.notifier.info(&format!("Auto commit interval set to {minutes} minutes."));
        Ok(minutes)
    }

    pub async fn toggle_auto_sync(&self) -> Result<bool, CommandError> {
        let settings = self.require_git()?;
        let enabled = !settings.auto_sync;
        self.update(SettingValue::AutoSync(enabled)).await?;
        self.notifier.info(if enabled { "Auto sync enabled." } else { "Auto sync disabled." });
        Ok(enabled)
    }

    // ── Status ─────────────────────────────────────────────────────

    /// Recompute every widget and return the rendered bar.
    pub fn refresh_status_bar(&self) -> String {
        let settings = self.config.get();
        let words = self.today_word_count(&settings);
        let mut bar = self.lock_status_bar();
        bar.refresh(&settings, words);
        bar.render()
    }

    pub fn status(&self) -> StatusReport {
        self.refresh_status_bar();
        let state = self.lock_state();
        StatusReport {
            state: state.lifecycle,
            notebook_configured: state.notebook_configured,
            settings: self.config.get(),
            auto_commit_active: self.coordinator.auto_commit_active(),
            status_bar: self.lock_status_bar().visible().into_iter().cloned().collect(),
        }
    }

    fn today_word_count(&self, settings: &Settings) -> Option<usize> {
        let notebook = settings.notebook_path()?;
        let path = notebook.join(daily_note_file_name(today(), DEFAULT_NOTE_EXTENSION));
        let text = match self.documents.text(&path) {
            Some(text) => text,
            None => std::fs::read_to_string(&path).ok()?,
        };
        Some(count_words(&text))
    }

    // ── Helpers ────────────────────────────────────────────────────

    async fn update(&self, value: SettingValue) -> Result<(), CommandError> {
        let key = value.key();
        if self.config.set(value)? {
            self.apply_setting_change(key).await;
        }
        Ok(())
    }

    fn require_notebook(&self) -> Result<PathBuf, CommandError> {
        match self.config.get().notebook_path() {
            Some(path) => Ok(path.clone()),
            None => {
                self.notifier.error("Notebook path is not configured.");
                Err(CommandError::NotebookNotConfigured)
            }
        }
    }

    fn require_git(&self) -> Result<Settings, CommandError> {
        let settings = self.config.get();
        if settings.enable_git {
            Ok(settings)
        } else {
            self.notifier.error("Git is not enabled.");
            Err(CommandError::GitDisabled)
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_status_bar(&self) -> std::sync::MutexGuard<'_, StatusBar> {
        self.status_bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            warn!(error = %e, "cannot resolve current directory, keeping relative path");
            path.to_path_buf()
        }
    }
}

// ── Standalone daemon ───────────────────────────────────────────────

/// Run until Ctrl-C: activate, then follow edits to the settings file.
pub async fn run_standalone(config_path: Option<PathBuf>) -> Result<()> {
    let store = match config_path {
        Some(path) => ConfigStore::open(path),
        None => ConfigStore::open_default(),
    };
    let config = Arc::new(store.context("failed to load settings")?);
    let path = config
        .path()
        .map(Path::to_path_buf)
        .context("standalone daemon requires a settings file")?;

    let daybook = Daybook::new(config.clone(), Arc::new(TracingNotifier));
    let mut changes = config.subscribe();
    daybook.activate().await;

    let (_watcher, mut file_events) =
        ConfigWatcher::start(&path).context("failed to watch settings file")?;
    info!(config = %path.display(), "standalone daemon started");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            event = file_events.recv() => {
                let Some(event) = event else {
                    warn!("config watcher stopped");
                    break;
                };
                debug!(path = %event.path.display(), "settings file changed");
                if let Err(e) = config.reload() {
                    warn!(error = %e, "settings reload failed, keeping previous settings");
                }
            }
            change = changes.recv() => match change {
                Ok(key) => daybook.apply_setting_change(key).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "setting changes lagged, re-applying all keys");
                    for key in SettingKey::ALL {
                        daybook.apply_setting_change(key).await;
                    }
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    daybook.deactivate();
    Ok(())
}
