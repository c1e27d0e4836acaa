// Sync coordinator: the only component that mutates the notebook repository.
//
// Owns the repository handle (one `GitWorker` bound to the notebook path), an
// operation lock that serialises commit/sync/timer ticks, and the auto-commit
// timer. Failures never escape: they are logged, reported through the
// notifier, and returned as a `Failed` outcome.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use daybook_common::settings::Settings;
use daybook_common::time::now_timestamp;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::scheduler::{AutoCommitScheduler, AutoCommitTarget};
use super::worker::{
    CommandExecutor, GitWorker, GitWorkerError, ProcessCommandExecutor, DEFAULT_GIT_TIMEOUT,
};
use crate::config::ConfigStore;
use crate::documents::{dirty_documents_under, DocumentError, DocumentStore};
use crate::notification::Notifier;

/// The only remote the notebook syncs with.
pub const REMOTE: &str = "origin";
/// The only branch the notebook syncs with.
pub const BRANCH: &str = "master";

const STASH_MESSAGE_PREFIX: &str = "Stashed by daybook";

// ── Outcomes ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum InitOutcome {
    /// No notebook path configured; nothing was touched.
    NotConfigured,
    AlreadyInitialized { top_level: PathBuf },
    Initialized,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommitOutcome {
    NotConfigured,
    Committed { message: String },
    NothingToCommit,
    Failed,
}

impl CommitOutcome {
    /// Whether the commit step itself succeeded (a clean tree counts).
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Committed { .. } | Self::NothingToCommit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncOutcome {
    NotConfigured,
    Synced { pulled: bool, pushed: bool },
    Failed,
}

/// Result of `commit`, including the chained sync when auto-sync is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub outcome: CommitOutcome,
    pub sync: Option<SyncOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled { period: Duration },
    NotConfigured,
    InvalidInterval { minutes: u32 },
    /// Called outside a tokio runtime.
    NoRuntime,
}

#[derive(Debug, Error)]
enum StepError {
    #[error(transparent)]
    Git(#[from] GitWorkerError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Progress of one sync run, kept so a failure can report a stranded stash.
#[derive(Debug, Default)]
struct SyncProgress {
    stash_created: bool,
    stash_popped: bool,
    pulled: bool,
    pushed: bool,
}

// ── Coordinator ─────────────────────────────────────────────────────

pub struct SyncCoordinator<E: CommandExecutor + Clone = ProcessCommandExecutor> {
    config: Arc<ConfigStore>,
    documents: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    executor: E,
    git_timeout: Duration,
    repository: Mutex<Option<GitWorker<E>>>,
    operation: tokio::sync::Mutex<()>,
    scheduler: AutoCommitScheduler,
}

impl SyncCoordinator<ProcessCommandExecutor> {
    pub fn new(
        config: Arc<ConfigStore>,
        documents: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_executor(config, documents, notifier, ProcessCommandExecutor)
    }
}

impl<E: CommandExecutor + Clone> SyncCoordinator<E> {
    pub fn with_executor(
        config: Arc<ConfigStore>,
        documents: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        executor: E,
    ) -> Self {
        Self {
            config,
            documents,
            notifier,
            executor,
            git_timeout: DEFAULT_GIT_TIMEOUT,
            repository: Mutex::new(None),
            operation: tokio::sync::Mutex::new(()),
            scheduler: AutoCommitScheduler::new(),
        }
    }

    pub fn with_git_timeout(mut self, timeout: Duration) -> Self {
        self.git_timeout = timeout;
        self
    }

    /// Path the repository handle is currently bound to.
    pub fn bound_path(&self) -> Option<PathBuf> {
        self.lock_repository().as_ref().map(|repo| repo.repo_path().to_path_buf())
    }

    /// Discard the repository handle; the next operation binds a fresh one.
    pub fn unbind(&self) {
        if self.lock_repository().take().is_some() {
            debug!("repository handle discarded");
        }
    }

    /// Handle for the configured notebook path. A handle bound to a different
    /// path is replaced, never re-pointed.
    fn repository(&self, settings: &Settings) -> Option<GitWorker<E>> {
        let mut slot = self.lock_repository();
        let Some(path) = settings.notebook_path() else {
            if slot.take().is_some() {
                debug!("notebook path cleared, repository handle discarded");
            }
            return None;
        };

        let stale = slot.as_ref().is_some_and(|repo| repo.repo_path() != path.as_path());
        if stale || slot.is_none() {
            if stale {
                info!(path = %path.display(), "notebook path changed, rebinding repository");
            }
            *slot = Some(
                GitWorker::with_executor(path.clone(), self.executor.clone())
                    .with_timeout(self.git_timeout),
            );
        }
        slot.clone()
    }

    fn lock_repository(&self) -> std::sync::MutexGuard<'_, Option<GitWorker<E>>> {
        self.repository.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── initializeRepository ───────────────────────────────────────

    pub async fn initialize_repository(&self) -> InitOutcome {
        let _guard = self.operation.lock().await;
        let settings = self.config.get();
        let Some(repo) = self.repository(&settings) else {
            debug!("initialize skipped: no notebook path configured");
            return InitOutcome::NotConfigured;
        };

        self.notifier.info("Initializing git repository...");

        if !repo.repo_path().is_dir() {
            warn!(path = %repo.repo_path().display(), "notebook directory does not exist");
            self.notifier.error(&format!(
                "Notebook directory does not exist: {}",
                repo.repo_path().display()
            ));
            return InitOutcome::Failed;
        }

        match init_repository(&repo).await {
            Ok(InitOutcome::AlreadyInitialized { top_level }) => {
                self.notifier.info("Git repository already exists.");
                InitOutcome::AlreadyInitialized { top_level }
            }
            Ok(outcome) => {
                info!(path = %repo.repo_path().display(), "git repository initialized");
                self.notifier.info("Git repository initialized.");
                outcome
            }
            Err(e) => {
                error!(error = %e, "failed to initialize git repository");
                self.notifier.error("Failed to initialize git repository.");
                InitOutcome::Failed
            }
        }
    }

    // ── commit ─────────────────────────────────────────────────────

    /// Flush dirty notes, commit any changes, then sync if auto-sync is on.
    pub async fn commit(&self) -> CommitReport {
        let _guard = self.operation.lock().await;
        let settings = self.config.get();
        let Some(repo) = self.repository(&settings) else {
            debug!("commit skipped: no notebook path configured");
            return CommitReport { outcome: CommitOutcome::NotConfigured, sync: None };
        };

        self.notifier.info("Checking for changes to commit...");
        let outcome = match self.commit_changes(&repo, &settings).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "error during commit");
                self.notifier.error("Failed to commit changes.");
                CommitOutcome::Failed
            }
        };

        let sync = if settings.auto_sync && outcome.succeeded() {
            Some(self.sync_repository(&repo).await)
        } else {
            None
        };

        CommitReport { outcome, sync }
    }

    async fn commit_changes(
        &self,
        repo: &GitWorker<E>,
        settings: &Settings,
    ) -> Result<CommitOutcome, StepError> {
        self.save_dirty_documents(repo.repo_path())?;

        let status = repo.status().await?;
        if status.is_clean {
            self.notifier.info("No changes to commit.");
            return Ok(CommitOutcome::NothingToCommit);
        }

        self.notifier.info("Staging changes...");
        repo.add_all().await?;

        let message = commit_message(settings);
        repo.commit(&message).await?;
        info!(entries = status.changed_entries, %message, "notebook changes committed");
        self.notifier.info("Changes committed.");
        Ok(CommitOutcome::Committed { message })
    }

    fn save_dirty_documents(&self, root: &Path) -> Result<(), DocumentError> {
        for path in dirty_documents_under(self.documents.as_ref(), root) {
            self.documents.save(&path)?;
            debug!(path = %path.display(), "saved dirty note before commit");
        }
        Ok(())
    }

    // ── sync ───────────────────────────────────────────────────────

    /// Stash, fetch, pull if behind, pop, push if ahead.
    pub async fn sync(&self) -> SyncOutcome {
        let _guard = self.operation.lock().await;
        let settings = self.config.get();
        let Some(repo) = self.repository(&settings) else {
            debug!("sync skipped: no notebook path configured");
            return SyncOutcome::NotConfigured;
        };
        self.sync_repository(&repo).await
    }

    /// Caller holds the operation lock.
    async fn sync_repository(&self, repo: &GitWorker<E>) -> SyncOutcome {
        self.notifier.info("Syncing changes...");

        let mut progress = SyncProgress::default();
        match self.run_sync_protocol(repo, &mut progress).await {
            Ok(()) => {
                info!(pulled = progress.pulled, pushed = progress.pushed, "notebook synced");
                self.notifier.info("Changes synced successfully.");
                SyncOutcome::Synced { pulled: progress.pulled, pushed: progress.pushed }
            }
            Err(e) => {
                error!(error = %e, "error during sync");
                self.notifier.error("Failed to sync changes.");
                if progress.stash_created && !progress.stash_popped {
                    warn!(path = %repo.repo_path().display(), "sync aborted with local changes stashed");
                    self.notifier.error(
                        "Local changes are still stashed; run `git stash pop` in the notebook.",
                    );
                }
                SyncOutcome::Failed
            }
        }
    }

    async fn run_sync_protocol(
        &self,
        repo: &GitWorker<E>,
        progress: &mut SyncProgress,
    ) -> Result<(), GitWorkerError> {
        let remotes = repo.remotes().await?;
        if remotes.is_empty() {
            warn!("no remote configured, continuing sync anyway");
            self.notifier.error("No remote repository found.");
        }

        let status = repo.status().await?;
        if !status.is_clean {
            repo.add_all().await?;
            self.notifier.info("Stashing local changes...");
            repo.stash_push(&format!("{STASH_MESSAGE_PREFIX} at {}", now_timestamp())).await?;
            progress.stash_created = true;
        }

        let local = repo.rev_parse(&["HEAD"]).await?;
        repo.fetch(REMOTE).await?;
        let remote_ref = format!("{REMOTE}/{BRANCH}");
        let remote_head = repo.rev_parse(&[remote_ref.as_str()]).await?;

        if local != remote_head {
            debug!(%local, %remote_head, "remote differs, pulling");
            self.notifier.info("Pulling changes...");
            repo.pull(REMOTE, BRANCH).await?;
            progress.pulled = true;
        }

        if progress.stash_created {
            self.notifier.info("Applying stashed changes...");
            repo.stash_pop().await?;
            progress.stash_popped = true;
        }

        let status = repo.status().await?;
        let ahead = if status.upstream.is_some() {
            status.ahead
        } else {
            repo.count_ahead_of(&remote_ref).await?
        };
        if ahead > 0 {
            debug!(ahead, "local commits ahead of remote, pushing");
            self.notifier.info("Pushing changes...");
            repo.push(REMOTE, BRANCH).await?;
            progress.pushed = true;
        }

        Ok(())
    }

    // ── scheduleAutoCommit / stopAutoCommit ────────────────────────

    /// Arm (or re-arm) the auto-commit timer from the current settings.
    pub fn schedule_auto_commit(self: &Arc<Self>) -> ScheduleOutcome {
        let settings = self.config.get();
        if settings.notebook_path().is_none() {
            debug!("auto-commit not scheduled: no notebook path configured");
            self.scheduler.stop();
            return ScheduleOutcome::NotConfigured;
        }
        let Some(period) = settings.auto_commit_period() else {
            self.scheduler.stop();
            warn!(minutes = settings.auto_commit_interval, "invalid auto-commit interval");
            self.notifier.error(&format!(
                "Invalid auto-commit interval: {} minutes.",
                settings.auto_commit_interval
            ));
            return ScheduleOutcome::InvalidInterval { minutes: settings.auto_commit_interval };
        };

        if !self.scheduler.schedule(period, Arc::downgrade(self)) {
            return ScheduleOutcome::NoRuntime;
        }
        ScheduleOutcome::Scheduled { period }
    }

    /// Cancel the auto-commit timer. Safe when none is live.
    pub fn stop_auto_commit(&self) -> bool {
        self.scheduler.stop()
    }

    pub fn auto_commit_active(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn auto_commit_period(&self) -> Option<Duration> {
        self.scheduler.period()
    }
}

impl<E: CommandExecutor + Clone> AutoCommitTarget for SyncCoordinator<E> {
    async fn auto_commit(&self) -> anyhow::Result<()> {
        info!("auto commit");
        let report = self.commit().await;
        if report.outcome == CommitOutcome::Failed || report.sync == Some(SyncOutcome::Failed) {
            anyhow::bail!("auto commit did not complete: {report:?}");
        }
        Ok(())
    }
}

async fn init_repository<E: CommandExecutor>(
    repo: &GitWorker<E>,
) -> Result<InitOutcome, GitWorkerError> {
    match repo.show_toplevel().await {
        Ok(top_level) if top_level.join(".git").exists() => {
            debug!(top_level = %top_level.display(), "repository already present");
            return Ok(InitOutcome::AlreadyInitialized { top_level });
        }
        Ok(_) => {}
        // Not inside any repository yet.
        Err(GitWorkerError::CommandFailed { .. }) => {}
        Err(e) => return Err(e),
    }

    repo.init().await?;
    Ok(InitOutcome::Initialized)
}

/// `<template> at <timestamp>`; an empty template falls back to the default.
fn commit_message(settings: &Settings) -> String {
    let template = settings.commit_message.trim();
    let template = if template.is_empty() {
        Settings::default().commit_message
    } else {
        template.to_string()
    };
    format!("{template} at {}", now_timestamp())
}
