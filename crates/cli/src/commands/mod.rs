// CLI subcommand dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use daybook_daemon::config::ConfigStore;
use daybook_daemon::runtime::Daybook;
use tracing::debug;

use crate::notifier::ConsoleNotifier;
use crate::output::OutputFormat;

pub mod git;
pub mod interval;
pub mod note;
pub mod setup;
pub mod status;

#[derive(Subcommand)]
pub enum Command {
    /// Open today's note, creating it if needed
    Today,
    /// Point daybook at a notebook directory
    Setup(setup::SetupArgs),
    /// Append the current timestamp to today's note
    Timestamp,
    /// Toggle git for the notebook
    Git,
    /// Commit notebook changes now
    Commit,
    /// Toggle automatic commits
    AutoCommit,
    /// Set the auto-commit interval (prompts when MINUTES is omitted)
    Interval(interval::IntervalArgs),
    /// Pull and push against origin/master now
    Sync,
    /// Toggle syncing after every commit
    AutoSync,
    /// Show settings and status bar
    Status,
}

/// Everything a command needs: the service object and the output format.
pub struct Session {
    pub daybook: Daybook,
    pub format: OutputFormat,
}

impl Session {
    fn open(config: Option<PathBuf>, format: OutputFormat) -> anyhow::Result<Self> {
        let store = match config {
            Some(path) => ConfigStore::open(path),
            None => ConfigStore::open_default(),
        }
        .context("failed to load settings")?;
        debug!(config = ?store.path(), "settings loaded");
        let daybook = Daybook::new(Arc::new(store), Arc::new(ConsoleNotifier::new(format)));
        Ok(Self { daybook, format })
    }
}

pub fn run(cmd: Command, config: Option<PathBuf>, format: OutputFormat) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    runtime.block_on(async move {
        let session = Session::open(config, format)?;
        match cmd {
            Command::Today => note::today(&session),
            Command::Setup(args) => setup::run(&session, args).await,
            Command::Timestamp => note::timestamp(&session),
            Command::Git => git::toggle_git(&session).await,
            Command::Commit => git::commit(&session).await,
            Command::AutoCommit => git::toggle_auto_commit(&session).await,
            Command::Interval(args) => interval::run(&session, args).await,
            Command::Sync => git::sync(&session).await,
            Command::AutoSync => git::toggle_auto_sync(&session).await,
            Command::Status => status::run(&session),
        }
    })
}
