// `daybook git|commit|sync|auto-commit|auto-sync`: git toggles and one-shot
// repository operations.

use daybook_daemon::git::coordinator::{CommitOutcome, CommitReport, SyncOutcome};
use daybook_daemon::runtime::CommandError;
use serde::Serialize;

use super::Session;
use crate::exit_code::OperationFailed;
use crate::output;

#[derive(Debug, Serialize)]
pub struct ToggleResult {
    pub setting: &'static str,
    pub enabled: bool,
}

pub async fn toggle_git(session: &Session) -> anyhow::Result<()> {
    let enabled = session.daybook.toggle_enable_git().await?;
    print_toggle(session, "enableGit", enabled)
}

pub async fn toggle_auto_commit(session: &Session) -> anyhow::Result<()> {
    let enabled = session.daybook.toggle_auto_commit().await?;
    print_toggle(session, "autoCommit", enabled)
}

pub async fn toggle_auto_sync(session: &Session) -> anyhow::Result<()> {
    let enabled = session.daybook.toggle_auto_sync().await?;
    print_toggle(session, "autoSync", enabled)
}

fn print_toggle(session: &Session, setting: &'static str, enabled: bool) -> anyhow::Result<()> {
    output::print_output(session.format, &ToggleResult { setting, enabled }, |r| {
        format!("{}: {}", r.setting, if r.enabled { "on" } else { "off" })
    })?;
    Ok(())
}

pub async fn commit(session: &Session) -> anyhow::Result<()> {
    let report = session.daybook.commit_now().await?;
    output::print_output(session.format, &report, format_commit)?;
    check_commit(&report)
}

pub async fn sync(session: &Session) -> anyhow::Result<()> {
    let outcome = session.daybook.sync_now().await?;
    output::print_output(session.format, &outcome, format_sync)?;
    check_sync(&outcome)
}

fn check_commit(report: &CommitReport) -> anyhow::Result<()> {
    match report.outcome {
        CommitOutcome::NotConfigured => return Err(CommandError::NotebookNotConfigured.into()),
        CommitOutcome::Failed => return Err(OperationFailed { operation: "commit" }.into()),
        CommitOutcome::Committed { .. } | CommitOutcome::NothingToCommit => {}
    }
    match &report.sync {
        Some(outcome) => check_sync(outcome),
        None => Ok(()),
    }
}

fn check_sync(outcome: &SyncOutcome) -> anyhow::Result<()> {
    match outcome {
        SyncOutcome::NotConfigured => Err(CommandError::NotebookNotConfigured.into()),
        SyncOutcome::Failed => Err(OperationFailed { operation: "sync" }.into()),
        SyncOutcome::Synced { .. } => Ok(()),
    }
}

fn format_commit(report: &CommitReport) -> String {
    let mut lines = vec![match &report.outcome {
        CommitOutcome::Committed { message } => format!("Committed: {message}"),
        CommitOutcome::NothingToCommit => "Nothing to commit.".to_string(),
        CommitOutcome::NotConfigured => "No notebook configured.".to_string(),
        CommitOutcome::Failed => "Commit failed.".to_string(),
    }];
    if let Some(outcome) = &report.sync {
        lines.push(format_sync(outcome));
    }
    lines.join("\n")
}

fn format_sync(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Synced { pulled, pushed } => {
            let pulled = if *pulled { "pulled" } else { "nothing to pull" };
            let pushed = if *pushed { "pushed" } else { "nothing to push" };
            format!("Synced ({pulled}, {pushed}).")
        }
        SyncOutcome::NotConfigured => "No notebook configured.".to_string(),
        SyncOutcome::Failed => "Sync failed.".to_string(),
    }
}
