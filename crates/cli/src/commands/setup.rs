// `daybook setup <PATH>`: choose the notebook directory.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use super::Session;
use crate::output;

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Notebook directory (created if missing)
    pub path: PathBuf,

    /// Display name for the notebook
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetupResult {
    pub notebook_path: PathBuf,
    pub notebook_name: String,
    pub enable_git: bool,
}

pub async fn run(session: &Session, args: SetupArgs) -> anyhow::Result<()> {
    let notebook_path = session.daybook.set_up_notebook(&args.path, args.name).await?;
    let settings = session.daybook.config().get();
    let result = SetupResult {
        notebook_path,
        notebook_name: settings.notebook_name,
        enable_git: settings.enable_git,
    };
    output::print_output(session.format, &result, format_human)?;
    Ok(())
}

fn format_human(result: &SetupResult) -> String {
    let mut lines = vec![format!(
        "Notebook \"{}\" at {}",
        result.notebook_name,
        result.notebook_path.display()
    )];
    if !result.enable_git {
        lines.push("  Git is off. Run `daybook git` to version the notebook.".to_string());
    }
    lines.join("\n")
}
