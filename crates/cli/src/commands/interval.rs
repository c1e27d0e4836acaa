// `daybook interval [MINUTES]`: set the auto-commit interval.
//
// Without an argument the user is prompted until a whole number in the
// accepted range is entered.

use std::io::{self, BufRead, Write};

use anyhow::Context;
use clap::Args;
use daybook_common::settings::{validate_interval, MAX_AUTO_COMMIT_INTERVAL, MIN_AUTO_COMMIT_INTERVAL};
use serde::Serialize;

use super::Session;
use crate::output;

#[derive(Debug, Args)]
pub struct IntervalArgs {
    /// Minutes between automatic commits
    pub minutes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IntervalResult {
    pub auto_commit_interval: u32,
}

pub async fn run(session: &Session, args: IntervalArgs) -> anyhow::Result<()> {
    let minutes = match args.minutes {
        Some(raw) => validate_interval(&raw)?,
        None => {
            let current = session.daybook.config().get().auto_commit_interval;
            let stdin = io::stdin();
            prompt_interval(&mut stdin.lock(), &mut io::stderr(), current)
                .context("failed to read interval")?
                .context("no interval entered")?
        }
    };

    let auto_commit_interval = session.daybook.reset_auto_commit_interval(minutes).await?;
    output::print_output(session.format, &IntervalResult { auto_commit_interval }, |r| {
        format!("Auto commit interval: {} minutes", r.auto_commit_interval)
    })?;
    Ok(())
}

/// Ask for an interval until a valid one is entered. `None` on end of input.
pub fn prompt_interval<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    current: u32,
) -> io::Result<Option<u32>> {
    let mut line = String::new();
    loop {
        write!(
            output,
            "Auto commit interval in minutes ({MIN_AUTO_COMMIT_INTERVAL}-{MAX_AUTO_COMMIT_INTERVAL}) [{current}]: "
        )?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match validate_interval(&line) {
            Ok(minutes) => return Ok(Some(minutes)),
            Err(e) => writeln!(output, "{e}")?,
        }
    }
}
