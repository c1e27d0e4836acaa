// `daybook today` and `daybook timestamp`.

use std::path::PathBuf;

use serde::Serialize;

use super::Session;
use crate::output;

#[derive(Debug, Serialize)]
pub struct TodayResult {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct TimestampResult {
    pub path: PathBuf,
    pub timestamp: String,
}

pub fn today(session: &Session) -> anyhow::Result<()> {
    let path = session.daybook.open_today_note()?;
    output::print_output(session.format, &TodayResult { path }, |r| r.path.display().to_string())?;
    Ok(())
}

pub fn timestamp(session: &Session) -> anyhow::Result<()> {
    let timestamp = session.daybook.insert_timestamp()?;
    let path = session.daybook.open_today_note()?;
    output::print_output(session.format, &TimestampResult { path, timestamp }, |r| {
        format!("Inserted {} into {}", r.timestamp, r.path.display())
    })?;
    Ok(())
}
