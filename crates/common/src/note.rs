// Daily note naming and default content.

use chrono::NaiveDate;

use crate::time::{date_stamp, weekday_abbrev};

/// Extension used for daily notes unless the caller picks another one.
pub const DEFAULT_NOTE_EXTENSION: &str = "md";

/// `YYYY-MM-DD.<ext>`.
pub fn daily_note_file_name(date: NaiveDate, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    format!("{}.{extension}", date_stamp(date))
}

/// Content written to a daily note that does not exist yet.
pub fn daily_note_content(date: NaiveDate) -> String {
    format!("# {} {}\n", date_stamp(date), weekday_abbrev(date))
}
