// Human-facing timestamps used in commit messages, stash messages and notes.

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};

/// `YYYY-MM-DD HH:MM:SS` in the given timezone.
pub fn timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Current local timestamp, second precision.
pub fn now_timestamp() -> String {
    timestamp(&Local::now())
}

/// `YYYY-MM-DD`.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `HH:MM:SS` in the given timezone.
pub fn time_stamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%H:%M:%S").to_string()
}

/// Three-letter weekday, Sunday first (`Sun`..`Sat`).
pub fn weekday_abbrev(date: NaiveDate) -> &'static str {
    const DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    DAYS[date.weekday().num_days_from_sunday() as usize]
}

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
