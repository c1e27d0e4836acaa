// Notebook settings: key names, typed values, and interval validation.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted auto-commit interval, in minutes.
pub const MIN_AUTO_COMMIT_INTERVAL: u32 = 2;
/// Largest accepted auto-commit interval, in minutes.
pub const MAX_AUTO_COMMIT_INTERVAL: u32 = 600;

const DEFAULT_NOTEBOOK_NAME: &str = "notebook";
const DEFAULT_COMMIT_MESSAGE: &str = "Auto committed by daybook";
const DEFAULT_AUTO_COMMIT_INTERVAL: u32 = 10;

// ── Keys ────────────────────────────────────────────────────────────

/// Every configuration key the notebook understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    NotebookPath,
    NotebookName,
    CommitMessage,
    EnableGit,
    AutoCommit,
    AutoCommitInterval,
    AutoSync,
}

impl SettingKey {
    pub const ALL: [SettingKey; 7] = [
        SettingKey::NotebookPath,
        SettingKey::NotebookName,
        SettingKey::CommitMessage,
        SettingKey::EnableGit,
        SettingKey::AutoCommit,
        SettingKey::AutoCommitInterval,
        SettingKey::AutoSync,
    ];

    /// The key as it appears in the config file.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotebookPath => "notebookPath",
            Self::NotebookName => "notebookName",
            Self::CommitMessage => "commitMessage",
            Self::EnableGit => "enableGit",
            Self::AutoCommit => "autoCommit",
            Self::AutoCommitInterval => "autoCommitInterval",
            Self::AutoSync => "autoSync",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown setting key: {0}")]
pub struct UnknownSettingKey(pub String);

impl FromStr for SettingKey {
    type Err = UnknownSettingKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownSettingKey(s.to_string()))
    }
}

// ── Values ──────────────────────────────────────────────────────────

/// A typed value for exactly one [`SettingKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    NotebookPath(Option<PathBuf>),
    NotebookName(String),
    CommitMessage(String),
    EnableGit(bool),
    AutoCommit(bool),
    AutoCommitInterval(u32),
    AutoSync(bool),
}

impl SettingValue {
    pub fn key(&self) -> SettingKey {
        match self {
            Self::NotebookPath(_) => SettingKey::NotebookPath,
            Self::NotebookName(_) => SettingKey::NotebookName,
            Self::CommitMessage(_) => SettingKey::CommitMessage,
            Self::EnableGit(_) => SettingKey::EnableGit,
            Self::AutoCommit(_) => SettingKey::AutoCommit,
            Self::AutoCommitInterval(_) => SettingKey::AutoCommitInterval,
            Self::AutoSync(_) => SettingKey::AutoSync,
        }
    }
}

// ── Settings record ─────────────────────────────────────────────────

/// The full set of notebook settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Absolute path of the notebook directory (and of the git repository).
    pub notebook_path: Option<PathBuf>,
    /// Display name of the notebook.
    pub notebook_name: String,
    /// Commit message prefix; a timestamp is appended per commit.
    pub commit_message: String,
    pub enable_git: bool,
    pub auto_commit: bool,
    /// Minutes between automatic commits.
    pub auto_commit_interval: u32,
    /// Sync with the remote after every commit.
    pub auto_sync: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notebook_path: None,
            notebook_name: DEFAULT_NOTEBOOK_NAME.into(),
            commit_message: DEFAULT_COMMIT_MESSAGE.into(),
            enable_git: false,
            auto_commit: false,
            auto_commit_interval: DEFAULT_AUTO_COMMIT_INTERVAL,
            auto_sync: false,
        }
    }
}

impl Settings {
    /// Set one value. Returns `true` when the stored value changed.
    pub fn apply(&mut self, value: SettingValue) -> bool {
        fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
            if *slot == value {
                return false;
            }
            *slot = value;
            true
        }

        match value {
            SettingValue::NotebookPath(v) => replace(&mut self.notebook_path, v),
            SettingValue::NotebookName(v) => replace(&mut self.notebook_name, v),
            SettingValue::CommitMessage(v) => replace(&mut self.commit_message, v),
            SettingValue::EnableGit(v) => replace(&mut self.enable_git, v),
            SettingValue::AutoCommit(v) => replace(&mut self.auto_commit, v),
            SettingValue::AutoCommitInterval(v) => replace(&mut self.auto_commit_interval, v),
            SettingValue::AutoSync(v) => replace(&mut self.auto_sync, v),
        }
    }

    /// Current value for `key`.
    pub fn value(&self, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::NotebookPath => SettingValue::NotebookPath(self.notebook_path.clone()),
            SettingKey::NotebookName => SettingValue::NotebookName(self.notebook_name.clone()),
            SettingKey::CommitMessage => SettingValue::CommitMessage(self.commit_message.clone()),
            SettingKey::EnableGit => SettingValue::EnableGit(self.enable_git),
            SettingKey::AutoCommit => SettingValue::AutoCommit(self.auto_commit),
            SettingKey::AutoCommitInterval => {
                SettingValue::AutoCommitInterval(self.auto_commit_interval)
            }
            SettingKey::AutoSync => SettingValue::AutoSync(self.auto_sync),
        }
    }

    /// Keys whose values differ between `self` and `other`.
    pub fn diff(&self, other: &Settings) -> Vec<SettingKey> {
        SettingKey::ALL.into_iter().filter(|key| self.value(*key) != other.value(*key)).collect()
    }

    /// The configured notebook path, ignoring an empty string.
    pub fn notebook_path(&self) -> Option<&PathBuf> {
        self.notebook_path.as_ref().filter(|p| !p.as_os_str().is_empty())
    }

    /// Auto-commit period, or `None` when the interval is outside the accepted range.
    pub fn auto_commit_period(&self) -> Option<Duration> {
        interval_in_range(self.auto_commit_interval)
            .then(|| Duration::from_secs(u64::from(self.auto_commit_interval) * 60))
    }
}

// ── Interval validation ─────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("`{0}` is not a whole number of minutes")]
    NotANumber(String),

    #[error(
        "interval must be between {MIN_AUTO_COMMIT_INTERVAL} and {MAX_AUTO_COMMIT_INTERVAL} minutes, got {0}"
    )]
    OutOfRange(i64),
}

fn interval_in_range(minutes: u32) -> bool {
    (MIN_AUTO_COMMIT_INTERVAL..=MAX_AUTO_COMMIT_INTERVAL).contains(&minutes)
}

/// Validate an interval that is already a number.
pub fn check_interval(minutes: u32) -> Result<u32, IntervalError> {
    if interval_in_range(minutes) {
        Ok(minutes)
    } else {
        Err(IntervalError::OutOfRange(i64::from(minutes)))
    }
}

/// Parse and validate a user-entered auto-commit interval in minutes.
pub fn validate_interval(input: &str) -> Result<u32, IntervalError> {
    let trimmed = input.trim();
    let minutes: i64 =
        trimmed.parse().map_err(|_| IntervalError::NotANumber(trimmed.to_string()))?;

    match u32::try_from(minutes) {
        Ok(m) if interval_in_range(m) => Ok(m),
        _ => Err(IntervalError::OutOfRange(minutes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn key_names_round_trip() {
        for key in SettingKey::ALL {
            assert_eq!(key.as_str().parse::<SettingKey>(), Ok(key));
        }
        assert_eq!(
            "notebookDirectory".parse::<SettingKey>(),
            Err(UnknownSettingKey("notebookDirectory".into()))
        );
    }

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert!(s.notebook_path().is_none());
        assert_eq!(s.notebook_name, "notebook");
        assert_eq!(s.commit_message, "Auto committed by daybook");
        assert!(!s.enable_git);
        assert!(!s.auto_commit);
        assert_eq!(s.auto_commit_interval, 10);
        assert!(!s.auto_sync);
    }

    #[test]
    fn parses_camel_case_toml() {
        let toml_str = r#"
notebookPath = "/tmp/nb"
commitMessage = "wip"
enableGit = true
autoCommit = true
autoCommitInterval = 5
autoSync = true
"#;
        let s: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(s.notebook_path, Some(PathBuf::from("/tmp/nb")));
        assert_eq!(s.commit_message, "wip");
        assert_eq!(s.notebook_name, "notebook"); // default
        assert!(s.enable_git && s.auto_commit && s.auto_sync);
        assert_eq!(s.auto_commit_interval, 5);
    }

    #[test]
    fn apply_reports_changes_only() {
        let mut s = Settings::default();
        assert!(s.apply(SettingValue::AutoCommit(true)));
        assert!(!s.apply(SettingValue::AutoCommit(true)));
        assert!(s.apply(SettingValue::AutoCommitInterval(5)));
        assert_eq!(s.auto_commit_interval, 5);
    }

    #[test]
    fn diff_lists_changed_keys() {
        let a = Settings::default();
        let mut b = a.clone();
        b.enable_git = true;
        b.notebook_path = Some("/tmp/nb".into());
        assert_eq!(a.diff(&b), vec![SettingKey::NotebookPath, SettingKey::EnableGit]);
        assert!(a.diff(&a.clone()).is_empty());
    }

    #[test]
    fn empty_notebook_path_counts_as_unset() {
        let s = Settings { notebook_path: Some(PathBuf::new()), ..Settings::default() };
        assert!(s.notebook_path().is_none());
    }

    #[test]
    fn auto_commit_period_requires_valid_interval() {
        let mut s = Settings::default();
        s.auto_commit_interval = 2;
        assert_eq!(s.auto_commit_period(), Some(Duration::from_secs(120)));
        s.auto_commit_interval = 0;
        assert_eq!(s.auto_commit_period(), None);
        s.auto_commit_interval = 601;
        assert_eq!(s.auto_commit_period(), None);
    }

    #[test]
    fn validate_interval_edges() {
        assert_eq!(validate_interval("2"), Ok(2));
        assert_eq!(validate_interval(" 600\n"), Ok(600));
        assert_eq!(validate_interval("1"), Err(IntervalError::OutOfRange(1)));
        assert_eq!(validate_interval("601"), Err(IntervalError::OutOfRange(601)));
        assert_eq!(validate_interval("-5"), Err(IntervalError::OutOfRange(-5)));
        assert_eq!(validate_interval("ten"), Err(IntervalError::NotANumber("ten".into())));
        assert_eq!(validate_interval(""), Err(IntervalError::NotANumber(String::new())));
    }

    #[test]
    fn check_interval_matches_parsed_validation() {
        assert_eq!(check_interval(10), Ok(10));
        assert_eq!(check_interval(0), Err(IntervalError::OutOfRange(0)));
        assert_eq!(check_interval(601), Err(IntervalError::OutOfRange(601)));
    }

    proptest! {
        #[test]
        fn validate_interval_accepts_exactly_the_range(n in -1000i64..2000) {
            let accepted = validate_interval(&n.to_string()).is_ok();
            prop_assert_eq!(accepted, (2..=600).contains(&n));
        }
    }
}
