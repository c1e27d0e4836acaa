// Consistent exit codes for the daybook CLI.
//
//   0 = success
//   1 = general error
//   2 = usage/argument error (including an invalid interval)
//   3 = notebook not configured
//   4 = git disabled
//   5 = git operation failed

use std::process;

use daybook_common::settings::IntervalError;
use daybook_daemon::runtime::CommandError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    NotConfigured = 3,
    GitDisabled = 4,
    OperationFailed = 5,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(command_err) = cause.downcast_ref::<CommandError>() {
                return match command_err {
                    CommandError::NotebookNotConfigured => Self::NotConfigured,
                    CommandError::GitDisabled => Self::GitDisabled,
                    CommandError::Interval(_) => Self::Usage,
                    _ => Self::Error,
                };
            }
            if cause.downcast_ref::<IntervalError>().is_some() {
                return Self::Usage;
            }
            if cause.downcast_ref::<OperationFailed>().is_some() {
                return Self::OperationFailed;
            }
        }
        Self::Error
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

/// A git operation ran and reported failure. Details were already surfaced
/// as notifications.
#[derive(Debug)]
pub struct OperationFailed {
    pub operation: &'static str,
}

impl std::fmt::Display for OperationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed", self.operation)
    }
}

impl std::error::Error for OperationFailed {}
