// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use daybook_daemon::runtime::CommandError;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use crate::exit_code::OperationFailed;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line =
                render_human_stderr_line("error", message, io::stderr().is_terminal(), ANSI_RED);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");

    for cause in error.chain() {
        if let Some(command_err) = cause.downcast_ref::<CommandError>() {
            return match command_err {
                CommandError::NotebookNotConfigured => (
                    "NOTEBOOK_NOT_CONFIGURED",
                    "No notebook configured. Run: daybook setup <PATH>".to_string(),
                ),
                CommandError::GitDisabled => {
                    ("GIT_DISABLED", "Git is disabled for this notebook. Run: daybook git".to_string())
                }
                CommandError::Interval(_) => ("INVALID_INTERVAL", message),
                CommandError::Config(_) => ("CONFIG_ERROR", message),
                CommandError::Document(_) | CommandError::Create { .. } => ("NOTE_ERROR", message),
            };
        }
        if cause.downcast_ref::<OperationFailed>().is_some() {
            return ("OPERATION_FAILED", message);
        }
    }

    ("ERROR", message)
}

pub(crate) fn render_human_stderr_line(
    label: &str,
    message: &str,
    is_tty: bool,
    color: &str,
) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybook_common::settings::IntervalError;

    #[test]
    fn detect_tty_returns_human() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
    }

    #[test]
    fn detect_pipe_returns_json() {
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
    }

    #[test]
    fn detect_json_flag_overrides_tty() {
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    #[test]
    fn write_output_human_format() {
        #[derive(Serialize)]
        struct Note {
            path: String,
        }
        let note = Note { path: "/nb/2024-01-01.md".into() };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &note, |n| format!("Opened {}", n.path))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Opened /nb/2024-01-01.md\n");
    }

    #[test]
    fn write_output_json_does_not_call_human_fn() {
        #[derive(Serialize)]
        struct Toggle {
            auto_sync: bool,
        }
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &Toggle { auto_sync: true }, |_| {
            unreachable!("human_fn should not be called in JSON mode")
        })
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["auto_sync"], true);
    }

    #[test]
    fn print_error_does_not_panic() {
        print_error(OutputFormat::Human, "TEST_ERR", "something broke");
        print_error(OutputFormat::Json, "TEST_ERR", "something broke");
    }

    #[test]
    fn render_human_error_uses_color_for_tty() {
        let line = render_human_stderr_line("error", "boom", true, ANSI_RED);
        assert!(line.contains(ANSI_RED));
        assert!(line.contains(ANSI_RESET));
        assert!(line.contains("boom"));
    }

    #[test]
    fn render_human_error_without_tty_is_plain() {
        assert_eq!(render_human_stderr_line("error", "careful", false, ANSI_RED), "error: careful");
    }

    #[test]
    fn actionable_error_not_configured_points_to_setup() {
        let err = anyhow::Error::new(CommandError::NotebookNotConfigured);
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "NOTEBOOK_NOT_CONFIGURED");
        assert!(message.contains("daybook setup"));
    }

    #[test]
    fn actionable_error_git_disabled_points_to_toggle() {
        let err = anyhow::Error::new(CommandError::GitDisabled);
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "GIT_DISABLED");
        assert!(message.contains("daybook git"));
    }

    #[test]
    fn actionable_error_keeps_interval_message() {
        let err = anyhow::Error::new(CommandError::Interval(IntervalError::OutOfRange(700)));
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "INVALID_INTERVAL");
        assert!(message.contains("700"));
    }

    #[test]
    fn actionable_error_operation_failed() {
        let err = anyhow::Error::new(OperationFailed { operation: "commit" });
        assert_eq!(actionable_error(&err), ("OPERATION_FAILED", "commit failed".to_string()));
    }

    #[test]
    fn actionable_error_fallback() {
        let err = anyhow::anyhow!("disk on fire");
        assert_eq!(actionable_error(&err), ("ERROR", "disk on fire".to_string()));
    }
}
