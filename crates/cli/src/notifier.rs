// Console notification sink: one stderr line per message.

use std::io::{self, IsTerminal, Write};

use daybook_daemon::notification::{Notifier, Severity};

use crate::output::{render_human_stderr_line, OutputFormat};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_CYAN: &str = "\x1b[36m";

pub struct ConsoleNotifier {
    format: OutputFormat,
}

impl ConsoleNotifier {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        let mut err = io::stderr().lock();
        let _ = write_notification(&mut err, self.format, severity, message, io::stderr().is_terminal());
    }
}

fn write_notification<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    severity: Severity,
    message: &str,
    is_tty: bool,
) -> io::Result<()> {
    let label = match severity {
        Severity::Info => "info",
        Severity::Error => "error",
    };
    match format {
        OutputFormat::Human => {
            let color = if severity == Severity::Error { ANSI_RED } else { ANSI_CYAN };
            writeln!(writer, "{}", render_human_stderr_line(label, message, is_tty, color))
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "notification": {
                    "severity": label,
                    "message": message,
                }
            });
            serde_json::to_writer(&mut *writer, &obj).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}
