// Notification sink: short operator-facing messages, fire-and-forget.

#[cfg(any(test, feature = "test-support"))]
use std::sync::Mutex;

use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Surfaces outcome messages to a human. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);

    fn info(&self, message: &str) {
        self.notify(Severity::Info, message);
    }

    fn error(&self, message: &str) {
        self.notify(Severity::Error, message);
    }
}

/// Routes notifications into the tracing pipeline (daemon default).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => info!(target: "daybook::notify", "{message}"),
            Severity::Error => error!(target: "daybook::notify", "{message}"),
        }
    }
}

/// Keeps every notification in memory, in order.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(Severity, String)>>,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.of(Severity::Error)
    }

    pub fn infos(&self) -> Vec<String> {
        self.of(Severity::Info)
    }

    /// True when any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lock().iter().any(|(_, m)| m.contains(needle))
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn of(&self, severity: Severity) -> Vec<String> {
        self.lock().iter().filter(|(s, _)| *s == severity).map(|(_, m)| m.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Severity, String)>> {
        self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.lock().push((severity, message.to_string()));
    }
}
