// daybook-daemon library entry point (shared by `daybookd` and the CLI).

pub mod config;
pub mod documents;
pub mod git;
pub mod notification;
pub mod runtime;
pub mod status_bar;
pub mod watcher;
