// daybook-common: shared types and utilities for the daybook workspace

pub mod note;
pub mod settings;
pub mod text;
pub mod time;
