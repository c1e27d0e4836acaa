// Git sync: process worker, porcelain status, auto-commit timer, coordinator.

pub mod coordinator;
pub mod scheduler;
pub mod status;
pub mod worker;
