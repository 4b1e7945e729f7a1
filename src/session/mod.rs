//! Run sessions: histories, their manager and rerun targeting.

pub mod history;
pub mod manager;
pub mod rerun;
