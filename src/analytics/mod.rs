//! Structured event log and the history reports built from it.

pub mod logger;
pub mod reporter;
