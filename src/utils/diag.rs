//! Stderr diagnostics with a process-wide minimum level.
//!
//! Structured records go to the JSONL event log (see `analytics::logger`);
//! this is only for human-facing `[traffic-eval] ...` lines.

use std::sync::OnceLock;

use colored::Colorize;

use crate::config::schema::LogLevel;

static MIN_LEVEL: OnceLock<LogLevel> = OnceLock::new();

/// Set the minimum level. Only the first call takes effect.
pub fn init(level: LogLevel) {
    let _ = MIN_LEVEL.set(level);
}

fn enabled(level: LogLevel) -> bool {
    level >= MIN_LEVEL.get().copied().unwrap_or_default()
}

pub fn emit(level: LogLevel, message: &str) {
    if !enabled(level) {
        return;
    }
    let tag = match level {
        LogLevel::Debug => "debug".dimmed(),
        LogLevel::Info => "info".normal(),
        LogLevel::Warn => "warn".yellow(),
        LogLevel::Error => "error".red().bold(),
    };
    eprintln!("[traffic-eval] {tag}: {message}");
}

pub fn debug(message: &str) {
    emit(LogLevel::Debug, message);
}

pub fn info(message: &str) {
    emit(LogLevel::Info, message);
}

pub fn warn(message: &str) {
    emit(LogLevel::Warn, message);
}

pub fn error(message: &str) {
    emit(LogLevel::Error, message);
}
