use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;
use crate::metrics::MetricResult;
use crate::predictor::{PredictionRequest, PredictionResponse};
use crate::utils::paths::expand_tilde;
use crate::utils::time::days_ago;

// ---------------------------------------------------------------------------
// Event log entries (JSONL)
// ---------------------------------------------------------------------------

/// A single line in the structured event log (`~/.traffic-eval/events.jsonl`).
///
/// Evaluations feed `traffic-eval history`; predictions are kept for
/// troubleshooting the external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEntry {
    Evaluation(EvaluationLogEntry),
    Prediction(PredictionLogEntry),
}

/// One completed evaluation over real observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationLogEntry {
    pub timestamp: String,
    /// Observation source name (file path or `in-memory`).
    pub source: String,
    pub sample_count: usize,
    pub tolerance_minutes: f64,
    pub rmse: f64,
    pub mae: f64,
    pub accuracy: f64,
    pub r2: f64,
}

/// One call to the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionLogEntry {
    pub timestamp: String,
    pub area_name: String,
    pub road_name: String,
    pub weather: String,
    pub date: String,
    pub success: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub traffic_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub travel_time_index: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Sink configuration
// ---------------------------------------------------------------------------

static LOG_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Configure the event log from the resolved config. Only the first call
/// takes effect. Until this is called, logging is disabled.
pub fn init(config: &LoggingConfig) {
    let path = config.enabled.then(|| expand_tilde(&config.path));
    let _ = LOG_PATH.set(path);
}

/// Path to the event log, if logging is enabled.
pub fn event_log_path() -> Option<PathBuf> {
    LOG_PATH.get().cloned().flatten()
}

// ---------------------------------------------------------------------------
// Logging functions
// ---------------------------------------------------------------------------

/// Log an evaluation result. Best-effort: failures are ignored.
pub fn log_evaluation(source: &str, sample_count: usize, tolerance_minutes: f64, metrics: &MetricResult) {
    let entry = LogEntry::Evaluation(EvaluationLogEntry {
        timestamp: Utc::now().to_rfc3339(),
        source: source.to_string(),
        sample_count,
        tolerance_minutes,
        rmse: metrics.rmse,
        mae: metrics.mae,
        accuracy: metrics.accuracy,
        r2: metrics.r2,
    });

    if let Some(path) = event_log_path() {
        let _ = append_entry(&path, &entry);
    }
}

/// Log a prediction call. Best-effort: failures are ignored.
pub fn log_prediction(
    request: &PredictionRequest,
    response: Option<&PredictionResponse>,
    latency_ms: u64,
    error: Option<&str>,
) {
    let entry = LogEntry::Prediction(PredictionLogEntry {
        timestamp: Utc::now().to_rfc3339(),
        area_name: request.area_name.clone(),
        road_name: request.road_name.clone(),
        weather: request.weather.to_string(),
        date: request.date.clone(),
        success: response.is_some(),
        latency_ms,
        traffic_volume: response.map(|r| r.traffic_volume),
        travel_time_index: response.map(|r| r.travel_time_index),
        error: error.map(str::to_string),
    });

    if let Some(path) = event_log_path() {
        let _ = append_entry(&path, &entry);
    }
}

// ---------------------------------------------------------------------------
// Reading log entries
// ---------------------------------------------------------------------------

/// Read all entries from the configured event log.
///
/// Silently skips malformed lines. Returns an empty vec if logging is
/// disabled or the file does not exist.
pub fn read_all_entries() -> Vec<LogEntry> {
    match event_log_path() {
        Some(path) => read_entries_from(&path),
        None => Vec::new(),
    }
}

/// Read all entries from a specific log file. Lines that are not valid
/// JSON (or not UTF-8) are skipped.
pub fn read_entries_from(path: &std::path::Path) -> Vec<LogEntry> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .split(b'\n')
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_slice::<LogEntry>(&line).ok())
        .collect()
}

/// Evaluation entries from the last N days (all when `days` is `None`).
pub fn evaluations_since_days(entries: Vec<LogEntry>, days: Option<u32>) -> Vec<EvaluationLogEntry> {
    let cutoff = days.and_then(days_ago).map(|c| c.to_rfc3339());

    entries
        .into_iter()
        .filter_map(|entry| match entry {
            LogEntry::Evaluation(e) => Some(e),
            LogEntry::Prediction(_) => None,
        })
        .filter(|e| cutoff.as_ref().is_none_or(|c| e.timestamp >= *c))
        .collect()
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Append one entry as a JSON line, creating parent directories as needed.
pub fn append_entry(path: &std::path::Path, entry: &LogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
