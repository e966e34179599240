/// Configuration schema and defaults for traffic-eval.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[evaluation]`, `[observations]`, `[predictor]`, `[scheduler]`, `[web]`
/// and `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use serde::{Deserialize, Serialize};

use crate::metrics::DEFAULT_TOLERANCE_MINUTES;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level traffic-eval configuration.
///
/// Maps directly to `~/.traffic-eval/config.toml` and `.traffic-eval.toml`.
/// Missing sections and fields fall back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficEvalConfig {
    pub evaluation: EvaluationConfig,
    pub observations: ObservationsConfig,
    pub predictor: PredictorConfig,
    pub scheduler: SchedulerConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [evaluation]
// ---------------------------------------------------------------------------

/// Accuracy evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Absolute error band (minutes) counted as an accurate prediction.
    pub tolerance_minutes: f64,
    /// Number of most recent observations to evaluate. `0` means all.
    pub window_size: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
            window_size: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// [observations]
// ---------------------------------------------------------------------------

/// Where paired actual/predicted observations are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationsConfig {
    /// JSONL observation file. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for ObservationsConfig {
    fn default() -> Self {
        Self {
            path: "~/.traffic-eval/observations.jsonl".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [predictor]
// ---------------------------------------------------------------------------

/// External traffic-prediction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Base URL of the prediction service (`POST {url}/predict`).
    pub url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [scheduler]
// ---------------------------------------------------------------------------

/// Periodic re-evaluation settings for `traffic-eval watch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between evaluations.
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// JSON API server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `traffic-eval serve`.
    pub addr: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Diagnostic verbosity on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether evaluation and prediction events are appended to the log.
    pub enabled: bool,
    /// Path to the event log file. `~` is expanded to the home directory.
    pub path: String,
    /// Minimum level for stderr diagnostics.
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.traffic-eval/events.jsonl".to_string(),
            level: LogLevel::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML template
// ---------------------------------------------------------------------------

impl TrafficEvalConfig {
    /// Annotated default config written by `traffic-eval config init`.
    pub fn default_toml() -> String {
        r#"# traffic-eval configuration
#
# Layers (later wins): built-in defaults, ~/.traffic-eval/config.toml,
# ./.traffic-eval.toml, TRAFFIC_EVAL_* environment variables.

[evaluation]
# Absolute error (minutes) within which a prediction counts as accurate
tolerance_minutes = 5.0
# Most recent observations to evaluate (0 = all)
window_size = 50

[observations]
# JSONL file of {"timestamp", "actual", "predicted"} records
path = "~/.traffic-eval/observations.jsonl"

[predictor]
# Base URL of the traffic-prediction service
url = "http://localhost:8000"
timeout_ms = 10000

[scheduler]
# Seconds between evaluations in `traffic-eval watch`
interval_secs = 30

[web]
addr = "127.0.0.1:9747"

[logging]
enabled = true
path = "~/.traffic-eval/events.jsonl"
# debug | info | warn | error
level = "info"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
