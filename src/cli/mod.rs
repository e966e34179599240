//! CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `traffic-eval evaluate`: one-shot accuracy report
//! - `traffic-eval predict`: query the prediction service
//! - `traffic-eval watch`: periodic re-evaluation
//! - `traffic-eval history --days N`: daily evaluation trend
//! - `traffic-eval health`: check predictor, config, observation file, log
//! - `traffic-eval config show|init|set|reset`: configuration management

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;

use crate::analytics::{logger, reporter};
use crate::config::{self, TrafficEvalConfig};
use crate::metrics::{Evaluator, MetricResult, try_compute_metrics};
use crate::observations::{JsonlObservationSource, WindowQuery};
use crate::predictor::{PredictionClient, PredictionRequest, PredictionResponse};
use crate::scheduler::sinks::colorize_rating;
use crate::scheduler::{
    self, ConsoleSink, DataStatus, EventLogSink, MetricsSink, MetricsSnapshot, ScheduleOptions,
    Scheduler,
};
use crate::utils::diag;
use crate::utils::paths::expand_tilde;

/// Output format for report commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// traffic-eval evaluate
// ---------------------------------------------------------------------------

/// Where `evaluate` takes its pairs from.
#[derive(Debug, Clone)]
pub enum EvaluateInput {
    /// Two aligned lists given on the command line.
    Inline { actual: Vec<f64>, predicted: Vec<f64> },
    /// An observation file (`None` = configured path).
    File {
        path: Option<String>,
        query: WindowQuery,
    },
}

/// Evaluate observations once and print the report.
pub fn run_evaluate(
    config: &TrafficEvalConfig,
    input: EvaluateInput,
    tolerance: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let evaluator = Evaluator::new(tolerance.unwrap_or(config.evaluation.tolerance_minutes));

    let snap = match input {
        EvaluateInput::Inline { actual, predicted } => inline_snapshot(&evaluator, &actual, &predicted),
        EvaluateInput::File { path, query } => {
            let path = path.unwrap_or_else(|| config.observations.path.clone());
            let source = JsonlObservationSource::new(expand_tilde(&path));
            scheduler::snapshot(&source, &evaluator, &query)
        }
    };

    if snap.status == DataStatus::SourceError {
        anyhow::bail!(
            "{}",
            snap.error.as_deref().unwrap_or("observation source failed")
        );
    }

    // Degenerate inline input carries the zero-result but no rating.
    if snap.rating.is_some() {
        EventLogSink.publish(&snap);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snap)?),
        OutputFormat::Csv => print_snapshot_csv(&snap),
        OutputFormat::Table => print_snapshot_table(&snap),
    }

    Ok(())
}

/// Evaluate two command-line lists with the evaluator's own edge policy:
/// mismatched lengths and degenerate values give an unrated zero-result,
/// which is not logged.
fn inline_snapshot(evaluator: &Evaluator, actual: &[f64], predicted: &[f64]) -> MetricsSnapshot {
    let mut snap = MetricsSnapshot {
        timestamp: Utc::now(),
        source: "command line".to_string(),
        sample_count: actual.len().min(predicted.len()),
        tolerance_minutes: evaluator.tolerance_minutes(),
        status: DataStatus::NoData,
        error: None,
        metrics: None,
        rating: None,
    };

    if actual.is_empty() && predicted.is_empty() {
        return snap;
    }

    if actual.len() != predicted.len() {
        diag::warn(&format!(
            "actual has {} values but predicted has {}; reporting the zero-result",
            actual.len(),
            predicted.len()
        ));
        snap.status = DataStatus::Ready;
        snap.sample_count = 0;
        snap.metrics = Some(MetricResult::zero());
        return snap;
    }

    snap.status = DataStatus::Ready;
    match try_compute_metrics(actual, predicted, evaluator.tolerance_minutes()) {
        Some(metrics) => {
            snap.rating = Some(metrics.rating());
            snap.metrics = Some(metrics);
        }
        None => {
            diag::warn("input contains non-finite or overflowing values; reporting the zero-result");
            snap.metrics = Some(MetricResult::zero());
        }
    }
    snap
}

fn print_snapshot_table(snap: &MetricsSnapshot) {
    println!("{}", "Prediction Accuracy Report".bold().cyan());
    println!("{}", "=".repeat(50));
    println!("  {} {}", "Source:    ".bold(), snap.source);
    println!("  {} {}", "Samples:   ".bold(), snap.sample_count);
    println!("  {} ±{:.1} min", "Tolerance: ".bold(), snap.tolerance_minutes);
    println!();

    let Some(m) = snap.metrics.filter(|_| snap.status == DataStatus::Ready) else {
        println!(
            "{}",
            "No observation data. Metrics are unavailable until real actual/predicted pairs are recorded."
                .yellow()
        );
        return;
    };

    println!("  {} {:.2}", "RMSE:      ".bold(), m.rmse);
    println!("  {} {:.2}", "MAE:       ".bold(), m.mae);
    println!("  {} {:.1}%", "Accuracy:  ".bold(), m.accuracy);
    println!("  {} {:.3}", "R²:        ".bold(), m.r2);
    match snap.rating {
        Some(rating) => println!("  {} {}", "Fit:       ".bold(), colorize_rating(rating)),
        None => println!("  {} {}", "Fit:       ".bold(), "n/a (invalid input)".dimmed()),
    }
}

fn print_snapshot_csv(snap: &MetricsSnapshot) {
    println!("timestamp,source,status,samples,tolerance_minutes,rmse,mae,accuracy,r2");
    let metrics = snap
        .metrics
        .map(|m| format!("{:.2},{:.2},{:.1},{:.3}", m.rmse, m.mae, m.accuracy, m.r2))
        .unwrap_or_else(|| ",,,".to_string());
    println!(
        "{},{},{},{},{:.1},{}",
        snap.timestamp.to_rfc3339(),
        csv_field(&snap.source),
        snap.status,
        snap.sample_count,
        snap.tolerance_minutes,
        metrics,
    );
}

// ---------------------------------------------------------------------------
// traffic-eval predict
// ---------------------------------------------------------------------------

/// Request a prediction and print it.
pub fn run_predict(config: &TrafficEvalConfig, request: &PredictionRequest, format: OutputFormat) -> Result<()> {
    let client = PredictionClient::from_config(&config.predictor);
    let prediction = client.predict(request)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prediction)?),
        OutputFormat::Csv => {
            println!("area_name,road_name,weather,date,traffic_volume,travel_time_index");
            println!(
                "{},{},{},{},{:.2},{:.2}",
                csv_field(&prediction.area_name),
                csv_field(&prediction.road_name),
                prediction.weather,
                prediction.date,
                prediction.traffic_volume,
                prediction.travel_time_index,
            );
        }
        OutputFormat::Table => print_prediction_table(&prediction),
    }

    Ok(())
}

fn print_prediction_table(p: &PredictionResponse) {
    println!("{}", "Traffic Prediction".bold().cyan());
    println!("{}", "=".repeat(50));
    println!("  {} {}", "Area:              ".bold(), p.area_name);
    println!("  {} {}", "Road:              ".bold(), p.road_name);
    println!("  {} {}", "Weather:           ".bold(), p.weather);
    println!("  {} {}", "Date:              ".bold(), p.date);
    println!();
    println!("  {} {:.2}", "Traffic volume:    ".bold(), p.traffic_volume);
    println!(
        "  {} {:.2} {}",
        "Travel time index: ".bold(),
        p.travel_time_index,
        congestion_label(p.travel_time_index)
    );
}

/// Badge for a travel time index (1.0 = free flow).
fn congestion_label(index: f64) -> colored::ColoredString {
    if index < 1.2 {
        "free flow".green()
    } else if index < 1.5 {
        "moderate".yellow()
    } else {
        "congested".red()
    }
}

// ---------------------------------------------------------------------------
// traffic-eval watch
// ---------------------------------------------------------------------------

/// Re-evaluate the observation file on a fixed interval.
pub fn run_watch(
    config: &TrafficEvalConfig,
    interval_secs: Option<u64>,
    window: Option<usize>,
    ticks: Option<u64>,
) -> Result<()> {
    let interval = Duration::from_secs(interval_secs.unwrap_or(config.scheduler.interval_secs).max(1));
    let source = JsonlObservationSource::new(expand_tilde(&config.observations.path));

    println!(
        "{} {} every {}s (Ctrl+C to stop)",
        "Watching".bold().cyan(),
        source.path().display(),
        interval.as_secs()
    );

    let options = ScheduleOptions {
        interval,
        window: WindowQuery::latest(window.unwrap_or(config.evaluation.window_size)),
    };
    let evaluator = Evaluator::new(config.evaluation.tolerance_minutes);
    let mut scheduler = Scheduler::new(source, (ConsoleSink, EventLogSink), evaluator, options);

    let stop = AtomicBool::new(false);
    scheduler.run(&stop, ticks);
    Ok(())
}

// ---------------------------------------------------------------------------
// traffic-eval history
// ---------------------------------------------------------------------------

/// Show the daily trend of logged evaluations.
pub fn run_history(days: u32, format: OutputFormat) -> Result<()> {
    let trends = reporter::compute_trends(days);

    if trends.is_empty() {
        println!("{}", format!("No evaluations logged in the last {days} days.").yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&trends)?),
        OutputFormat::Csv => {
            println!("date,evaluations,avg_rmse,avg_mae,avg_accuracy,avg_r2");
            for t in &trends {
                println!(
                    "{},{},{:.2},{:.2},{:.1},{:.3}",
                    t.date, t.evaluations, t.avg_rmse, t.avg_mae, t.avg_accuracy, t.avg_r2
                );
            }
        }
        OutputFormat::Table => print_history_table(&trends, days),
    }

    Ok(())
}

fn print_history_table(trends: &[reporter::TrendEntry], days: u32) {
    println!("{}", format!("Accuracy History, Last {days} Days").bold().cyan());
    println!("{}", "=".repeat(60));
    println!(
        "  {:<12} {:>6} {:>8} {:>8} {:>9} {:>8}",
        "Date", "Runs", "RMSE", "MAE", "Accuracy", "R²"
    );
    println!("  {}", "-".repeat(58));

    for (i, t) in trends.iter().enumerate() {
        let line = format!(
            "  {:<12} {:>6} {:>8.2} {:>8.2} {:>8.1}% {:>8.3}",
            t.date, t.evaluations, t.avg_rmse, t.avg_mae, t.avg_accuracy, t.avg_r2
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
}

// ---------------------------------------------------------------------------
// traffic-eval health
// ---------------------------------------------------------------------------

/// Check the prediction service, config file, observation file and event log.
pub fn run_health(config: &TrafficEvalConfig) -> Result<()> {
    println!("{}", "traffic-eval Health Check".bold().cyan());
    println!("{}", "=".repeat(50));

    let client = PredictionClient::from_config(&config.predictor);
    let predictor_ok = client.is_healthy();
    print_health_item(
        "Prediction service",
        predictor_ok,
        &if predictor_ok {
            format!("reachable at {}", client.base_url())
        } else {
            format!("not reachable at {}", client.base_url())
        },
    );

    let config_exists = config::global_config_file().is_some_and(|p| p.exists());
    print_health_item(
        "Config file",
        config_exists,
        if config_exists {
            "~/.traffic-eval/config.toml found"
        } else {
            "using defaults (run `traffic-eval config init`)"
        },
    );

    let source = JsonlObservationSource::new(expand_tilde(&config.observations.path));
    let observations = source.read_all();
    let (obs_ok, obs_detail) = match &observations {
        Ok(all) if all.is_empty() => (false, format!("no observations in {}", source.path().display())),
        Ok(all) => (true, format!("{} observations", all.len())),
        Err(e) => (false, format!("{e:#}")),
    };
    print_health_item("Observations", obs_ok, &obs_detail);

    let log_path = logger::event_log_path();
    let log_exists = log_path.as_ref().is_some_and(|p| p.exists());
    print_health_item(
        "Event log",
        log_exists,
        &match (&log_path, log_exists) {
            (None, _) => "disabled".to_string(),
            (Some(_), true) => format!("{} entries", logger::read_all_entries().len()),
            (Some(_), false) => "no log file yet".to_string(),
        },
    );

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// traffic-eval config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective traffic-eval Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.traffic-eval/config.toml", global_exists);
    print_source(".traffic-eval.toml", project_exists);
    println!("  {} {}", "·".dimmed(), "TRAFFIC_EVAL_* environment variables".dimmed());

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.traffic-eval/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Quote a CSV field if it contains a delimiter, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
