//! Consumers of [`MetricsSnapshot`]s.
use colored::Colorize;

use super::{DataStatus, MetricsSnapshot};
use crate::analytics::logger;
use crate::metrics::FitRating;

/// Receives every snapshot the scheduler produces.
pub trait MetricsSink {
    fn publish(&mut self, snapshot: &MetricsSnapshot);
}

impl<K: MetricsSink + ?Sized> MetricsSink for Box<K> {
    fn publish(&mut self, snapshot: &MetricsSnapshot) {
        (**self).publish(snapshot);
    }
}

/// Fan a snapshot out to two sinks.
impl<A: MetricsSink, B: MetricsSink> MetricsSink for (A, B) {
    fn publish(&mut self, snapshot: &MetricsSnapshot) {
        self.0.publish(snapshot);
        self.1.publish(snapshot);
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Prints one colored status line per snapshot to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl MetricsSink for ConsoleSink {
    fn publish(&mut self, snapshot: &MetricsSnapshot) {
        println!("{}", format_line(snapshot));
    }
}

/// Render a snapshot as a single status line.
pub fn format_line(snapshot: &MetricsSnapshot) -> String {
    let time = snapshot
        .timestamp
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S")
        .to_string();

    match (snapshot.status, &snapshot.metrics) {
        (DataStatus::Ready, Some(m)) => format!(
            "{}  n={:<4} RMSE {:>6.2}  MAE {:>6.2}  ACC {:>5.1}%  R² {:>6.3}  {}",
            time.dimmed(),
            snapshot.sample_count,
            m.rmse,
            m.mae,
            m.accuracy,
            m.r2,
            snapshot
                .rating
                .map(colorize_rating)
                .unwrap_or_else(|| "invalid input".dimmed()),
        ),
        (DataStatus::SourceError, _) => format!(
            "{}  {} {}",
            time.dimmed(),
            "source error:".red().bold(),
            snapshot.error.as_deref().unwrap_or("unknown"),
        ),
        _ => format!(
            "{}  {}",
            time.dimmed(),
            "no observation data, metrics unavailable".yellow(),
        ),
    }
}

/// Colorize a fit-rating badge.
pub fn colorize_rating(rating: FitRating) -> colored::ColoredString {
    let label = rating.to_string();
    match rating {
        FitRating::Excellent => label.green().bold(),
        FitRating::Good => label.green(),
        FitRating::Fair => label.yellow(),
        FitRating::Poor => label.red(),
    }
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

/// Appends rated snapshots to the event log for `traffic-eval history`.
/// Unrated zero-results are never logged.
#[derive(Debug, Default)]
pub struct EventLogSink;

impl MetricsSink for EventLogSink {
    fn publish(&mut self, snapshot: &MetricsSnapshot) {
        if let (Some(metrics), Some(_)) = (&snapshot.metrics, snapshot.rating) {
            logger::log_evaluation(
                &snapshot.source,
                snapshot.sample_count,
                snapshot.tolerance_minutes,
                metrics,
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Collecting sink
// ---------------------------------------------------------------------------

/// Keeps every snapshot in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub snapshots: Vec<MetricsSnapshot>,
}

impl MetricsSink for VecSink {
    fn publish(&mut self, snapshot: &MetricsSnapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricResult;
    use chrono::Utc;

    fn snap(status: DataStatus, metrics: Option<MetricResult>) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            source: "test".to_string(),
            sample_count: 4,
            tolerance_minutes: 5.0,
            status,
            error: (status == DataStatus::SourceError).then(|| "disk on fire".to_string()),
            rating: metrics.as_ref().map(MetricResult::rating),
            metrics,
        }
    }

    #[test]
    fn format_line_shows_metrics_when_ready() {
        colored::control::set_override(false);
        let line = format_line(&snap(
            DataStatus::Ready,
            Some(MetricResult {
                rmse: 1.7,
                mae: 1.63,
                accuracy: 100.0,
                r2: 0.93,
            }),
        ));
        assert!(line.contains("RMSE   1.70"));
        assert!(line.contains("ACC 100.0%"));
        assert!(line.contains("excellent"));
    }

    #[test]
    fn format_line_flags_missing_data() {
        colored::control::set_override(false);
        assert!(format_line(&snap(DataStatus::NoData, None)).contains("no observation data"));
        assert!(format_line(&snap(DataStatus::SourceError, None)).contains("disk on fire"));
    }

    #[test]
    fn format_line_marks_unrated_zero_result() {
        colored::control::set_override(false);
        let mut unrated = snap(DataStatus::Ready, Some(MetricResult::zero()));
        unrated.rating = None;
        let line = format_line(&unrated);
        assert!(line.contains("invalid input"));
        assert!(!line.contains("poor"));
    }

    #[test]
    fn tuple_sink_fans_out() {
        let mut sink = (VecSink::default(), VecSink::default());
        sink.publish(&snap(DataStatus::NoData, None));
        assert_eq!(sink.0.snapshots.len(), 1);
        assert_eq!(sink.1.snapshots.len(), 1);
    }
}
