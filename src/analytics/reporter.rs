//! Evaluation history reporter.
//!
//! Reads logged evaluations and aggregates them per day so the CLI and the
//! JSON API can chart how accuracy evolves over time.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analytics::logger::{self, EvaluationLogEntry};
use crate::metrics::round_to;

/// Averages for one calendar day of evaluations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendEntry {
    /// `YYYY-MM-DD` (UTC).
    pub date: String,
    pub evaluations: usize,
    pub avg_rmse: f64,
    pub avg_mae: f64,
    pub avg_accuracy: f64,
    pub avg_r2: f64,
}

/// Compute daily trends from the configured event log for the last `days`
/// days.
pub fn compute_trends(days: u32) -> Vec<TrendEntry> {
    let evaluations = logger::evaluations_since_days(logger::read_all_entries(), Some(days));
    build_trends(&evaluations)
}

/// Group evaluations by UTC date, oldest first.
pub fn build_trends(evaluations: &[EvaluationLogEntry]) -> Vec<TrendEntry> {
    let mut by_day: BTreeMap<String, Vec<&EvaluationLogEntry>> = BTreeMap::new();
    for e in evaluations {
        // RFC 3339 timestamps start with the date.
        let Some(date) = e.timestamp.get(..10) else {
            continue;
        };
        by_day.entry(date.to_string()).or_default().push(e);
    }

    by_day
        .into_iter()
        .map(|(date, entries)| {
            let n = entries.len() as f64;
            let avg = |f: fn(&EvaluationLogEntry) -> f64| entries.iter().map(|e| f(e)).sum::<f64>() / n;
            TrendEntry {
                date,
                evaluations: entries.len(),
                avg_rmse: round_to(avg(|e| e.rmse), 2),
                avg_mae: round_to(avg(|e| e.mae), 2),
                avg_accuracy: round_to(avg(|e| e.accuracy), 1),
                avg_r2: round_to(avg(|e| e.r2), 3),
            }
        })
        .collect()
}
