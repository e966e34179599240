//! Periodic evaluation: every interval, pull the latest observation window,
//! evaluate it and hand the snapshot to a sink.
//!
//! The scheduler knows nothing about transports. Sources implement
//! [`ObservationSource`], consumers implement [`MetricsSink`].
//!
//! A tick never fails: a source error becomes a `source-error` snapshot and
//! an empty window becomes `no-data`. Neither carries metrics.

pub mod sinks;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::{Evaluator, FitRating, MetricResult};
use crate::observations::{ObservationSource, WindowQuery};
use crate::utils::diag;

pub use sinks::{ConsoleSink, EventLogSink, MetricsSink, VecSink};

/// Upper bound on a single sleep slice, so a stop request is seen promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Whether a snapshot is backed by real data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataStatus {
    Ready,
    /// The source had no observations in the requested window.
    NoData,
    /// The source failed; see [`MetricsSnapshot::error`].
    SourceError,
}

impl std::fmt::Display for DataStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::NoData => write!(f, "no-data"),
            Self::SourceError => write!(f, "source-error"),
        }
    }
}

/// The outcome of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub sample_count: usize,
    pub tolerance_minutes: f64,
    pub status: DataStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present only when `status` is `Ready`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricResult>,
    /// Absent when the metrics are the zero-result of a degenerate window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<FitRating>,
}

/// Evaluate the window `source` yields for `query`.
///
/// Shared by the scheduler, the CLI and the JSON API so every consumer
/// applies the same no-data and error rules.
pub fn snapshot<S>(source: &S, evaluator: &Evaluator, query: &WindowQuery) -> MetricsSnapshot
where
    S: ObservationSource + ?Sized,
{
    let (sample_count, status, evaluated, error) = match source.window(query) {
        Ok(window) if window.is_empty() => (0, DataStatus::NoData, None, None),
        Ok(window) => (
            window.len(),
            DataStatus::Ready,
            Some(evaluator.try_evaluate(&window)),
            None,
        ),
        Err(e) => (0, DataStatus::SourceError, None, Some(format!("{e:#}"))),
    };

    // A degenerate window still reports the zero-result, but unrated.
    let (metrics, rating) = match evaluated {
        Some(Some(m)) => (Some(m), Some(m.rating())),
        Some(None) => (Some(MetricResult::zero()), None),
        None => (None, None),
    };

    MetricsSnapshot {
        timestamp: Utc::now(),
        source: source.name(),
        sample_count,
        tolerance_minutes: evaluator.tolerance_minutes(),
        status,
        error,
        metrics,
        rating,
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Timing and window options for a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleOptions {
    pub interval: Duration,
    pub window: WindowQuery,
}

/// Drives periodic evaluations on the calling thread.
pub struct Scheduler<S, K> {
    source: S,
    sink: K,
    evaluator: Evaluator,
    options: ScheduleOptions,
}

impl<S, K> Scheduler<S, K>
where
    S: ObservationSource,
    K: MetricsSink,
{
    pub fn new(source: S, sink: K, evaluator: Evaluator, options: ScheduleOptions) -> Self {
        Self {
            source,
            sink,
            evaluator,
            options,
        }
    }

    /// Run one evaluation and publish it.
    pub fn tick(&mut self) -> MetricsSnapshot {
        let snap = snapshot(&self.source, &self.evaluator, &self.options.window);
        if let Some(e) = &snap.error {
            diag::warn(&format!("observation source {} failed: {e}", snap.source));
        }
        self.sink.publish(&snap);
        snap
    }

    /// Tick immediately, then once per interval, until `stop` is set or
    /// `max_ticks` evaluations have run. Returns the number of ticks.
    pub fn run(&mut self, stop: &AtomicBool, max_ticks: Option<u64>) -> u64 {
        let mut ticks = 0u64;

        while !stop.load(Ordering::Relaxed) {
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }

            let started = Instant::now();
            self.tick();
            ticks += 1;

            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }

            let deadline = started + self.options.interval;
            while !stop.load(Ordering::Relaxed) {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                thread::sleep((deadline - now).min(SLEEP_SLICE));
            }
        }

        diag::debug(&format!("scheduler stopped after {ticks} tick(s)"));
        ticks
    }

    /// Consume the scheduler and return its sink.
    pub fn into_sink(self) -> K {
        self.sink
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
