//! Observation sources: where actual/predicted pairs come from.
//!
//! The evaluator never fabricates data: a source either yields real pairs or
//! an empty window, which callers surface as "no data".
//!
//! Observation file format (one JSON object per line):
//!
//! ```text
//! {"timestamp":"2025-10-24T08:15:00Z","actual":22.0,"predicted":20.5,"road_name":"Sony World Junction"}
//! ```

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::time::days_ago;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One time-aligned pair of a measured value and the model's prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub actual: f64,
    pub predicted: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_name: Option<String>,
}

/// Two aligned sequences ready for evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationWindow {
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

impl ObservationWindow {
    pub fn len(&self) -> usize {
        self.actual.len().min(self.predicted.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split observations into the two aligned sequences, keeping order.
    pub fn from_observations(observations: &[Observation]) -> Self {
        let (actual, predicted) = observations.iter().map(|o| (o.actual, o.predicted)).unzip();
        Self { actual, predicted }
    }
}

/// Which slice of the available history to evaluate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowQuery {
    /// Keep only the most recent `size` observations. `0` keeps everything.
    pub size: usize,
    /// Keep only observations from the last N days.
    pub days: Option<u32>,
}

impl WindowQuery {
    pub fn latest(size: usize) -> Self {
        Self { size, days: None }
    }

    /// Apply the query to observations, returning the selected window in
    /// chronological order.
    pub fn select(&self, mut observations: Vec<Observation>) -> Vec<Observation> {
        if let Some(cutoff) = self.days.and_then(days_ago) {
            observations.retain(|o| o.timestamp >= cutoff);
        }

        observations.sort_by_key(|o| o.timestamp);

        if self.size > 0 && observations.len() > self.size {
            observations.drain(..observations.len() - self.size);
        }

        observations
    }
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// A provider of the latest observation window.
pub trait ObservationSource {
    /// Human-readable name for logs and reports.
    fn name(&self) -> String;

    /// Return the observations selected by `query`.
    fn observations(&self, query: &WindowQuery) -> Result<Vec<Observation>>;

    /// Return the selected observations as an evaluation window.
    fn window(&self, query: &WindowQuery) -> Result<ObservationWindow> {
        Ok(ObservationWindow::from_observations(&self.observations(query)?))
    }
}

// ---------------------------------------------------------------------------
// JSONL file source
// ---------------------------------------------------------------------------

/// Reads observations from a JSONL file on every call, so appended lines are
/// picked up by the next evaluation.
#[derive(Debug, Clone)]
pub struct JsonlObservationSource {
    path: PathBuf,
}

impl JsonlObservationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every well-formed observation in the file.
    ///
    /// A missing file is treated as an empty history. Malformed lines,
    /// including ones that are not UTF-8, are skipped. A read failure is an
    /// error.
    pub fn read_all(&self) -> Result<Vec<Observation>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)
            .with_context(|| format!("failed to open observation file {}", self.path.display()))?;

        let mut observations = Vec::new();
        for line in BufReader::new(file).split(b'\n') {
            let line = line
                .with_context(|| format!("failed to read observation file {}", self.path.display()))?;
            let Ok(text) = std::str::from_utf8(&line) else {
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            if let Ok(observation) = serde_json::from_str::<Observation>(text) {
                observations.push(observation);
            }
        }

        Ok(observations)
    }
}

impl ObservationSource for JsonlObservationSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn observations(&self, query: &WindowQuery) -> Result<Vec<Observation>> {
        Ok(query.select(self.read_all()?))
    }
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

/// A fixed set of observations held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticObservationSource {
    observations: Vec<Observation>,
}

impl StaticObservationSource {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Build a source from two aligned sequences, stamping each pair one
    /// minute apart ending now. Extra trailing values on the longer side
    /// are dropped.
    pub fn from_pairs(actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len().min(predicted.len());
        let start = Utc::now() - chrono::Duration::minutes(n as i64);
        let observations = actual
            .iter()
            .zip(predicted)
            .enumerate()
            .map(|(i, (&a, &p))| Observation {
                timestamp: start + chrono::Duration::minutes(i as i64),
                actual: a,
                predicted: p,
                area_name: None,
                road_name: None,
            })
            .collect();
        Self { observations }
    }
}

impl ObservationSource for StaticObservationSource {
    fn name(&self) -> String {
        "in-memory".to_string()
    }

    fn observations(&self, query: &WindowQuery) -> Result<Vec<Observation>> {
        Ok(query.select(self.observations.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
