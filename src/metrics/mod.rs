//! Accuracy evaluator. Regression-quality statistics over paired
//! actual/predicted sequences.
//!
//! Computes four scalars for a window of observations:
//! - **RMSE**: root mean square error
//! - **MAE**: mean absolute error
//! - **Accuracy**: percentage of predictions within a tolerance band
//! - **R²**: coefficient of determination (not clamped, may be negative)
//!
//! Invalid input (length mismatch, empty sequences, non-finite values or
//! overflowing magnitudes) is not an error: it yields [`MetricResult::zero`].

pub mod rating;

use serde::{Deserialize, Serialize};

use crate::observations::ObservationWindow;

pub use rating::FitRating;

/// Default tolerance band for [`compute_metrics`] accuracy, in minutes.
pub const DEFAULT_TOLERANCE_MINUTES: f64 = 5.0;

/// Decimal places kept for RMSE and MAE.
pub const ERROR_DECIMALS: u32 = 2;
/// Decimal places kept for the accuracy percentage.
pub const ACCURACY_DECIMALS: u32 = 1;
/// Decimal places kept for R².
pub const R2_DECIMALS: u32 = 3;

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

/// The four accuracy statistics for one evaluation, already rounded for
/// display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub rmse: f64,
    pub mae: f64,
    /// Percentage in `[0, 100]`.
    pub accuracy: f64,
    pub r2: f64,
}

impl MetricResult {
    /// The degenerate result returned for mismatched or empty input.
    pub const fn zero() -> Self {
        Self {
            rmse: 0.0,
            mae: 0.0,
            accuracy: 0.0,
            r2: 0.0,
        }
    }

    /// Whether every field is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Badge describing how well the predictions explain the actuals.
    pub fn rating(&self) -> FitRating {
        FitRating::from_r2(self.r2)
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute RMSE, MAE, tolerance accuracy and R² for aligned sequences.
///
/// Returns [`MetricResult::zero`] for degenerate input; see
/// [`try_compute_metrics`]. R² is 0 when every actual value is the same
/// (zero total sum of squares).
pub fn compute_metrics(actual: &[f64], predicted: &[f64], tolerance_minutes: f64) -> MetricResult {
    try_compute_metrics(actual, predicted, tolerance_minutes).unwrap_or_else(MetricResult::zero)
}

/// Like [`compute_metrics`], but `None` for degenerate input: lengths
/// differ, either sequence is empty, any value is NaN/infinite, or the
/// magnitudes are large enough that a sum overflows.
pub fn try_compute_metrics(
    actual: &[f64],
    predicted: &[f64],
    tolerance_minutes: f64,
) -> Option<MetricResult> {
    let n = actual.len();
    if n == 0 || n != predicted.len() {
        return None;
    }
    if actual.iter().chain(predicted).any(|v| !v.is_finite()) {
        return None;
    }

    let n_f = n as f64;
    let mut squared_error = 0.0;
    let mut absolute_error = 0.0;
    let mut within_tolerance = 0usize;

    for (&a, &p) in actual.iter().zip(predicted) {
        let diff = a - p;
        squared_error += diff * diff;
        absolute_error += diff.abs();
        if diff.abs() <= tolerance_minutes {
            within_tolerance += 1;
        }
    }

    let mean = actual.iter().sum::<f64>() / n_f;
    let total_ss: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();
    let r2 = if total_ss == 0.0 {
        0.0
    } else {
        1.0 - squared_error / total_ss
    };

    let rmse = (squared_error / n_f).sqrt();
    let mae = absolute_error / n_f;
    if ![rmse, mae, total_ss, r2].iter().all(|v| v.is_finite()) {
        return None;
    }

    Some(MetricResult {
        rmse: round_to(rmse, ERROR_DECIMALS),
        mae: round_to(mae, ERROR_DECIMALS),
        accuracy: round_to(100.0 * within_tolerance as f64 / n_f, ACCURACY_DECIMALS),
        r2: round_to(r2, R2_DECIMALS),
    })
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// An accuracy evaluator bound to a tolerance band.
///
/// Holds no state besides its tolerance, so a single instance can be shared
/// freely between the scheduler, the CLI and the HTTP handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluator {
    tolerance_minutes: f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_MINUTES)
    }
}

impl Evaluator {
    pub fn new(tolerance_minutes: f64) -> Self {
        Self { tolerance_minutes }
    }

    pub fn tolerance_minutes(&self) -> f64 {
        self.tolerance_minutes
    }

    /// Evaluate an observation window.
    pub fn evaluate(&self, window: &ObservationWindow) -> MetricResult {
        compute_metrics(&window.actual, &window.predicted, self.tolerance_minutes)
    }

    /// Evaluate an observation window, `None` when the window is degenerate.
    pub fn try_evaluate(&self, window: &ObservationWindow) -> Option<MetricResult> {
        try_compute_metrics(&window.actual, &window.predicted, self.tolerance_minutes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
