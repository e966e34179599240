/// Fit-quality badge derived from R².
use serde::{Deserialize, Serialize};

/// Qualitative label for a model's explanatory power over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitRating {
    /// R² ≥ 0.9
    Excellent,
    /// R² ≥ 0.7
    Good,
    /// R² ≥ 0.5
    Fair,
    Poor,
}

impl FitRating {
    pub fn from_r2(r2: f64) -> Self {
        if r2 >= 0.9 {
            Self::Excellent
        } else if r2 >= 0.7 {
            Self::Good
        } else if r2 >= 0.5 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for FitRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
            Self::Poor => write!(f, "poor"),
        }
    }
}
