//! traffic-eval: accuracy evaluation for an external traffic-prediction
//! service.
//!
//! The core is [`metrics::compute_metrics`]: RMSE, MAE, tolerance accuracy
//! and R² over aligned actual/predicted sequences. Around it sit an
//! observation source, a periodic [`scheduler`], a prediction-service
//! client, a JSON API and the CLI.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod metrics;
pub mod observations;
pub mod predictor;
pub mod scheduler;
pub mod utils;
pub mod web;
