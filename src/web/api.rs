//! JSON API handlers.
//!
//! Each handler corresponds to an API endpoint and returns a JSON response.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use crate::analytics::{logger, reporter};
use crate::config::{self, TrafficEvalConfig};
use crate::metrics::Evaluator;
use crate::observations::{JsonlObservationSource, WindowQuery};
use crate::predictor::{PredictionClient, PredictionRequest};
use crate::scheduler;
use crate::utils::paths::expand_tilde;

use super::{JsonResponse, content_type_json, error_response};

// ---------------------------------------------------------------------------
// JSON request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/predict`. Everything is optional here so missing
/// fields get the same validation message as the CLI.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PredictBody {
    area_name: String,
    road_name: String,
    weather: Option<String>,
    date: Option<String>,
}

#[derive(Serialize)]
struct HistoryResponse {
    days: u32,
    entries: Vec<reporter::TrendEntry>,
}

#[derive(Serialize)]
struct ConfigResponse<'a> {
    config: &'a TrafficEvalConfig,
    toml_text: String,
}

#[derive(Serialize)]
struct HealthResponse {
    predictor_url: String,
    predictor_available: bool,
    config_exists: bool,
    observations_path: String,
    observations_exist: bool,
    event_log_exists: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<JsonResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

/// Extract a query parameter from a URL.
fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    url.split_once('?')?.1.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key && !v.is_empty()).then_some(v)
    })
}

fn parse_param<T: std::str::FromStr>(url: &str, key: &str) -> Option<T> {
    query_param(url, key)?.parse().ok()
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /`: service banner.
pub fn get_root() -> Result<JsonResponse> {
    json_response(&serde_json::json!({
        "message": "traffic-eval API is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /api/metrics?window=N&days=N&tolerance=T`: evaluate the latest
/// observation window.
pub fn get_metrics(config: &TrafficEvalConfig, url: &str) -> Result<JsonResponse> {
    let tolerance = parse_param::<f64>(url, "tolerance")
        .filter(|t| t.is_finite())
        .unwrap_or(config.evaluation.tolerance_minutes);
    let query = WindowQuery {
        size: parse_param(url, "window").unwrap_or(config.evaluation.window_size),
        days: parse_param(url, "days"),
    };

    let source = JsonlObservationSource::new(expand_tilde(&config.observations.path));
    let snap = scheduler::snapshot(&source, &Evaluator::new(tolerance), &query);

    json_response(&snap)
}

/// `POST /api/predict`: forward a request to the prediction service.
///
/// Invalid input is a 400; a failing service is a 502.
pub fn post_predict(config: &TrafficEvalConfig, body: &str) -> Result<JsonResponse> {
    let parsed: PredictBody = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => return Ok(error_response(400, &format!("invalid JSON body: {e}"))),
    };

    let request = match PredictionRequest::new(
        &parsed.area_name,
        &parsed.road_name,
        parsed.weather.as_deref(),
        parsed.date.as_deref(),
    ) {
        Ok(request) => request,
        Err(e) => return Ok(error_response(400, &e.to_string())),
    };

    match PredictionClient::from_config(&config.predictor).predict(&request) {
        Ok(prediction) => json_response(&prediction),
        Err(e) => Ok(error_response(502, &format!("{e:#}"))),
    }
}

/// `GET /api/history?days=N`: daily evaluation averages.
pub fn get_history(url: &str) -> Result<JsonResponse> {
    let days = parse_param(url, "days").unwrap_or(30);
    json_response(&HistoryResponse {
        days,
        entries: reporter::compute_trends(days),
    })
}

/// `GET /api/config`: current effective configuration.
pub fn get_config(config: &TrafficEvalConfig) -> Result<JsonResponse> {
    let toml_text = toml::to_string_pretty(config).context("failed to serialize config")?;
    json_response(&ConfigResponse { config, toml_text })
}

/// `GET /api/health`: reachability and file presence summary.
pub fn get_health(config: &TrafficEvalConfig) -> Result<JsonResponse> {
    let client = PredictionClient::from_config(&config.predictor);
    let observations_path = expand_tilde(&config.observations.path);

    json_response(&HealthResponse {
        predictor_url: client.base_url().to_string(),
        predictor_available: client.is_healthy(),
        config_exists: config::global_config_file().is_some_and(|p| p.exists()),
        observations_path: observations_path.display().to_string(),
        observations_exist: observations_path.exists(),
        event_log_exists: logger::event_log_path().is_some_and(|p| p.exists()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
