/// HTTP client for the traffic-prediction service.
///
/// Uses the synchronous `ureq` client. Provides:
///
/// - **Health check**: `GET /` answers when the service is up.
/// - **Predict**: `POST /predict` with a [`PredictionRequest`] body.
///
/// Service-side failures come back as `{"detail": "..."}` with a 4xx/5xx
/// status; the detail text is surfaced in the returned error.
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::request::{PredictionRequest, PredictionResponse};
use crate::analytics::logger;
use crate::config::schema::PredictorConfig;

/// Timeout used by [`PredictionClient::is_healthy`].
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Error body returned by the service.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Synchronous prediction-service client.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    base_url: String,
    timeout: Duration,
}

impl PredictionClient {
    /// Build a client from the resolved config.
    pub fn from_config(config: &PredictorConfig) -> Self {
        Self::new(&config.url, Duration::from_millis(config.timeout_ms))
    }

    pub fn new(base_url: &str, timeout: Duration) -> Self {
        // "localhost" may resolve to ::1 first while the service binds IPv4 only.
        let base_url = base_url
            .trim_end_matches('/')
            .replace("://localhost", "://127.0.0.1");
        Self { base_url, timeout }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the service answers its root endpoint.
    pub fn is_healthy(&self) -> bool {
        let url = format!("{}/", self.base_url);
        ureq::get(&url).timeout(HEALTH_TIMEOUT).call().is_ok()
    }

    /// Request a prediction and record the outcome in the event log.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let started = Instant::now();
        let result = self.send(request);
        let latency_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => logger::log_prediction(request, Some(response), latency_ms, None),
            Err(e) => logger::log_prediction(request, None, latency_ms, Some(&format!("{e:#}"))),
        }

        result
    }

    fn send(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let url = format!("{}/predict", self.base_url);

        let resp = match ureq::post(&url).timeout(self.timeout).send_json(request) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => {
                let detail = resp
                    .into_json::<ErrorBody>()
                    .map(|body| body.detail)
                    .unwrap_or_else(|_| "no detail".to_string());
                anyhow::bail!("prediction service returned {code}: {detail}");
            }
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("prediction request to {url} failed"));
            }
        };

        let parsed: PredictionResponse = resp
            .into_json()
            .context("failed to parse prediction response")?;

        if !parsed.traffic_volume.is_finite() || !parsed.travel_time_index.is_finite() {
            anyhow::bail!("prediction service returned non-finite values");
        }

        Ok(parsed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_default_config() {
        let client = PredictionClient::from_config(&PredictorConfig::default());
        assert_eq!(client.base_url, "http://127.0.0.1:8000");
        assert_eq!(client.timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn client_strips_trailing_slash() {
        let client = PredictionClient::new("http://predictor.internal:8000/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://predictor.internal:8000");
    }

    #[test]
    fn unreachable_service_is_unhealthy() {
        // Port 9 (discard) is closed on CI hosts.
        let client = PredictionClient::new("http://127.0.0.1:9", Duration::from_millis(200));
        assert!(!client.is_healthy());
    }
}
