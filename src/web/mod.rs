//! JSON API for dashboards.
//!
//! A lightweight HTTP server (sync, via `tiny_http`) that exposes the
//! evaluator, the evaluation history and a proxy to the prediction service.
//! Rendering is left to whatever frontend consumes the JSON.
//!
//! Launched via `traffic-eval serve` (default: `http://127.0.0.1:9747`).

mod api;

use std::io::{Cursor, Read};

use anyhow::Result;
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::config::TrafficEvalConfig;
use crate::utils::diag;

pub(crate) type JsonResponse = Response<Cursor<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the API server on `addr` with the given configuration.
///
/// Blocks the current thread. Requests are handled sequentially, and a
/// failing handler produces a 500 response without stopping the server.
/// An unreadable body (including one that is not UTF-8) is a 400.
pub fn serve(addr: &str, config: TrafficEvalConfig) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("traffic-eval API running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    serve_requests(&server, &config);
    Ok(())
}

/// Handle requests from an already-bound server until it is closed.
pub fn serve_requests(server: &Server, config: &TrafficEvalConfig) {
    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            let mut buf = String::new();
            request.as_reader().read_to_string(&mut buf).map(|_| Some(buf))
        } else {
            Ok(None)
        };

        let response = match body {
            Err(e) => error_response(400, &format!("failed to read request body: {e}")),
            Ok(body) => match dispatch(config, &method, &url, body.as_deref()) {
                Ok(resp) => resp,
                Err(e) => {
                    diag::error(&format!("{method} {url} failed: {e:#}"));
                    error_response(500, &format!("{e:#}"))
                }
            },
        };

        let status = response.status_code().0;
        let _ = request.respond(response.with_header(cors_header()));

        diag::info(&format!(
            "{} {} {} {}",
            method,
            url,
            status,
            chrono::Local::now().format("%H:%M:%S")
        ));
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
pub(crate) fn dispatch(
    config: &TrafficEvalConfig,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<JsonResponse> {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/") => api::get_root(),
        (&Method::Options, _) => Ok(preflight()),

        (&Method::Get, "/api/metrics") => api::get_metrics(config, url),
        (&Method::Post, "/api/predict") => api::post_predict(config, body.unwrap_or("")),
        (&Method::Get, "/api/history") => api::get_history(url),

        (&Method::Get, "/api/config") => api::get_config(config),
        (&Method::Get, "/api/health") => api::get_health(config),

        _ => Ok(error_response(404, "not found")),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// JSON `{"error": ...}` response with the given status.
pub(crate) fn error_response(status: u16, message: &str) -> JsonResponse {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

/// Empty 204 answer to CORS preflight requests.
fn preflight() -> JsonResponse {
    Response::from_data(Vec::new())
        .with_header(header("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
        .with_header(header("Access-Control-Allow-Headers", "Content-Type"))
        .with_status_code(StatusCode(204))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    header("Content-Type", "application/json; charset=utf-8")
}

/// Browser dashboards are served from a different origin.
fn cors_header() -> Header {
    header("Access-Control-Allow-Origin", "*")
}

fn header(name: &'static str, value: &'static str) -> Header {
    Header::from_bytes(name, value).expect("static header is valid ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(resp: &JsonResponse) -> u16 {
        resp.status_code().0
    }

    #[test]
    fn unknown_route_is_404() {
        let config = TrafficEvalConfig::default();
        let resp = dispatch(&config, &Method::Get, "/nope", None).unwrap();
        assert_eq!(status(&resp), 404);
    }

    #[test]
    fn root_answers_banner() {
        let config = TrafficEvalConfig::default();
        let resp = dispatch(&config, &Method::Get, "/", None).unwrap();
        assert_eq!(status(&resp), 200);
    }

    #[test]
    fn options_is_preflight() {
        let config = TrafficEvalConfig::default();
        let resp = dispatch(&config, &Method::Options, "/api/predict", None).unwrap();
        assert_eq!(status(&resp), 204);
    }

    #[test]
    fn predict_rejects_invalid_body_with_400() {
        let config = TrafficEvalConfig::default();
        let resp = dispatch(&config, &Method::Post, "/api/predict", Some("{}")).unwrap();
        assert_eq!(status(&resp), 400);
    }
}
