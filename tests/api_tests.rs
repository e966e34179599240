/// JSON API tests over a real socket.
use std::thread;
use std::time::Duration;

use tiny_http::Server;
use traffic_eval::config::TrafficEvalConfig;
use traffic_eval::web;

/// Start the API on an ephemeral port. The server thread lives until the
/// test binary exits.
fn start(config: TrafficEvalConfig) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    thread::spawn(move || web::serve_requests(&server, &config));
    format!("http://{addr}")
}

fn offline_config() -> TrafficEvalConfig {
    let mut config = TrafficEvalConfig::default();
    config.observations.path = "/nonexistent/traffic-eval/observations.jsonl".to_string();
    config.predictor.url = "http://127.0.0.1:9".to_string();
    config.predictor.timeout_ms = 300;
    config
}

fn get_json(url: &str) -> (u16, serde_json::Value) {
    let agent = ureq::AgentBuilder::new().timeout(Duration::from_secs(5)).build();
    match agent.get(url).call() {
        Ok(resp) => (resp.status(), resp.into_json().unwrap()),
        Err(ureq::Error::Status(code, resp)) => (code, resp.into_json().unwrap()),
        Err(e) => panic!("request to {url} failed: {e}"),
    }
}

#[test]
fn root_reports_running() {
    let base = start(offline_config());
    let (status, body) = get_json(&format!("{base}/"));
    assert_eq!(status, 200);
    assert!(body["message"].as_str().unwrap().contains("running"));
}

#[test]
fn metrics_without_data_flag_no_data() {
    let base = start(offline_config());
    let (status, body) = get_json(&format!("{base}/api/metrics?window=20"));
    assert_eq!(status, 200);
    assert_eq!(body["status"], "no-data");
    assert_eq!(body["sample_count"], 0);
    assert!(body.get("metrics").is_none());
}

#[test]
fn metrics_over_observation_file() {
    let dir = std::env::temp_dir().join(format!("traffic-eval-api-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("observations.jsonl");
    let lines = [
        r#"{"timestamp":"2025-10-24T08:00:00Z","actual":14.0,"predicted":15.0}"#,
        r#"{"timestamp":"2025-10-24T08:05:00Z","actual":22.0,"predicted":20.0}"#,
        r#"{"timestamp":"2025-10-24T08:10:00Z","actual":19.0,"predicted":18.0}"#,
        r#"{"timestamp":"2025-10-24T08:15:00Z","actual":26.0,"predicted":25.0}"#,
    ];
    std::fs::write(&path, lines.join("\n")).unwrap();

    let mut config = offline_config();
    config.observations.path = path.display().to_string();
    let base = start(config);

    let (status, body) = get_json(&format!("{base}/api/metrics?tolerance=1.5"));
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["sample_count"], 4);
    assert_eq!(body["tolerance_minutes"], 1.5);
    assert_eq!(body["metrics"]["accuracy"], 75.0);
    assert!(body["rating"].is_string());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn predict_validation_and_upstream_failure() {
    let base = start(offline_config());
    let agent = ureq::AgentBuilder::new().timeout(Duration::from_secs(5)).build();

    let missing = agent
        .post(&format!("{base}/api/predict"))
        .send_json(serde_json::json!({ "area_name": "Koramangala" }));
    match missing {
        Err(ureq::Error::Status(code, _)) => assert_eq!(code, 400),
        other => panic!("expected 400, got {other:?}"),
    }

    let upstream = agent
        .post(&format!("{base}/api/predict"))
        .send_json(serde_json::json!({
            "area_name": "Koramangala",
            "road_name": "Sony World Junction",
        }));
    match upstream {
        Err(ureq::Error::Status(code, _)) => assert_eq!(code, 502),
        other => panic!("expected 502, got {other:?}"),
    }
}

#[test]
fn responses_carry_cors_header() {
    let base = start(offline_config());
    let resp = ureq::get(&format!("{base}/api/config")).call().unwrap();
    assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));
    let body: serde_json::Value = resp.into_json().unwrap();
    assert_eq!(body["config"]["evaluation"]["window_size"], 50);
}

#[test]
fn unknown_route_is_404() {
    let base = start(offline_config());
    let (status, body) = get_json(&format!("{base}/api/nope"));
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not found");
}

#[test]
fn unreadable_body_is_400_with_read_error() {
    let base = start(offline_config());
    let resp = ureq::post(&format!("{base}/api/predict"))
        .set("Content-Type", "application/json")
        .send_bytes(b"{\"area_name\": \"\xff\xfe\"}");
    match resp {
        Err(ureq::Error::Status(code, resp)) => {
            assert_eq!(code, 400);
            let body: serde_json::Value = resp.into_json().unwrap();
            let message = body["error"].as_str().unwrap();
            assert!(message.contains("failed to read request body"), "{message}");
        }
        other => panic!("expected 400, got {other:?}"),
    }
}

#[test]
fn out_of_range_days_do_not_take_the_server_down() {
    let base = start(offline_config());

    let (status, body) = get_json(&format!("{base}/api/metrics?days=4000000000"));
    assert_eq!(status, 200);
    assert_eq!(body["status"], "no-data");

    let (status, body) = get_json(&format!("{base}/api/history?days=4294967295"));
    assert_eq!(status, 200);
    assert!(body["entries"].is_array());

    // Still serving afterwards.
    let (status, _) = get_json(&format!("{base}/"));
    assert_eq!(status, 200);
}
