/// Observation file and window selection tests.
use std::fs;
use std::path::PathBuf;

use chrono::{Duration, Utc};
use traffic_eval::observations::{
    JsonlObservationSource, Observation, ObservationSource, StaticObservationSource, WindowQuery,
};

fn temp_file(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("traffic-eval-obs-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

fn line(minutes_ago: i64, actual: f64, predicted: f64) -> String {
    let obs = Observation {
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        actual,
        predicted,
        area_name: Some("Koramangala".to_string()),
        road_name: Some("Sony World Junction".to_string()),
    };
    serde_json::to_string(&obs).unwrap()
}

#[test]
fn missing_file_is_empty_history() {
    let source = JsonlObservationSource::new("/nonexistent/traffic-eval/observations.jsonl");
    assert!(source.read_all().unwrap().is_empty());
    assert!(source.window(&WindowQuery::default()).unwrap().is_empty());
}

#[test]
fn malformed_lines_are_skipped() {
    let path = temp_file("malformed.jsonl");
    let contents = [
        line(3, 20.0, 21.0),
        "not json".to_string(),
        String::new(),
        r#"{"actual": 1.0}"#.to_string(),
        line(1, 25.0, 24.0),
    ]
    .join("\n");
    fs::write(&path, contents).unwrap();

    let source = JsonlObservationSource::new(&path);
    let all = source.read_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].road_name.as_deref(), Some("Sony World Junction"));

    let _ = fs::remove_file(&path);
}

#[test]
fn invalid_utf8_line_is_skipped_not_fatal() {
    let path = temp_file("invalid-utf8.jsonl");
    let mut contents = Vec::new();
    contents.extend_from_slice(line(6, 10.0, 11.0).as_bytes());
    contents.extend_from_slice(b"\n\xff\xfe\n");
    for minutes_ago in (1..=5).rev() {
        contents.extend_from_slice(line(minutes_ago, 20.0, 21.0).as_bytes());
        contents.push(b'\n');
    }
    fs::write(&path, contents).unwrap();

    let source = JsonlObservationSource::new(&path);
    assert_eq!(source.read_all().unwrap().len(), 6);
    assert_eq!(source.window(&WindowQuery::default()).unwrap().len(), 6);

    let _ = fs::remove_file(&path);
}

#[test]
fn out_of_range_days_keep_every_observation() {
    let source = StaticObservationSource::from_pairs(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
    let query = WindowQuery {
        size: 0,
        days: Some(u32::MAX),
    };
    assert_eq!(source.observations(&query).unwrap().len(), 3);
}

#[test]
fn window_keeps_latest_in_chronological_order() {
    let path = temp_file("window.jsonl");
    // Written out of order on purpose.
    let contents = [
        line(1, 40.0, 41.0),
        line(5, 10.0, 11.0),
        line(3, 30.0, 31.0),
        line(4, 20.0, 21.0),
    ]
    .join("\n");
    fs::write(&path, contents).unwrap();

    let source = JsonlObservationSource::new(&path);
    let window = source.window(&WindowQuery::latest(2)).unwrap();
    assert_eq!(window.actual, vec![30.0, 40.0]);
    assert_eq!(window.predicted, vec![31.0, 41.0]);

    let everything = source.window(&WindowQuery::latest(0)).unwrap();
    assert_eq!(everything.actual, vec![10.0, 20.0, 30.0, 40.0]);

    let _ = fs::remove_file(&path);
}

#[test]
fn days_filter_drops_old_observations() {
    let old = Observation {
        timestamp: Utc::now() - Duration::days(10),
        actual: 1.0,
        predicted: 1.0,
        area_name: None,
        road_name: None,
    };
    let recent = Observation {
        timestamp: Utc::now() - Duration::hours(2),
        ..old.clone()
    };
    let source = StaticObservationSource::new(vec![old, recent]);

    let query = WindowQuery {
        size: 0,
        days: Some(1),
    };
    assert_eq!(source.observations(&query).unwrap().len(), 1);
    assert_eq!(source.observations(&WindowQuery::default()).unwrap().len(), 2);
}

#[test]
fn from_pairs_truncates_to_shorter_side() {
    let source = StaticObservationSource::from_pairs(&[1.0, 2.0, 3.0], &[1.5, 2.5]);
    let window = source.window(&WindowQuery::default()).unwrap();
    assert_eq!(window.len(), 2);
    assert_eq!(window.actual, vec![1.0, 2.0]);
}
