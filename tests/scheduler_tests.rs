/// Periodic evaluation tests with in-memory and failing sources.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use traffic_eval::metrics::{Evaluator, FitRating};
use traffic_eval::observations::{Observation, ObservationSource, StaticObservationSource, WindowQuery};
use traffic_eval::scheduler::{self, DataStatus, ScheduleOptions, Scheduler, VecSink};

struct BrokenSource;

impl ObservationSource for BrokenSource {
    fn name(&self) -> String {
        "broken".to_string()
    }

    fn observations(&self, _query: &WindowQuery) -> Result<Vec<Observation>> {
        anyhow::bail!("observation store unavailable")
    }
}

fn options(interval_ms: u64, window: usize) -> ScheduleOptions {
    ScheduleOptions {
        interval: Duration::from_millis(interval_ms),
        window: WindowQuery::latest(window),
    }
}

#[test]
fn source_error_becomes_snapshot() {
    let snap = scheduler::snapshot(&BrokenSource, &Evaluator::default(), &WindowQuery::default());
    assert_eq!(snap.status, DataStatus::SourceError);
    assert_eq!(snap.source, "broken");
    assert!(snap.metrics.is_none());
    assert!(snap.error.unwrap().contains("observation store unavailable"));
}

#[test]
fn empty_source_is_flagged_not_fabricated() {
    let mut scheduler = Scheduler::new(
        StaticObservationSource::default(),
        VecSink::default(),
        Evaluator::default(),
        options(1, 10),
    );
    let snap = scheduler.tick();
    assert_eq!(snap.status, DataStatus::NoData);
    assert_eq!(snap.sample_count, 0);
    assert!(snap.metrics.is_none());
    assert!(snap.rating.is_none());
}

#[test]
fn window_limits_sample_count() {
    let actual = [14.0, 22.0, 19.0, 26.0, 20.0, 32.0, 30.0, 33.0];
    let predicted = [15.0, 20.0, 18.0, 25.0, 22.0, 30.0, 28.0, 35.0];
    let source = StaticObservationSource::from_pairs(&actual, &predicted);

    let mut scheduler = Scheduler::new(source, VecSink::default(), Evaluator::default(), options(1, 4));
    let snap = scheduler.tick();
    assert_eq!(snap.status, DataStatus::Ready);
    assert_eq!(snap.sample_count, 4);
    assert_eq!(snap.tolerance_minutes, 5.0);
}

#[test]
fn run_stops_after_max_ticks() {
    let source = StaticObservationSource::from_pairs(&[10.0, 20.0], &[10.0, 20.0]);
    let mut scheduler = Scheduler::new(source, VecSink::default(), Evaluator::default(), options(1, 0));

    let ticks = scheduler.run(&AtomicBool::new(false), Some(4));
    assert_eq!(ticks, 4);

    let sink = scheduler.into_sink();
    assert_eq!(sink.snapshots.len(), 4);
    assert!(
        sink.snapshots
            .iter()
            .all(|s| s.rating == Some(FitRating::Excellent))
    );
}

#[test]
fn stop_flag_interrupts_long_interval() {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    let handle = thread::spawn(move || {
        let mut scheduler = Scheduler::new(
            StaticObservationSource::from_pairs(&[1.0], &[1.0]),
            VecSink::default(),
            Evaluator::default(),
            options(60_000, 0),
        );
        scheduler.run(&flag, None)
    });

    thread::sleep(Duration::from_millis(150));
    stop.store(true, Ordering::Relaxed);

    // One immediate tick, then the sleep is cut short.
    assert_eq!(handle.join().unwrap(), 1);
}

#[test]
fn source_errors_do_not_stop_the_loop() {
    let mut scheduler = Scheduler::new(BrokenSource, VecSink::default(), Evaluator::default(), options(1, 0));
    assert_eq!(scheduler.run(&AtomicBool::new(false), Some(2)), 2);
    assert!(
        scheduler
            .into_sink()
            .snapshots
            .iter()
            .all(|s| s.status == DataStatus::SourceError)
    );
}
