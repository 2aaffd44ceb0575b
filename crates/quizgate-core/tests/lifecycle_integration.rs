//! Attempt lifecycle across process restarts, using an on-disk store.

use std::path::Path;
use std::sync::Arc;

use quizgate_core::{
    AttemptController, AttemptError, AttemptSettings, Database, HttpSink, ManualClock,
    SessionState,
};

const T0: i64 = 1_700_000_000_000;

/// A fresh controller over the same database file, like a new process.
fn open(path: &Path, clock: &Arc<ManualClock>) -> AttemptController {
    let settings = AttemptSettings {
        time_limit_secs: 600,
        teacher_secret: "teacher".into(),
        ..AttemptSettings::default()
    };
    AttemptController::new(
        settings,
        Arc::new(Database::open_at(path).unwrap()),
        clock.clone(),
        Arc::new(HttpSink::new(None)),
    )
}

#[test]
fn restart_resumes_running_attempt() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("quizgate.db");
    let clock = Arc::new(ManualClock::new(T0));

    open(&db, &clock).start("Katherine Johnson").unwrap();
    clock.advance_secs(100);

    let controller = open(&db, &clock);
    assert_eq!(
        controller.resolve().unwrap(),
        SessionState::InProgress {
            remaining_seconds: 500
        }
    );
    let record = controller.record().unwrap();
    assert_eq!(record.student_name.as_deref(), Some("Katherine Johnson"));
    assert_eq!(record.started_at, Some(T0));
}

#[test]
fn restart_after_deadline_locks() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("quizgate.db");
    let clock = Arc::new(ManualClock::new(T0));

    open(&db, &clock).start("Katherine Johnson").unwrap();
    clock.advance_secs(601);

    assert_eq!(open(&db, &clock).resolve().unwrap(), SessionState::Locked);
    // Still locked for every later process, even if the clock is wound back.
    clock.set_ms(T0);
    let controller = open(&db, &clock);
    assert_eq!(controller.resolve().unwrap(), SessionState::Locked);
    assert!(matches!(
        controller.start("Someone Else"),
        Err(AttemptError::AlreadyLocked)
    ));
}

#[tokio::test]
async fn unconfigured_endpoint_does_not_consume_attempt() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("quizgate.db");
    let clock = Arc::new(ManualClock::new(T0));
    let controller = open(&db, &clock);

    controller.start("Katherine Johnson").unwrap();
    let err = controller.submit(Default::default()).await.unwrap_err();
    assert!(matches!(
        err,
        AttemptError::Sink(quizgate_core::SinkError::NotConfigured)
    ));
    assert!(matches!(
        controller.state().unwrap(),
        SessionState::InProgress { .. }
    ));
}

#[test]
fn teacher_reset_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("quizgate.db");
    let clock = Arc::new(ManualClock::new(T0));

    let controller = open(&db, &clock);
    controller.start("Katherine Johnson").unwrap();
    controller.lock().unwrap();
    assert!(matches!(controller.reset("student"), Err(AttemptError::Auth)));
    assert_eq!(open(&db, &clock).resolve().unwrap(), SessionState::Locked);

    controller.reset("teacher").unwrap();
    let fresh = open(&db, &clock);
    assert_eq!(fresh.resolve().unwrap(), SessionState::NotStarted);
    assert!(fresh.record().unwrap().is_empty());
}
