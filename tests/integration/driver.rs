//! Frame driver under tokio's paused clock.

use std::sync::Arc;
use std::time::Duration;

use fretsync::prelude::*;
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::helpers::*;

fn driven_session(surface: &ProbeSurface) -> (Arc<ScriptedSource>, Arc<Mutex<SyncSession>>) {
    let (probe, source) = ScriptedSource::new(1.0, 10.0, true);
    let session = SyncSession::builder()
        .config(immediate_config())
        .time_source(&source)
        .timeline_width(1000.0)
        .surface(Box::new(surface.clone()))
        .start(true)
        .build()
        .unwrap();
    // The session holds the source weakly; keep it alive through the probe
    drop(source);
    (probe, Arc::new(Mutex::new(session)))
}

#[tokio::test(start_paused = true)]
async fn test_driver_runs_frames_until_disposed() {
    init_tracing();
    let surface = ProbeSurface::new();
    let (probe, session) = driven_session(&surface);
    let driver = spawn_frame_driver(&Handle::current(), Arc::clone(&session), FRAME);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let frames = session.lock().frames();
    assert!(frames >= 6, "ran {frames} frames");
    assert!(session.lock().store().state().is_playing);

    probe.set_time(5.0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(surface.last_cursor().map(|c| c.x), Some(500.0));

    session.lock().dispose();
    let ran = driver.join().await;
    assert!(ran.is_some_and(|n| n > frames));
}

#[tokio::test(start_paused = true)]
async fn test_abort_stops_driver() {
    let surface = ProbeSurface::new();
    let (_probe, session) = driven_session(&surface);
    let driver = spawn_frame_driver(&Handle::current(), Arc::clone(&session), Duration::ZERO);

    tokio::time::sleep(Duration::from_millis(10)).await;
    driver.abort();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(driver.is_finished());

    let frames = session.lock().frames();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.lock().frames(), frames);
    assert!(!session.lock().is_disposed());
}
