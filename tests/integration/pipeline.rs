//! Frame pipeline integration tests.

use std::sync::Arc;

use approx::assert_relative_eq;
use fretsync::prelude::*;
use fretsync::{ResolveTrace, ScrollConfig, TimeSignature};
use parking_lot::Mutex;

use crate::helpers::tolerances::PIXEL_EPSILON;
use crate::helpers::*;

/// One sample flows store -> cursor -> scroll inside a single frame.
#[test]
fn test_frame_runs_store_then_cursor_then_scroll() {
    let log = stage_log();
    let (_probe, source) = ScriptedSource::new(3.0, 10.0, true);
    let viewport = ProbeViewport::new(800.0, 300.0).logging(&log);
    let surface = ProbeSurface::new().logging(&log);

    let mut session = SyncSession::builder()
        .config(immediate_config())
        .time_source(&source)
        .notation(Box::new(RowNotation::new(20)))
        .viewport(Box::new(viewport.clone()))
        .surface(Box::new(surface.clone()))
        .start(true)
        .build()
        .unwrap();

    let seen = Arc::new(Mutex::new(None));
    {
        let log = Arc::clone(&log);
        let seen = Arc::clone(&seen);
        session.store().subscribe(move |state| {
            log.lock().push("store");
            *seen.lock() = Some(state.current_time);
        });
    }

    let outcome = session.on_frame(frame(0));

    assert_eq!(*log.lock(), vec!["store", "markers", "cursor", "scroll"]);
    assert!(outcome.notified);
    assert_eq!(*seen.lock(), Some(3.0));

    // Beat #6 starts at 3.0 s and sits at x = 600, past the leading edge
    let cursor = outcome.cursor.unwrap();
    assert_relative_eq!(cursor.x, 600.0, epsilon = PIXEL_EPSILON);
    assert_eq!(surface.last_cursor(), Some(cursor));
    assert_eq!(
        outcome.trace,
        Some(ResolveTrace::Resolved {
            beat_id: 6,
            time_ms: 3000.0
        })
    );
    assert_eq!(outcome.scroll.and_then(|c| c.left), Some(200.0));
    assert_relative_eq!(viewport.scroll_left(), 200.0);
}

#[test]
fn test_cursor_holds_last_position_across_misses() {
    let (probe, source) = ScriptedSource::new(0.0, 10.0, true);
    let surface = ProbeSurface::new();
    let mut session = SyncSession::builder()
        .time_source(&source)
        .notation(Box::new(RowNotation::new(4).missing(&[2])))
        .surface(Box::new(surface.clone()))
        .start(true)
        .build()
        .unwrap();

    let mut xs = Vec::new();
    for (n, time) in [0.2, 0.7, 1.2, 1.7, 2.2].into_iter().enumerate() {
        probe.set_time(time);
        let outcome = session.on_frame(frame(n as u64 * 2));
        xs.push(outcome.cursor.map(|c| c.x));
        if n == 2 {
            assert!(matches!(
                outcome.trace,
                Some(ResolveTrace::BoundsMiss {
                    beat_id: 2,
                    held: true,
                    ..
                })
            ));
        }
    }

    // Beat 2 has no bounds and 2.2 s is past the last beat
    assert_eq!(
        xs,
        vec![Some(0.0), Some(100.0), Some(100.0), Some(300.0), Some(300.0)]
    );
    assert_eq!(session.resolver().misses(), 2);
    assert_eq!(surface.state.lock().cursor_moves.len(), 5);
}

#[test]
fn test_no_position_before_first_hit() {
    let (_probe, source) = ScriptedSource::new(0.1, 10.0, true);
    let surface = ProbeSurface::new();
    let mut session = SyncSession::builder()
        .time_source(&source)
        .notation(Box::new(RowNotation::new(4).missing(&[0])))
        .surface(Box::new(surface.clone()))
        .start(true)
        .build()
        .unwrap();

    let outcome = session.on_frame(frame(0));
    assert_eq!(outcome.cursor, None);
    assert_eq!(surface.last_cursor(), None);
    assert_eq!(
        outcome.trace.map(|trace| trace.to_string()),
        Some("t=100ms -> beat #0 -> no bounds (no position yet)".to_string())
    );
}

#[test]
fn test_sweep_scrolls_in_discrete_steps() {
    let (probe, source) = ScriptedSource::new(0.0, 60.0, true);
    let viewport = ProbeViewport::new(1000.0, 400.0);
    let mut session = SyncSession::builder()
        .time_source(&source)
        .notation(Box::new(RowNotation::new(120)))
        .viewport(Box::new(viewport.clone()))
        .start(true)
        .build()
        .unwrap();

    // 20 s of playback at 60 Hz
    for n in 0..1200u64 {
        probe.set_time(n as f64 / 60.0);
        session.on_frame(frame(n));
    }

    let commands = viewport.commands();
    assert!(!commands.is_empty());
    // Cursor ends at x = 3900; each recenter buys 200+ px of travel
    assert!(commands.len() < 25, "scrolled {} times", commands.len());

    let lefts: Vec<f64> = commands.iter().filter_map(|c| c.left).collect();
    assert!(lefts.windows(2).all(|pair| pair[1] > pair[0]));
}

#[test]
fn test_timeline_cursor_without_notation() {
    let (probe, source) = ScriptedSource::new(0.0, 8.0, true);
    let mut session = SyncSession::builder()
        .time_source(&source)
        .timeline_width(800.0)
        .start(true)
        .build()
        .unwrap();

    probe.set_time(2.0);
    let outcome = session.on_frame(frame(0));
    assert_eq!(outcome.trace, None);
    assert_relative_eq!(outcome.cursor.unwrap().x, 200.0);

    // Past the end clamps to the layout width
    probe.set_time(12.0);
    let outcome = session.on_frame(frame(10));
    assert_relative_eq!(outcome.cursor.unwrap().x, 800.0);
}

#[test]
fn test_markers_regenerate_only_on_input_change() {
    let (_probe, source) = ScriptedSource::new(0.0, 8.0, true);
    let surface = ProbeSurface::new();
    let mut session = SyncSession::builder()
        .config(immediate_config())
        .time_source(&source)
        .surface(Box::new(surface.clone()))
        .timeline_width(1000.0)
        .start(true)
        .build()
        .unwrap();

    session.on_frame(frame(0));
    session.on_frame(frame(2));
    // 120 BPM in 4/4: one measure every 2 s
    let markers = session.markers().unwrap();
    let times: Vec<f64> = markers.iter().map(|m| m.time).collect();
    assert_eq!(times, vec![0.0, 2.0, 4.0, 6.0]);
    assert_relative_eq!(markers[1].position, 250.0);
    assert_eq!(session.marker_regenerations(), 1);
    assert_eq!(surface.marker_draws(), 1);

    session.set_tempo(60.0).unwrap();
    assert_eq!(session.markers().unwrap().len(), 2);

    session.set_time_signature(TimeSignature::new(3, 4)).unwrap();
    let times: Vec<f64> = session.markers().unwrap().iter().map(|m| m.time).collect();
    assert_eq!(times, vec![0.0, 3.0, 6.0]);

    session.set_timeline_width(Some(500.0));
    assert_relative_eq!(session.markers().unwrap()[1].position, 500.0 * 3.0 / 8.0);

    assert_eq!(session.marker_regenerations(), 4);
    assert_eq!(surface.marker_draws(), 4);
}

#[test]
fn test_click_to_seek_jumps_and_seeks() {
    let (_probe, source) = ScriptedSource::new(0.0, 10.0, true);
    let controls = Arc::new(RecordingControls::default());
    let viewport = ProbeViewport::new(800.0, 300.0);
    let mut session = SyncSession::builder()
        .config(immediate_config())
        .time_source(&source)
        .controls(Arc::clone(&controls) as Arc<dyn PlaybackControls>)
        .viewport(Box::new(viewport.clone()))
        .timeline_width(2000.0)
        .start(true)
        .build()
        .unwrap();

    // Nothing loaded yet
    assert_eq!(session.click_to_seek(500.0, 0.0), None);

    session.on_frame(frame(0));
    assert_eq!(session.click_to_seek(1000.0, 400.0), Some(5.0));
    assert_eq!(controls.calls(), vec![ControlCall::Seek(5.0)]);

    let jump = viewport.commands().last().copied().unwrap();
    assert_eq!(jump.left, Some(600.0));
    assert_eq!(jump.top, Some(250.0));
    assert_eq!(jump.behavior, ScrollConfig::default().jump_behavior);
}

#[test]
fn test_load_notation_resets_cursor() {
    let (_probe, source) = ScriptedSource::new(0.7, 10.0, true);
    let mut session = SyncSession::builder()
        .time_source(&source)
        .notation(Box::new(RowNotation::new(4)))
        .start(true)
        .build()
        .unwrap();

    session.on_frame(frame(0));
    assert!(session.resolver().last_good().is_some());

    session.load_notation(Box::new(RowNotation::new(4).missing(&[1])), vec![0]);
    assert_eq!(session.resolver().last_good(), None);
    let outcome = session.on_frame(frame(2));
    assert_eq!(outcome.cursor, None);
}

/// A loaded track that never started playing still lays out markers, takes
/// clicks and follows seeks made while paused.
#[test]
fn test_paused_track_reaches_store_and_view() {
    let (probe, source) = ScriptedSource::new(4.0, 30.0, false);
    let controls = Arc::new(RecordingControls::default());
    let surface = ProbeSurface::new();
    let mut session = SyncSession::builder()
        .time_source(&source)
        .controls(Arc::clone(&controls) as Arc<dyn PlaybackControls>)
        .surface(Box::new(surface.clone()))
        .timeline_width(3000.0)
        .start(true)
        .build()
        .unwrap();

    for n in 0..10 {
        let outcome = session.on_frame(frame(n));
        assert!(outcome.sample.is_none());
    }
    let state = session.store().state();
    assert!(!state.is_playing);
    assert!(state.is_loaded);
    assert_eq!(state.current_time, 4.0);
    assert_eq!(state.duration, 30.0);
    // Pushed once, not every paused frame
    assert_eq!(session.store().accepted_updates(), 1);

    // 120 BPM in 4/4 over 30 s: a measure every 2 s
    assert_eq!(session.markers().unwrap().len(), 15);
    let drawn = surface.state.lock().marker_draws.last().map(Vec::len);
    assert_eq!(drawn, Some(15));
    assert_relative_eq!(surface.last_cursor().unwrap().x, 400.0);

    assert_eq!(session.click_to_seek(1500.0, 0.0), Some(15.0));
    assert_eq!(controls.calls(), vec![ControlCall::Seek(15.0)]);

    probe.set_time(20.0);
    let outcome = session.on_frame(frame(10));
    assert_eq!(outcome.idle, Some(fretsync::IdleReason::NotPlaying));
    assert_relative_eq!(outcome.cursor.unwrap().x, 2000.0);
    for n in 11..20 {
        session.on_frame(frame(n));
    }
    assert_eq!(session.store().state().current_time, 20.0);
    assert!(!session.store().state().is_playing);
}
