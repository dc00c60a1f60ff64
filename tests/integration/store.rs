//! Store behavior as seen through a running session.

use std::sync::Arc;

use approx::assert_relative_eq;
use fretsync::prelude::*;
use fretsync::IdleReason;
use parking_lot::Mutex;
use proptest::prelude::*;

use crate::helpers::tolerances::{STORE_TOLERANCE, TIME_EPSILON};
use crate::helpers::*;

fn every_frame_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.frame.min_interval_ms = 0;
    config
}

#[test]
fn test_transport_without_controls_is_safe() {
    let session = SyncSession::builder().build().unwrap();

    session.play();
    session.toggle();
    session.seek(2.0);
    session.set_volume(0.5);

    assert!(!session.store().has_controls());
    assert_eq!(session.store().unhandled_control_calls(), 4);
    assert_eq!(session.store().state(), PlaybackState::default());
    assert_eq!(session.store().transitions(), 0);
}

#[test]
fn test_transport_reaches_registered_controls() {
    let controls = Arc::new(RecordingControls::default());
    let session = SyncSession::builder()
        .controls(Arc::clone(&controls) as Arc<dyn PlaybackControls>)
        .build()
        .unwrap();

    session.play();
    session.seek(-3.0);
    session.set_volume(1.7);
    session.stop();

    assert_eq!(
        controls.calls(),
        vec![
            ControlCall::Play,
            ControlCall::Seek(0.0),
            ControlCall::SetVolume(1.0),
            ControlCall::Stop,
        ]
    );
}

#[test]
fn test_stalled_clock_is_deduplicated() {
    let (_probe, source) = ScriptedSource::new(1.0, 10.0, true);
    let mut session = SyncSession::builder()
        .config(every_frame_config())
        .time_source(&source)
        .start(true)
        .build()
        .unwrap();

    for n in 0..10 {
        session.on_frame(frame(n));
    }

    let store = session.store();
    assert_eq!(store.accepted_updates(), 1);
    assert_eq!(store.discarded_duplicates(), 9);
    assert_eq!(store.transitions(), 1);
}

#[test]
fn test_sub_tolerance_drift_is_not_published() {
    let (probe, source) = ScriptedSource::new(1.0, 10.0, true);
    let mut session = SyncSession::builder()
        .config(every_frame_config())
        .time_source(&source)
        .start(true)
        .build()
        .unwrap();
    let notified = Arc::new(Mutex::new(Vec::new()));
    {
        let notified = Arc::clone(&notified);
        session
            .store()
            .subscribe(move |state| notified.lock().push(state.current_time));
    }

    // 1 ms of media time per 16 ms frame
    let mut run = |from: u64, to: u64| {
        for n in from..=to {
            probe.set_time(1.0 + n as f64 * 0.001);
            session.on_frame(frame(n));
        }
    };

    run(0, 14);
    // Second window only moved 7 ms
    assert_eq!(notified.lock().len(), 1);
    assert_relative_eq!(notified.lock()[0], 1.006, epsilon = TIME_EPSILON);

    run(15, 21);
    let times = notified.lock().clone();
    assert_eq!(times.len(), 2);
    assert_relative_eq!(times[1], 1.020, epsilon = TIME_EPSILON);
}

#[test]
fn test_pause_and_resume_reach_store() {
    let (probe, source) = ScriptedSource::new(1.0, 10.0, true);
    let mut session = SyncSession::builder()
        .config(immediate_config())
        .time_source(&source)
        .start(true)
        .build()
        .unwrap();

    session.on_frame(frame(0));
    assert!(session.store().state().is_playing);

    probe.set_playing(false);
    for n in 1..6 {
        let outcome = session.on_frame(frame(n * 2));
        assert_eq!(outcome.idle, Some(IdleReason::NotPlaying));
    }
    let state = session.store().state();
    assert!(!state.is_playing);
    assert_eq!(state.current_time, 1.0);
    assert_eq!(session.store().accepted_updates(), 2);

    probe.set_playing(true);
    probe.set_time(1.5);
    let outcome = session.on_frame(frame(20));
    assert!(outcome.sample.is_some());
    assert!(session.store().state().is_playing);
    assert_eq!(session.store().state().current_time, 1.5);
}

#[test]
fn test_dropped_source_goes_idle() {
    let (probe, source) = ScriptedSource::new(1.0, 10.0, true);
    let mut session = SyncSession::builder()
        .config(immediate_config())
        .time_source(&source)
        .start(true)
        .build()
        .unwrap();
    assert!(session.on_frame(frame(0)).sample.is_some());
    assert!(session.store().state().is_playing);

    drop(probe);
    drop(source);
    let outcome = session.on_frame(frame(2));
    assert_eq!(outcome.idle, Some(IdleReason::NoSource));
    assert!(!session.store().state().is_playing);
}

proptest! {
    #[test]
    fn prop_published_states_always_differ(
        readings in prop::collection::vec((0.0f64..5.0, any::<bool>()), 1..120)
    ) {
        let (probe, source) = ScriptedSource::new(0.0, 5.0, false);
        let mut config = every_frame_config();
        config.frame.only_when_playing = false;
        let mut session = SyncSession::builder()
            .config(config)
            .time_source(&source)
            .start(true)
            .build()
            .unwrap();

        let published = Arc::new(Mutex::new(vec![PlaybackState::default()]));
        {
            let published = Arc::clone(&published);
            session.store().subscribe(move |state| published.lock().push(*state));
        }

        for (n, (time, playing)) in readings.iter().enumerate() {
            probe.set_time(*time);
            probe.set_playing(*playing);
            session.on_frame(frame(n as u64));
        }
        session.store().flush();

        let published = published.lock();
        for pair in published.windows(2) {
            prop_assert!(pair[1].differs_from(&pair[0], STORE_TOLERANCE));
        }
    }
}
