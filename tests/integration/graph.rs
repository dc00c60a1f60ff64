//! A session driven by the audio graph manager on the headless host.

use std::sync::Arc;

use approx::assert_relative_eq;
use fretsync::graph::{AudioContext, GraphState, NodeKind, MAX_TEMPO};
use fretsync::prelude::*;
use fretsync::{GraphEventKind, IdleReason};
use tokio::runtime::Handle;

use crate::helpers::*;

fn graph(host: &HeadlessHost) -> Arc<AudioGraphManager<HeadlessHost>> {
    Arc::new(AudioGraphManager::new(host.clone(), AudioGraphConfig::default()).unwrap())
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    while !done() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_session_follows_graph_clock() {
    init_tracing();
    let host = HeadlessHost::new();
    let graph = graph(&host);
    graph.set_duration(30.0);

    let mut session = SyncSession::builder()
        .config(immediate_config())
        .graph(&graph, Handle::current())
        .timeline_width(3000.0)
        .start(true)
        .build()
        .unwrap();

    // Nothing initialized yet: the graph reports no reading
    assert_eq!(session.on_frame(frame(0)).idle, Some(IdleReason::NotPlaying));

    session.play();
    wait_until(|| graph.is_playing()).await;
    let context = host.last_context().unwrap();

    context.advance(2.0);
    let outcome = session.on_frame(frame(2));
    let sample = outcome.sample.unwrap();
    assert_relative_eq!(sample.current_time, 2.0);
    assert_relative_eq!(outcome.cursor.unwrap().x, 200.0);
    let state = session.store().state();
    assert!(state.is_playing);
    assert_eq!(state.duration, 30.0);

    session.pause();
    context.advance(1.0);
    assert_eq!(session.on_frame(frame(4)).idle, Some(IdleReason::NotPlaying));
    assert!(!session.store().state().is_playing);
    assert_relative_eq!(graph.position(), 2.0);

    session.seek(10.0);
    session.play();
    wait_until(|| graph.is_playing()).await;
    context.advance(0.5);
    let outcome = session.on_frame(frame(6));
    assert_relative_eq!(outcome.sample.unwrap().current_time, 10.5);
}

#[tokio::test]
async fn test_tempo_adopts_graph_clamp() {
    let host = HeadlessHost::new();
    let graph = graph(&host);
    let mut config = SyncConfig::default();
    config.timing.bpm = 40.0;

    let mut session = SyncSession::builder()
        .config(config)
        .graph(&graph, Handle::current())
        .build()
        .unwrap();

    assert_eq!(session.tempo(), 60.0);
    assert_eq!(session.set_tempo(320.0).unwrap(), MAX_TEMPO);
    assert_eq!(graph.tempo(), MAX_TEMPO);
    assert!(session.set_tempo(f64::NAN).is_err());
    assert_eq!(graph.tempo(), MAX_TEMPO);
}

#[tokio::test]
async fn test_volume_and_toggle_route_to_graph() {
    let host = HeadlessHost::running();
    let graph = graph(&host);
    let session = SyncSession::builder()
        .graph(&graph, Handle::current())
        .build()
        .unwrap();

    session.set_volume(1.4);
    assert_eq!(graph.volume(), 1.0);

    let events = graph.events().subscribe();
    session.toggle();
    wait_until(|| graph.is_playing()).await;
    session.toggle();
    assert!(!graph.is_playing());

    let kinds: Vec<GraphEventKind> = events.try_iter().map(|event| event.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            GraphEventKind::Initialized,
            GraphEventKind::Started,
            GraphEventKind::Paused,
        ]
    );
}

#[tokio::test]
async fn test_failed_start_leaves_session_idle() {
    init_tracing();
    let host = HeadlessHost::new();
    host.fail_next_context("no output device");
    let graph = graph(&host);
    let mut session = SyncSession::builder()
        .config(immediate_config())
        .graph(&graph, Handle::current())
        .start(true)
        .build()
        .unwrap();
    let events = graph.events().subscribe();

    session.play();
    wait_until(|| !events.is_empty()).await;
    assert!(matches!(
        events.try_recv(),
        Ok(GraphEvent::Error { message }) if message.contains("no output device")
    ));
    assert_eq!(graph.state(), GraphState::Uninitialized);
    assert!(session.on_frame(frame(0)).sample.is_none());
}

#[tokio::test]
async fn test_session_dispose_keeps_graph_alive() {
    let host = HeadlessHost::new();
    let graph = graph(&host);
    let mut session = SyncSession::builder()
        .graph(&graph, Handle::current())
        .build()
        .unwrap();
    assert_eq!(Arc::strong_count(&graph), 3);

    session.dispose();
    assert!(!session.store().has_controls());
    assert_eq!(Arc::strong_count(&graph), 1);

    graph.start().await.unwrap();
    assert!(graph.is_playing());
}

#[tokio::test]
async fn test_graph_built_from_config_section() {
    let config = SyncConfig::from_toml_str(
        "[graph]\nsample_rate = 48000\nenable_effects = false\n\n[store]\ndebounce_window_ms = 0\n",
    )
    .unwrap();
    let host = HeadlessHost::new();
    let graph = config.graph_manager(host.clone()).unwrap();
    assert_eq!(graph.config().sample_rate, 48000);

    let mut session = SyncSession::builder()
        .config(config)
        .graph(&graph, Handle::current())
        .start(true)
        .build()
        .unwrap();
    session.play();
    wait_until(|| graph.is_playing()).await;

    let context = host.last_context().unwrap();
    assert_eq!(context.sample_rate(), 48000);
    let gain = context.find_node(NodeKind::Gain).unwrap();
    assert_eq!(
        context.signal_path(gain),
        vec![NodeKind::Gain, NodeKind::Analyser { fft_size: 2048 }]
    );
    assert!(session.on_frame(frame(0)).sample.is_some());
}

#[test]
fn test_invalid_graph_section_is_rejected() {
    let err = SyncConfig::from_toml_str("[graph]\nbuffer_size = 500\n").unwrap_err();
    assert!(matches!(err, fretsync::Error::Core(_) | fretsync::Error::Graph(_)));
}
