//! Test helpers and fixtures for fretsync integration tests.
//!
//! Every collaborator records into shared state so a test can keep a probe
//! after handing the boxed collaborator to a session. Time is always driven
//! by hand.

#![allow(dead_code)]

pub mod tolerances;

use std::sync::Arc;
use std::time::Duration;

use fretsync::prelude::*;
use fretsync::{BeatMarker, BeatRef, Bounds, TimeReading};
use parking_lot::Mutex;

/// One 60 Hz frame.
pub const FRAME: Duration = Duration::from_millis(16);

/// Beat length of [`RowNotation`].
pub const BEAT_MS: f64 = 500.0;

/// Width of one beat box in [`RowNotation`].
pub const BEAT_WIDTH: f64 = 100.0;

/// Routes `tracing` output to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn frame(n: u64) -> Duration {
    FRAME * n as u32
}

/// Shared ordered log of pipeline stages.
pub type StageLog = Arc<Mutex<Vec<&'static str>>>;

pub fn stage_log() -> StageLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Time source whose reading the test sets directly.
#[derive(Default)]
pub struct ScriptedSource {
    reading: Mutex<Option<TimeReading>>,
}

impl ScriptedSource {
    /// Returns the concrete probe and the same allocation as a trait object.
    pub fn new(current_time: f64, duration: f64, is_playing: bool) -> (Arc<Self>, Arc<dyn TimeSource>) {
        let source = Arc::new(Self {
            reading: Mutex::new(Some(TimeReading {
                current_time,
                duration,
                is_playing,
            })),
        });
        let erased: Arc<dyn TimeSource> = Arc::clone(&source) as Arc<dyn TimeSource>;
        (source, erased)
    }

    pub fn set_time(&self, current_time: f64) {
        if let Some(reading) = self.reading.lock().as_mut() {
            reading.current_time = current_time;
        }
    }

    pub fn set_playing(&self, is_playing: bool) {
        if let Some(reading) = self.reading.lock().as_mut() {
            reading.is_playing = is_playing;
        }
    }
}

impl TimeSource for ScriptedSource {
    fn reading(&self) -> Option<TimeReading> {
        *self.reading.lock()
    }
}

/// One row of equal beats, `BEAT_MS` long and `BEAT_WIDTH` wide, starting at x = 0.
pub struct RowNotation {
    pub beats: u64,
    /// Beat ids whose bounds are not laid out yet.
    pub missing_bounds: Vec<u64>,
}

impl RowNotation {
    pub fn new(beats: u64) -> Self {
        Self {
            beats,
            missing_bounds: Vec::new(),
        }
    }

    pub fn missing(mut self, ids: &[u64]) -> Self {
        self.missing_bounds = ids.to_vec();
        self
    }
}

impl NotationLookup for RowNotation {
    fn find_beat(&self, _tracks: &[usize], time_ms: f64) -> Option<BeatRef> {
        if time_ms < 0.0 {
            return None;
        }
        let id = (time_ms / BEAT_MS) as u64;
        (id < self.beats).then(|| BeatRef {
            id,
            start_ms: id as f64 * BEAT_MS,
            duration_ms: BEAT_MS,
        })
    }

    fn find_bounds(&self, beat: &BeatRef) -> Option<Bounds> {
        (!self.missing_bounds.contains(&beat.id)).then(|| Bounds {
            x: beat.id as f64 * BEAT_WIDTH,
            y: 40.0,
            width: BEAT_WIDTH,
            height: 120.0,
        })
    }
}

#[derive(Default)]
pub struct ViewportState {
    pub metrics: ViewportMetrics,
    pub commands: Vec<ScrollCommand>,
}

/// Viewport that applies commands to its own metrics and records them.
#[derive(Clone)]
pub struct ProbeViewport {
    pub state: Arc<Mutex<ViewportState>>,
    log: Option<StageLog>,
}

impl ProbeViewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewportState {
                metrics: ViewportMetrics {
                    width,
                    height,
                    ..ViewportMetrics::default()
                },
                commands: Vec::new(),
            })),
            log: None,
        }
    }

    pub fn logging(mut self, log: &StageLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn commands(&self) -> Vec<ScrollCommand> {
        self.state.lock().commands.clone()
    }

    pub fn scroll_left(&self) -> f64 {
        self.state.lock().metrics.scroll_left
    }
}

impl ScrollViewport for ProbeViewport {
    fn metrics(&self) -> ViewportMetrics {
        self.state.lock().metrics
    }

    fn scroll(&mut self, command: ScrollCommand) {
        if let Some(log) = &self.log {
            log.lock().push("scroll");
        }
        let mut state = self.state.lock();
        if let Some(left) = command.left {
            state.metrics.scroll_left = left;
        }
        if let Some(top) = command.top {
            state.metrics.scroll_top = top;
        }
        state.commands.push(command);
    }
}

#[derive(Default)]
pub struct SurfaceState {
    pub cursor_moves: Vec<CursorPosition>,
    pub marker_draws: Vec<Vec<BeatMarker>>,
}

/// Render surface that records cursor moves and marker draws.
#[derive(Clone, Default)]
pub struct ProbeSurface {
    pub state: Arc<Mutex<SurfaceState>>,
    log: Option<StageLog>,
}

impl ProbeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logging(mut self, log: &StageLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn last_cursor(&self) -> Option<CursorPosition> {
        self.state.lock().cursor_moves.last().copied()
    }

    pub fn marker_draws(&self) -> usize {
        self.state.lock().marker_draws.len()
    }
}

impl RenderSurface for ProbeSurface {
    fn move_cursor(&mut self, position: CursorPosition) {
        if let Some(log) = &self.log {
            log.lock().push("cursor");
        }
        self.state.lock().cursor_moves.push(position);
    }

    fn draw_markers(&mut self, markers: &[BeatMarker]) {
        if let Some(log) = &self.log {
            log.lock().push("markers");
        }
        self.state.lock().marker_draws.push(markers.to_vec());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCall {
    Play,
    Pause,
    Stop,
    Toggle,
    Seek(f64),
    SetVolume(f64),
}

/// Transport that records every call.
#[derive(Default)]
pub struct RecordingControls {
    pub calls: Mutex<Vec<ControlCall>>,
}

impl RecordingControls {
    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().clone()
    }
}

impl PlaybackControls for RecordingControls {
    fn play(&self) {
        self.calls.lock().push(ControlCall::Play);
    }

    fn pause(&self) {
        self.calls.lock().push(ControlCall::Pause);
    }

    fn stop(&self) {
        self.calls.lock().push(ControlCall::Stop);
    }

    fn toggle(&self) {
        self.calls.lock().push(ControlCall::Toggle);
    }

    fn seek(&self, time: f64) {
        self.calls.lock().push(ControlCall::Seek(time));
    }

    fn set_volume(&self, volume: f64) {
        self.calls.lock().push(ControlCall::SetVolume(volume));
    }
}

/// Default config with the store applying updates in the same frame.
pub fn immediate_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.store.debounce_window_ms = 0;
    config
}
