//! The sync session: one context object owning the whole frame pipeline.
//!
//! Each frame runs in a fixed order with a single sample:
//!
//! ```text
//! TimeSource -> FrameSampler -> PlaybackStore -> CursorResolver -> AutoScroller
//!                                                     |                |
//!                                               RenderSurface     ScrollViewport
//! ```
//!
//! The store, resolver and scroller never see two different times within the
//! same frame.

use std::sync::Arc;
use std::time::Duration;

use fretsync_core::{
    beat_timing, cursor_pixel_position, BeatMarker, FramePoll, FrameSample, FrameSampler,
    IdleReason, MarkerCache, MarkerGranularity, PlaybackControls, PlaybackStore, SamplerHandle,
    SamplerOptions, StateUpdate, TimeReading, TimeSignature, TimeSource,
};
use fretsync_view::{
    AutoScroller, CursorPosition, CursorResolver, NotationLookup, RenderSurface, ResolveTrace,
    ScrollCommand, ScrollViewport,
};

use crate::config::SyncConfig;
use crate::{Error, Result};

#[cfg(feature = "graph")]
use fretsync_graph::{AudioGraphManager, AudioHost};
#[cfg(feature = "graph")]
use tokio::runtime::Handle;

/// Receives tempo changes and returns the tempo actually applied.
type TempoSink = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// What one call to [`SyncSession::on_frame`] did.
#[derive(Debug, Clone, Default)]
pub struct FrameOutcome {
    pub sample: Option<FrameSample>,
    pub idle: Option<IdleReason>,
    /// Store observers were notified during this frame.
    pub notified: bool,
    pub cursor: Option<CursorPosition>,
    /// Lookup path, when a notation lookup is attached.
    pub trace: Option<ResolveTrace>,
    pub scroll: Option<ScrollCommand>,
}

/// Owns the playback store, sampler, cursor resolver, auto-scroller and
/// marker cache, plus the host collaborators they feed.
pub struct SyncSession {
    store: Arc<PlaybackStore>,
    sampler: FrameSampler,
    resolver: CursorResolver,
    scroller: AutoScroller,
    markers: MarkerCache,
    drawn_markers: Option<Arc<[BeatMarker]>>,
    bpm: f64,
    time_signature: TimeSignature,
    timeline_width: Option<f64>,
    tracks: Vec<usize>,
    notation: Option<Box<dyn NotationLookup + Send>>,
    viewport: Option<Box<dyn ScrollViewport>>,
    surface: Option<Box<dyn RenderSurface>>,
    tempo_sink: Option<TempoSink>,
    idle_reported: bool,
    paused_at: Option<TimeReading>,
    frames: u64,
    disposed: bool,
}

impl SyncSession {
    pub fn builder() -> SyncSessionBuilder {
        SyncSessionBuilder::default()
    }

    /// Runs one frame of the pipeline at `now`.
    ///
    /// Pending store windows are flushed even when no sample is taken, so a
    /// burst of updates settles after playback pauses.
    pub fn on_frame(&mut self, now: Duration) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();
        if self.disposed {
            return outcome;
        }
        self.frames += 1;

        // A paused track still shapes markers and the cursor; it is pushed
        // whenever its reading changes, e.g. after a seek while paused.
        let mut paused_view = None;
        match self.sampler.poll(now) {
            FramePoll::Sampled(sample) => {
                self.idle_reported = false;
                self.paused_at = None;
                self.store.update_state(Self::reading_update(&sample), now);
                outcome.sample = Some(sample);
            }
            FramePoll::Idle(reason) => {
                match self.sampler.paused_reading() {
                    Some(reading) if reason == IdleReason::NotPlaying => {
                        self.idle_reported = true;
                        if self.paused_at != Some(reading) {
                            self.paused_at = Some(reading);
                            let sample = FrameSample::from_reading(reading, now);
                            self.store.update_state(Self::reading_update(&sample), now);
                            paused_view = Some(sample);
                        }
                    }
                    _ => {
                        // A vanished source counts as not playing. Report the
                        // transition once, not every frame.
                        let halted =
                            matches!(reason, IdleReason::NotPlaying | IdleReason::NoSource);
                        if halted && !self.idle_reported {
                            self.idle_reported = true;
                            self.paused_at = None;
                            self.store
                                .update_state(StateUpdate::new().playing(false), now);
                        }
                    }
                }
                outcome.idle = Some(reason);
            }
            FramePoll::Stopped => {}
        }
        outcome.notified = self.store.flush_due(now);

        let view = outcome.sample.or(paused_view);
        if view.is_some() || outcome.notified {
            if let Err(err) = self.markers() {
                tracing::warn!(%err, "Failed to regenerate beat markers");
            }
        }
        let Some(sample) = view else {
            return outcome;
        };

        match self.notation.as_deref() {
            Some(notation) => {
                let resolution =
                    self.resolver
                        .resolve(notation, &self.tracks, sample.current_time_ms());
                tracing::trace!(trace = %resolution.trace, "Resolved cursor");
                outcome.cursor = resolution.position;
                outcome.trace = Some(resolution.trace);
            }
            None => outcome.cursor = self.timeline_cursor(&sample),
        }

        if let Some(position) = outcome.cursor {
            if let Some(surface) = self.surface.as_mut() {
                surface.move_cursor(position);
            }
            if let Some(viewport) = self.viewport.as_mut() {
                outcome.scroll = self.scroller.follow(position.x, &viewport.metrics());
                if let Some(command) = outcome.scroll {
                    viewport.scroll(command);
                }
            }
        }

        outcome
    }

    fn reading_update(sample: &FrameSample) -> StateUpdate {
        StateUpdate::new()
            .playing(sample.is_playing)
            .loaded(sample.duration > 0.0)
            .current_time(sample.current_time)
            .duration(sample.duration)
    }

    /// Cursor on a plain timeline when no notation is attached.
    fn timeline_cursor(&self, sample: &FrameSample) -> Option<CursorPosition> {
        let width = self.layout_width();
        if width <= 0.0 {
            return None;
        }
        let height = self
            .viewport
            .as_ref()
            .map_or(0.0, |viewport| viewport.metrics().height);
        Some(CursorPosition {
            x: cursor_pixel_position(sample.current_time, sample.duration, width),
            y: 0.0,
            height,
        })
    }

    /// Width the marker overlay and timeline cursor are laid out across.
    pub fn layout_width(&self) -> f64 {
        self.timeline_width
            .or_else(|| self.viewport.as_ref().map(|viewport| viewport.metrics().width))
            .unwrap_or(0.0)
    }

    /// Beat markers for the current duration, layout width, tempo and meter.
    ///
    /// The list is rebuilt only when one of those inputs changed; a rebuilt
    /// list is pushed to the render surface.
    pub fn markers(&mut self) -> Result<Arc<[BeatMarker]>> {
        self.ensure_live()?;
        let duration = self.store.state().duration;
        let width = self.layout_width();
        let markers = self
            .markers
            .markers(duration, width, self.bpm, self.time_signature)?;

        let unchanged = self
            .drawn_markers
            .as_ref()
            .is_some_and(|drawn| Arc::ptr_eq(drawn, &markers));
        if !unchanged {
            if let Some(surface) = self.surface.as_mut() {
                surface.draw_markers(&markers);
            }
            self.drawn_markers = Some(Arc::clone(&markers));
        }
        Ok(markers)
    }

    /// Sets the tempo used for markers. With a graph attached, the graph's
    /// clamped tempo is adopted and returned.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<f64> {
        self.ensure_live()?;
        beat_timing(bpm, self.time_signature)?;
        let applied = match &self.tempo_sink {
            Some(sink) => sink(bpm),
            None => bpm,
        };
        self.bpm = applied;
        Ok(applied)
    }

    pub fn tempo(&self) -> f64 {
        self.bpm
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) -> Result<()> {
        self.ensure_live()?;
        beat_timing(self.bpm, time_signature)?;
        self.time_signature = time_signature;
        Ok(())
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn set_granularity(&mut self, granularity: MarkerGranularity) {
        self.markers.set_granularity(granularity);
    }

    /// Overrides the layout width; `None` follows the viewport width.
    pub fn set_timeline_width(&mut self, width: Option<f64>) {
        self.timeline_width = width;
    }

    /// Swaps in a new score. The cursor starts over from "no position".
    pub fn load_notation(&mut self, notation: Box<dyn NotationLookup + Send>, tracks: Vec<usize>) {
        self.notation = Some(notation);
        self.tracks = tracks;
        self.resolver.reset();
        self.markers.invalidate();
    }

    pub fn set_tracks(&mut self, tracks: Vec<usize>) {
        self.tracks = tracks;
    }

    /// Jumps the viewport to a clicked point and seeks to the matching time.
    ///
    /// `x` is in layout coordinates. Returns the seek time, or `None` before
    /// a track with a duration is loaded.
    pub fn click_to_seek(&mut self, x: f64, y: f64) -> Option<f64> {
        let width = self.layout_width();
        let duration = self.store.state().duration;
        if width <= 0.0 || duration <= 0.0 || !x.is_finite() {
            tracing::debug!(x, width, duration, "Click ignored, nothing to seek");
            return None;
        }

        if let Some(viewport) = self.viewport.as_mut() {
            let command = self
                .scroller
                .scroll_to_position(x, y, true, true, &viewport.metrics());
            viewport.scroll(command);
        }

        let time = (x / width).clamp(0.0, 1.0) * duration;
        self.store.seek(time);
        Some(time)
    }

    pub fn play(&self) {
        self.store.play();
    }

    pub fn pause(&self) {
        self.store.pause();
    }

    pub fn stop(&self) {
        self.store.stop();
    }

    pub fn toggle(&self) {
        self.store.toggle();
    }

    pub fn seek(&self, time: f64) {
        self.store.seek(time);
    }

    pub fn set_volume(&self, volume: f64) {
        self.store.set_volume(volume);
    }

    pub fn start_sampling(&self) -> bool {
        self.sampler.start()
    }

    pub fn stop_sampling(&self) -> bool {
        self.sampler.stop()
    }

    pub fn sampler_handle(&self) -> SamplerHandle {
        self.sampler.handle()
    }

    pub fn set_source(&mut self, source: &Arc<dyn TimeSource>) {
        self.sampler.set_source(source);
    }

    pub fn store(&self) -> &Arc<PlaybackStore> {
        &self.store
    }

    pub fn resolver(&self) -> &CursorResolver {
        &self.resolver
    }

    pub fn scroller_mut(&mut self) -> &mut AutoScroller {
        &mut self.scroller
    }

    /// Frames run since the session was built.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn marker_regenerations(&self) -> u64 {
        self.markers.regenerations()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    /// Stops sampling, drops collaborators and returns the store to idle.
    /// Later frames are no-ops. Calling it twice is harmless.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.sampler.stop();
        self.sampler.clear_source();
        self.store.clear_controls();
        self.store.reset();
        self.resolver.reset();
        self.markers.invalidate();
        self.drawn_markers = None;
        self.notation = None;
        self.viewport = None;
        self.surface = None;
        self.tempo_sink = None;

        tracing::info!(frames = self.frames, "Sync session disposed");
    }
}

/// Builder for [`SyncSession`].
///
/// # Example
///
/// ```ignore
/// let session = SyncSession::builder()
///     .config(SyncConfig::default())
///     .time_source(&source)
///     .viewport(Box::new(viewport))
///     .build()?;
/// ```
#[derive(Default)]
pub struct SyncSessionBuilder {
    config: SyncConfig,
    source: Option<Arc<dyn TimeSource>>,
    controls: Option<Arc<dyn PlaybackControls>>,
    notation: Option<Box<dyn NotationLookup + Send>>,
    tracks: Vec<usize>,
    viewport: Option<Box<dyn ScrollViewport>>,
    surface: Option<Box<dyn RenderSurface>>,
    timeline_width: Option<f64>,
    tempo_sink: Option<TempoSink>,
    start: bool,
}

impl SyncSessionBuilder {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Clock to sample. The session keeps only a weak reference; once every
    /// owner drops it, frames report [`IdleReason::NoSource`].
    pub fn time_source(mut self, source: &Arc<dyn TimeSource>) -> Self {
        self.source = Some(Arc::clone(source));
        self
    }

    pub fn controls(mut self, controls: Arc<dyn PlaybackControls>) -> Self {
        self.controls = Some(controls);
        self
    }

    pub fn notation(mut self, notation: Box<dyn NotationLookup + Send>) -> Self {
        self.notation = Some(notation);
        self
    }

    pub fn tracks(mut self, tracks: Vec<usize>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn viewport(mut self, viewport: Box<dyn ScrollViewport>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn surface(mut self, surface: Box<dyn RenderSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn timeline_width(mut self, width: f64) -> Self {
        self.timeline_width = Some(width);
        self
    }

    /// Start sampling as soon as the session is built.
    pub fn start(mut self, start: bool) -> Self {
        self.start = start;
        self
    }

    /// Uses `graph` as the time source, the transport and the tempo owner.
    /// Async transport calls are spawned on `runtime`.
    #[cfg(feature = "graph")]
    pub fn graph<H: AudioHost>(mut self, graph: &Arc<AudioGraphManager<H>>, runtime: Handle) -> Self {
        let source: Arc<dyn TimeSource> = Arc::clone(graph) as Arc<dyn TimeSource>;
        self.source = Some(source);
        self.controls = Some(Arc::new(crate::controls::GraphControls::new(
            Arc::clone(graph),
            runtime,
        )));
        let tempo_graph = Arc::clone(graph);
        self.tempo_sink = Some(Arc::new(move |bpm| tempo_graph.set_tempo(bpm)));
        self
    }

    pub fn build(self) -> Result<SyncSession> {
        let config = self.config;
        config.validate()?;

        let store = Arc::new(PlaybackStore::new(&config.store));
        if let Some(controls) = self.controls {
            store.register_controls(controls);
        }

        let mut sampler = FrameSampler::new(SamplerOptions::from(&config.frame));
        if let Some(source) = &self.source {
            sampler.set_source(source);
        }
        if self.start {
            sampler.start();
        }

        let bpm = match &self.tempo_sink {
            Some(sink) => sink(config.timing.bpm),
            None => config.timing.bpm,
        };

        tracing::debug!(
            bpm,
            time_signature = ?config.timing.time_signature,
            notation = self.notation.is_some(),
            viewport = self.viewport.is_some(),
            "Built sync session"
        );

        Ok(SyncSession {
            store,
            sampler,
            resolver: CursorResolver::new(config.timing.anchor),
            scroller: AutoScroller::new(&config.scroll),
            markers: MarkerCache::new(config.timing.granularity),
            drawn_markers: None,
            bpm,
            time_signature: config.timing.time_signature,
            timeline_width: self.timeline_width,
            tracks: self.tracks,
            notation: self.notation,
            viewport: self.viewport,
            surface: self.surface,
            tempo_sink: self.tempo_sink,
            idle_reported: false,
            paused_at: None,
            frames: 0,
            disposed: false,
        })
    }
}
