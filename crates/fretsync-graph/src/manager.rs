//! Audio graph lifecycle and transport.
//!
//! ```text
//! Uninitialized --initialize()--> Initializing --ok--> Ready --dispose()--> Disposed
//!       ^                              |
//!       +------------err---------------+
//! ```
//!
//! `Ready` carries its own transport (`Playing`/`Paused`/`Stopped`); the
//! elapsed position is derived from the context timeline so it is the clock
//! the frame sampler reads.
//!
//! Host calls that await (context creation, resume) never run under the
//! state lock. Each `dispose()` bumps an epoch; an initialization that
//! completes under an older epoch closes its context and returns quietly.

use std::sync::atomic::{AtomicU64, Ordering};

use fretsync_core::{AtomicDouble, TimeReading, TimeSource};
use parking_lot::Mutex;

use crate::config::AudioGraphConfig;
use crate::effects::{self, Effect, EffectsChain};
use crate::error::{Error, HostError, Result};
use crate::events::{EventBus, GraphEvent, GraphEventKind, ListenerId};
use crate::host::{
    AudioContext, AudioHost, AudioParam, ContextState, Endpoint, NodeId, NodeKind, ParamChange,
};

pub const MIN_TEMPO: f64 = 60.0;
pub const MAX_TEMPO: f64 = 200.0;
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Gain changes ramp over this long to avoid clicks.
pub const VOLUME_RAMP_SECONDS: f64 = 0.015;

pub const ANALYSER_FFT_SIZE: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// Read-only view of the processing context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextInfo {
    pub sample_rate: u32,
    pub current_time: f64,
    pub state: ContextState,
}

struct BuiltGraph<C> {
    context: C,
    gain: NodeId,
    chain: Option<EffectsChain>,
    analyser: Option<NodeId>,
}

/// Playback position as an offset plus the context time playback resumed at.
#[derive(Debug, Clone, Copy, Default)]
struct Position {
    offset: f64,
    resumed_at: Option<f64>,
}

impl Position {
    fn elapsed(&self, context_time: f64) -> f64 {
        match self.resumed_at {
            Some(resumed_at) => self.offset + (context_time - resumed_at).max(0.0),
            None => self.offset,
        }
    }
}

struct GraphInner<C> {
    state: GraphState,
    transport: Transport,
    graph: Option<BuiltGraph<C>>,
    position: Position,
}

/// Owns the processing graph: gain, optional effects chain, optional analyser.
pub struct AudioGraphManager<H: AudioHost> {
    host: H,
    config: AudioGraphConfig,
    inner: Mutex<GraphInner<H::Context>>,
    init_lock: tokio::sync::Mutex<()>,
    epoch: AtomicU64,
    events: EventBus,
    volume: AtomicDouble,
    tempo: AtomicDouble,
    duration: AtomicDouble,
}

impl<H: AudioHost> AudioGraphManager<H> {
    pub fn new(host: H, config: AudioGraphConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            host,
            config,
            inner: Mutex::new(GraphInner {
                state: GraphState::Uninitialized,
                transport: Transport::Stopped,
                graph: None,
                position: Position::default(),
            }),
            init_lock: tokio::sync::Mutex::new(()),
            epoch: AtomicU64::new(0),
            events: EventBus::new(),
            volume: AtomicDouble::new(1.0),
            tempo: AtomicDouble::new(DEFAULT_TEMPO),
            duration: AtomicDouble::new(0.0),
        })
    }

    pub fn config(&self) -> &AudioGraphConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn state(&self) -> GraphState {
        self.inner.lock().state
    }

    pub fn transport(&self) -> Transport {
        self.inner.lock().transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport() == Transport::Playing
    }

    pub fn volume(&self) -> f64 {
        self.volume.get()
    }

    pub fn tempo(&self) -> f64 {
        self.tempo.get()
    }

    pub fn duration(&self) -> f64 {
        self.duration.get()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn on<F>(&self, kind: GraphEventKind, listener: F) -> ListenerId
    where
        F: Fn(&GraphEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn off(&self, kind: GraphEventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }

    /// Builds the graph. All-or-nothing: on failure the context is closed, an
    /// `Error` event is emitted and the manager stays `Uninitialized`.
    ///
    /// Returns `Ok(())` without building anything if the manager was disposed
    /// while the context was being created.
    pub async fn initialize(&self) -> Result<()> {
        let _serialized = self.init_lock.lock().await;

        let epoch = {
            let mut inner = self.inner.lock();
            match inner.state {
                GraphState::Ready => return Ok(()),
                GraphState::Disposed => return Err(Error::Disposed),
                GraphState::Uninitialized | GraphState::Initializing => {}
            }
            inner.state = GraphState::Initializing;
            self.epoch.load(Ordering::Acquire)
        };

        let context = match self.host.create_context(&self.config).await {
            Ok(context) => context,
            Err(err) => return self.fail_initialization(epoch, err, None),
        };

        if self.epoch.load(Ordering::Acquire) != epoch {
            tracing::debug!("Graph disposed during initialization; discarding new context");
            context.close();
            return Ok(());
        }

        let graph = match self.build(&context) {
            Ok(graph) => graph,
            Err(err) => return self.fail_initialization(epoch, err, Some(&context)),
        };

        {
            let mut inner = self.inner.lock();
            if inner.state == GraphState::Disposed || self.epoch.load(Ordering::Acquire) != epoch {
                drop(inner);
                context.close();
                return Ok(());
            }
            inner.graph = Some(graph);
            inner.state = GraphState::Ready;
        }

        tracing::info!(
            sample_rate = self.config.sample_rate,
            effects = self.config.enable_effects,
            analysis = self.config.enable_analysis,
            "Audio graph initialized"
        );
        self.events.emit(GraphEvent::Initialized {
            sample_rate: context.sample_rate(),
        });
        Ok(())
    }

    // gain -> [eq low -> eq mid -> eq high -> compressor -> delay -> reverb] -> [analyser] -> out
    fn build(&self, context: &H::Context) -> std::result::Result<BuiltGraph<H::Context>, HostError> {
        let gain = context.create_node(NodeKind::Gain)?;
        context.schedule_param(
            gain,
            AudioParam::Gain,
            ParamChange::immediate(self.volume.get(), context.current_time()),
        )?;

        let mut tail = gain;
        let chain = if self.config.enable_effects {
            let (chain, input, output) = EffectsChain::build(context)?;
            context.connect(tail, Endpoint::Node(input))?;
            tail = output;
            Some(chain)
        } else {
            None
        };

        let analyser = if self.config.enable_analysis {
            let analyser = context.create_node(NodeKind::Analyser {
                fft_size: ANALYSER_FFT_SIZE,
            })?;
            context.connect(tail, Endpoint::Node(analyser))?;
            tail = analyser;
            Some(analyser)
        } else {
            None
        };

        context.connect(tail, Endpoint::Destination)?;

        Ok(BuiltGraph {
            context: context.clone(),
            gain,
            chain,
            analyser,
        })
    }

    fn fail_initialization(
        &self,
        epoch: u64,
        err: HostError,
        context: Option<&H::Context>,
    ) -> Result<()> {
        if let Some(context) = context {
            context.close();
        }

        {
            let mut inner = self.inner.lock();
            if inner.state == GraphState::Disposed || self.epoch.load(Ordering::Acquire) != epoch {
                tracing::debug!(error = %err, "Initialization failed after dispose; ignoring");
                return Ok(());
            }
            inner.state = GraphState::Uninitialized;
        }

        tracing::error!(error = %err, "Audio graph initialization failed");
        self.events.emit(GraphEvent::Error {
            message: err.to_string(),
        });
        Err(err.into())
    }

    /// Starts playback, initializing the graph first if needed and resuming a
    /// suspended context.
    pub async fn start(&self) -> Result<()> {
        if self.state() != GraphState::Ready {
            self.initialize().await?;
        }

        let (context, epoch) = {
            let inner = self.inner.lock();
            match (&inner.state, &inner.graph) {
                (GraphState::Ready, Some(graph)) => {
                    (graph.context.clone(), self.epoch.load(Ordering::Acquire))
                }
                // Disposed while initializing
                (GraphState::Disposed, _) => return Ok(()),
                _ => return Err(Error::NotInitialized),
            }
        };

        if context.state() == ContextState::Suspended {
            if let Err(err) = context.resume().await {
                if self.state() == GraphState::Disposed
                    || self.epoch.load(Ordering::Acquire) != epoch
                {
                    tracing::debug!(error = %err, "Resume failed after dispose; ignoring");
                    return Ok(());
                }
                return Err(err.into());
            }
        }

        {
            let mut inner = self.inner.lock();
            if inner.state != GraphState::Ready {
                return Ok(());
            }
            if inner.transport == Transport::Playing {
                return Ok(());
            }
            inner.position.resumed_at = Some(context.current_time());
            inner.transport = Transport::Playing;
        }

        tracing::debug!("Playback started");
        self.events.emit(GraphEvent::Started);
        Ok(())
    }

    /// Halts playback, keeping the position.
    pub fn pause(&self) {
        if self.halt(Transport::Paused) {
            self.events.emit(GraphEvent::Paused);
        }
    }

    /// Halts playback and rewinds to the start.
    pub fn stop(&self) {
        if self.halt(Transport::Stopped) {
            self.events.emit(GraphEvent::Stopped);
        }
    }

    fn halt(&self, to: Transport) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != GraphState::Ready || inner.transport == to {
            return false;
        }
        if to == Transport::Paused && inner.transport == Transport::Stopped {
            return false;
        }

        let now = Self::context_time(&inner);
        inner.position = match to {
            Transport::Stopped => Position::default(),
            _ => Position {
                offset: inner.position.elapsed(now),
                resumed_at: None,
            },
        };
        inner.transport = to;
        true
    }

    /// Moves the playback position. Clamped to `[0, duration]` when a
    /// duration is known.
    pub fn seek(&self, seconds: f64) {
        if !seconds.is_finite() {
            tracing::warn!(seconds, "Ignoring seek to non-finite position");
            return;
        }
        let duration = self.duration.get();
        let target = if duration > 0.0 {
            seconds.clamp(0.0, duration)
        } else {
            seconds.max(0.0)
        };

        let mut inner = self.inner.lock();
        let now = Self::context_time(&inner);
        inner.position.offset = target;
        if inner.position.resumed_at.is_some() {
            inner.position.resumed_at = Some(now);
        }
    }

    /// Length of the loaded track.
    pub fn set_duration(&self, seconds: f64) {
        if seconds.is_finite() {
            self.duration.set(seconds.max(0.0));
        }
    }

    /// Sets the output gain, clamped to `[0, 1]`. The change is scheduled on
    /// the context timeline as a short ramp. Returns the applied volume.
    pub fn set_volume(&self, volume: f64) -> f64 {
        if !volume.is_finite() {
            tracing::warn!(volume, "Ignoring non-finite volume");
            return self.volume.get();
        }
        let volume = volume.clamp(0.0, 1.0);
        self.volume.set(volume);

        let disposed = {
            let inner = self.inner.lock();
            if let Some(graph) = &inner.graph {
                let change =
                    ParamChange::ramped(volume, graph.context.current_time(), VOLUME_RAMP_SECONDS);
                if let Err(err) = graph.context.schedule_param(graph.gain, AudioParam::Gain, change) {
                    tracing::warn!(error = %err, "Failed to schedule gain change");
                }
            }
            inner.state == GraphState::Disposed
        };

        if !disposed {
            self.events.emit(GraphEvent::VolumeChanged { volume });
        }
        volume
    }

    /// Sets the tempo used for beat math, clamped to `[60, 200]` BPM. Does
    /// not time-stretch audio. Returns the applied tempo.
    pub fn set_tempo(&self, bpm: f64) -> f64 {
        if !bpm.is_finite() {
            tracing::warn!(bpm, "Ignoring non-finite tempo");
            return self.tempo.get();
        }
        let bpm = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        self.tempo.set(bpm);
        if self.state() != GraphState::Disposed {
            self.events.emit(GraphEvent::TempoChanged { bpm });
        }
        bpm
    }

    /// Applies `effect` to its chain stage.
    ///
    /// Returns `Ok(false)` when the current chain has no stage for the kind
    /// (distortion, or effects disabled in the config).
    pub fn apply_effect(&self, effect: &Effect) -> Result<bool> {
        {
            let inner = self.inner.lock();
            let graph = match (inner.state, &inner.graph) {
                (GraphState::Disposed, _) => return Err(Error::Disposed),
                (GraphState::Ready, Some(graph)) => graph,
                _ => return Err(Error::NotInitialized),
            };

            let chain = match &graph.chain {
                Some(chain) if effects::has_stage(effect.kind) => chain,
                _ => {
                    tracing::warn!(effect = %effect.kind, "Effect not supported by the current chain; ignored");
                    return Ok(false);
                }
            };

            let at = graph.context.current_time();
            for target in effects::resolve(effect) {
                graph.context.schedule_param(
                    chain.node(target.stage),
                    target.param,
                    ParamChange::immediate(target.value, at),
                )?;
            }
        }

        self.events.emit(GraphEvent::EffectApplied {
            kind: effect.kind,
            enabled: effect.enabled,
        });
        Ok(true)
    }

    /// Tears the graph down. Safe to call repeatedly and while an
    /// initialization is still pending.
    pub fn dispose(&self) {
        let graph = {
            let mut inner = self.inner.lock();
            if inner.state == GraphState::Disposed {
                return;
            }
            inner.state = GraphState::Disposed;
            inner.transport = Transport::Stopped;
            inner.position = Position::default();
            self.epoch.fetch_add(1, Ordering::AcqRel);
            inner.graph.take()
        };

        if let Some(graph) = graph {
            graph.context.close();
        }

        tracing::debug!("Audio graph disposed");
        self.events.emit(GraphEvent::Disposed);
        self.events.clear();
    }

    /// Current frequency data of the analyser, if analysis is enabled.
    pub fn analyser_data(&self) -> Option<Vec<u8>> {
        let inner = self.inner.lock();
        let graph = inner.graph.as_ref()?;
        let analyser = graph.analyser?;
        graph.context.analyser_data(analyser).ok()
    }

    pub fn audio_context(&self) -> Option<ContextInfo> {
        let inner = self.inner.lock();
        inner.graph.as_ref().map(|graph| ContextInfo {
            sample_rate: graph.context.sample_rate(),
            current_time: graph.context.current_time(),
            state: graph.context.state(),
        })
    }

    /// Elapsed playback position in seconds.
    pub fn position(&self) -> f64 {
        let inner = self.inner.lock();
        self.clamp_to_duration(inner.position.elapsed(Self::context_time(&inner)))
    }

    fn clamp_to_duration(&self, elapsed: f64) -> f64 {
        let duration = self.duration.get();
        if duration > 0.0 {
            elapsed.min(duration)
        } else {
            elapsed
        }
    }

    fn context_time(inner: &GraphInner<H::Context>) -> f64 {
        inner
            .graph
            .as_ref()
            .map_or(0.0, |graph| graph.context.current_time())
    }
}

impl<H: AudioHost> TimeSource for AudioGraphManager<H> {
    fn reading(&self) -> Option<TimeReading> {
        let inner = self.inner.lock();
        if inner.state != GraphState::Ready {
            return None;
        }
        let elapsed = inner.position.elapsed(Self::context_time(&inner));
        Some(TimeReading {
            current_time: self.clamp_to_duration(elapsed),
            duration: self.duration.get(),
            is_playing: inner.transport == Transport::Playing,
        })
    }
}

impl<H: AudioHost> Drop for AudioGraphManager<H> {
    fn drop(&mut self) {
        if let Some(graph) = self.inner.get_mut().graph.take() {
            graph.context.close();
        }
    }
}
