//! Restartable per-frame sampler of a [`TimeSource`].

use std::sync::{Arc, Weak};
use std::time::Duration;

use super::source::{FrameSample, TimeReading, TimeSource};
use crate::config::FrameConfig;
use crate::lockfree::RunFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerState {
    #[default]
    Stopped,
    Running,
}

/// Why a running sampler produced nothing this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    Disabled,
    NoSource,
    NotPlaying,
    Throttled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FramePoll {
    /// The sampler is stopped; nothing is read until it starts again.
    Stopped,
    /// Running but nothing to forward; re-arm and wait.
    Idle(IdleReason),
    Sampled(FrameSample),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerOptions {
    pub enabled: bool,
    pub only_when_playing: bool,
    pub min_interval: Option<Duration>,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self::from(&FrameConfig::default())
    }
}

impl From<&FrameConfig> for SamplerOptions {
    fn from(config: &FrameConfig) -> Self {
        Self {
            enabled: config.enabled,
            only_when_playing: config.only_when_playing,
            min_interval: config.min_interval(),
        }
    }
}

/// Start/stop control shared with whoever owns the sampler's lifecycle.
#[derive(Debug, Clone)]
pub struct SamplerHandle {
    running: Arc<RunFlag>,
}

impl SamplerHandle {
    /// No-op if already running.
    pub fn start(&self) -> bool {
        self.running.raise()
    }

    /// No-op if already stopped.
    pub fn stop(&self) -> bool {
        self.running.lower()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_raised()
    }
}

/// Reads the time source once per display frame while running.
///
/// The source is held weakly: when its owner drops it mid-flight the sampler
/// treats it as not playing instead of failing.
pub struct FrameSampler {
    running: Arc<RunFlag>,
    options: SamplerOptions,
    source: Option<Weak<dyn TimeSource>>,
    last_sample_at: Option<Duration>,
    was_running: bool,
    paused: Option<TimeReading>,
}

impl FrameSampler {
    pub fn new(options: SamplerOptions) -> Self {
        Self {
            running: Arc::new(RunFlag::default()),
            options,
            source: None,
            last_sample_at: None,
            was_running: false,
            paused: None,
        }
    }

    pub fn with_source(options: SamplerOptions, source: &Arc<dyn TimeSource>) -> Self {
        let mut sampler = Self::new(options);
        sampler.set_source(source);
        sampler
    }

    pub fn set_source(&mut self, source: &Arc<dyn TimeSource>) {
        self.source = Some(Arc::downgrade(source));
    }

    pub fn clear_source(&mut self) {
        self.source = None;
    }

    pub fn options(&self) -> SamplerOptions {
        self.options
    }

    pub fn set_options(&mut self, options: SamplerOptions) {
        self.options = options;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.options.enabled = enabled;
    }

    pub fn handle(&self) -> SamplerHandle {
        SamplerHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// `Stopped -> Running`. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        self.handle().start()
    }

    /// `Running -> Stopped`. Returns `false` if it was already stopped.
    pub fn stop(&self) -> bool {
        self.handle().stop()
    }

    pub fn state(&self) -> SamplerState {
        if self.running.is_raised() {
            SamplerState::Running
        } else {
            SamplerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_raised()
    }

    /// Reading of a loaded but paused source, captured by the last poll
    /// that went idle on the only-when-playing gate.
    pub fn paused_reading(&self) -> Option<TimeReading> {
        self.paused
    }

    /// Runs one frame of the sampling state machine.
    pub fn poll(&mut self, now: Duration) -> FramePoll {
        self.paused = None;
        if !self.running.is_raised() {
            self.was_running = false;
            return FramePoll::Stopped;
        }
        if !self.was_running {
            // Fresh start: don't throttle against samples from a previous run.
            self.was_running = true;
            self.last_sample_at = None;
        }

        if !self.options.enabled {
            return FramePoll::Idle(IdleReason::Disabled);
        }

        let Some(source) = self.source.as_ref().and_then(Weak::upgrade) else {
            return FramePoll::Idle(IdleReason::NoSource);
        };

        let reading = match source.reading() {
            Some(reading) => reading,
            None => return FramePoll::Idle(IdleReason::NotPlaying),
        };

        if self.options.only_when_playing && !reading.is_playing {
            self.paused = Some(reading);
            return FramePoll::Idle(IdleReason::NotPlaying);
        }

        if let (Some(min_interval), Some(last)) = (self.options.min_interval, self.last_sample_at) {
            if now.saturating_sub(last) < min_interval {
                return FramePoll::Idle(IdleReason::Throttled);
            }
        }

        self.last_sample_at = Some(now);
        FramePoll::Sampled(FrameSample::from_reading(reading, now))
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(SamplerOptions::default())
    }
}
