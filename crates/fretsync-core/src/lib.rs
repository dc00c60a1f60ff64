//! Playback clock core for audio-visual sync.
//!
//! # Primary API
//!
//! - [`PlaybackStore`]: canonical playback state with dedupe, coalescing and observers
//! - [`FrameSampler`] / [`FrameScheduler`]: per-frame sampling of a [`TimeSource`]
//! - [`beat_timing`], [`generate_beat_markers`], [`MarkerCache`]: tempo and meter math
//! - [`ManualClock`] / [`MonotonicClock`]: explicit time for every deadline
//!
//! # Example
//!
//! ```ignore
//! use fretsync_core::prelude::*;
//!
//! let store = PlaybackStore::default();
//! let clock = ManualClock::new();
//!
//! store.update_state(StateUpdate::new().playing(true).current_time(1.0), clock.now());
//! clock.advance_ms(100);
//! store.flush_due(clock.now());
//! assert!(store.state().is_playing);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{FrameConfig, StoreConfig};

pub mod clock;
pub use clock::{Clock, Deadline, ManualClock, MonotonicClock};

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, RunFlag};

pub mod timing;
pub use timing::{
    beat_timing, cursor_pixel_position, generate_beat_markers, generate_markers, Bbt,
    BeatMarker, BeatTiming, MarkerCache, MarkerGranularity, TimeSignature, MAX_MARKERS,
};

pub mod store;
pub use store::{
    PlaybackControls, PlaybackState, PlaybackStore, StateUpdate, SubscriptionId, UpdateOutcome,
};

pub mod frame;
pub use frame::{
    FrameLoop, FramePoll, FrameReport, FrameSample, FrameSampler, FrameScheduler, FrameTask,
    IdleReason, SamplerHandle, SamplerOptions, SamplerState, TaskId, TickControl, TimeReading,
    TimeSource,
};

pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, MonotonicClock};
    pub use crate::frame::{FrameSample, FrameSampler, FrameScheduler, TickControl, TimeSource};
    pub use crate::store::{PlaybackControls, PlaybackState, PlaybackStore, StateUpdate};
    pub use crate::timing::{beat_timing, generate_beat_markers, TimeSignature};
    pub use crate::{Error, Result};
}
