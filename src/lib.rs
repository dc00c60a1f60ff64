//! # fretsync - audio-visual playback sync
//!
//! Keeps a notation view in step with an audio clock: a moving cursor, a
//! viewport that follows it, and a static beat overlay.
//!
//! ## Architecture
//!
//! fretsync is an umbrella crate that coordinates:
//! - **fretsync-core** - Timing model, playback state store, frame sampling loop
//! - **fretsync-view** - Cursor position resolver and auto-scroll controller
//! - **fretsync-graph** - Audio graph manager over a pluggable audio host
//!
//! [`SyncSession`] owns one instance of each per-view component and runs them
//! in a fixed order every frame.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fretsync::prelude::*;
//!
//! let graph = Arc::new(AudioGraphManager::new(HeadlessHost::new(), AudioGraphConfig::default())?);
//! let session = SyncSession::builder()
//!     .config(SyncConfig::load("fretsync.toml")?)
//!     .graph(&graph, Handle::current())
//!     .viewport(Box::new(my_viewport))
//!     .surface(Box::new(my_surface))
//!     .start(true)
//!     .build()?;
//!
//! let session = Arc::new(Mutex::new(session));
//! let driver = spawn_frame_driver(&Handle::current(), Arc::clone(&session), Duration::from_millis(16));
//! session.lock().play();
//! ```
//!
//! ## Feature Flags
//!
//! - `graph` (default) - Audio graph manager and the transport adapter for it
//! - `driver` (default) - tokio interval frame driver

/// Re-export of fretsync-core for direct access
pub use fretsync_core as core;

/// Re-export of fretsync-view
pub use fretsync_view as view;

pub use fretsync_core::{
    beat_timing, cursor_pixel_position, generate_beat_markers, generate_markers, Bbt,
    BeatMarker, BeatTiming, Clock, FramePoll, FrameSample, FrameSampler, FrameScheduler,
    FrameTask, IdleReason, ManualClock, MarkerCache, MarkerGranularity, MonotonicClock,
    PlaybackControls, PlaybackState, PlaybackStore, StateUpdate, TickControl, TimeReading,
    TimeSignature, TimeSource,
};

pub use fretsync_view::{
    AutoScroller, BeatRef, Bounds, CursorAnchor, CursorPosition, CursorResolver,
    NotationLookup, RenderSurface, ResolveTrace, ScrollBehavior, ScrollCommand, ScrollConfig,
    ScrollViewport, ViewportMetrics,
};

// Audio graph
#[cfg(feature = "graph")]
pub use fretsync_graph as graph;

#[cfg(feature = "graph")]
pub use fretsync_graph::{
    AudioGraphConfig, AudioGraphManager, AudioHost, Effect, EffectKind, GraphEvent,
    GraphEventKind, GraphState, HeadlessHost, Transport,
};

mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{SyncConfig, TimingConfig};

mod session;
pub use session::{FrameOutcome, SyncSession, SyncSessionBuilder};

#[cfg(feature = "graph")]
mod controls;
#[cfg(feature = "graph")]
pub use controls::GraphControls;

#[cfg(feature = "driver")]
mod driver;
#[cfg(feature = "driver")]
pub use driver::{spawn_frame_driver, FrameDriver};

/// Convenience prelude for common imports
pub mod prelude {
    // Session
    pub use crate::{FrameOutcome, SyncConfig, SyncSession, SyncSessionBuilder};

    // Clock and store
    pub use crate::core::prelude::*;

    // View collaborators
    pub use crate::view::{
        CursorPosition, NotationLookup, RenderSurface, ScrollCommand, ScrollViewport,
        ViewportMetrics,
    };

    #[cfg(feature = "graph")]
    pub use crate::graph::{AudioGraphConfig, AudioGraphManager, GraphEvent, HeadlessHost};

    #[cfg(feature = "driver")]
    pub use crate::{spawn_frame_driver, FrameDriver};

    pub use crate::{Error, Result};
}
