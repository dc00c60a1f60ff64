//! Audio processing graph manager: gain, effects chain and analyser behind
//! an async host abstraction, with typed lifecycle events.
//!
//! # Primary API
//!
//! - [`AudioGraphManager`]: lifecycle, transport, volume/tempo, effects
//! - [`AudioHost`] / [`AudioContext`]: what a platform audio API must provide
//! - [`HeadlessHost`]: in-process host with a hand-driven timeline
//! - [`EventBus`] / [`GraphEvent`]: isolated typed publish/subscribe
//!
//! # Example
//!
//! ```ignore
//! use fretsync_graph::{AudioGraphConfig, AudioGraphManager, HeadlessHost};
//!
//! let graph = AudioGraphManager::new(HeadlessHost::new(), AudioGraphConfig::default())?;
//! graph.start().await?;
//! graph.set_volume(0.8);
//! ```

pub mod error;
pub use error::{Error, HostError, Result};

pub mod config;
pub use config::AudioGraphConfig;

pub mod host;
pub use host::{
    AudioContext, AudioHost, AudioParam, ContextState, Endpoint, FilterKind, NodeId, NodeKind,
    ParamChange,
};

pub mod headless;
pub use headless::{HeadlessContext, HeadlessHost, HostGate};

pub mod effects;
pub use effects::{Effect, EffectKind};

pub mod events;
pub use events::{Delivery, EventBus, GraphEvent, GraphEventKind, ListenerId};

pub mod manager;
pub use manager::{
    AudioGraphManager, ContextInfo, GraphState, Transport, ANALYSER_FFT_SIZE, MAX_TEMPO,
    MIN_TEMPO, VOLUME_RAMP_SECONDS,
};
