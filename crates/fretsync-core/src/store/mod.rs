//! Playback state store: canonical state, controlled mutation, transport dispatch.

pub(crate) mod controls;
pub(crate) mod playback_store;
pub(crate) mod state;

pub use controls::PlaybackControls;
pub use playback_store::{PlaybackStore, SubscriptionId, UpdateOutcome};
pub use state::{PlaybackState, StateUpdate};
