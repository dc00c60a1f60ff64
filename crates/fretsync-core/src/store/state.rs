//! Playback state value and partial updates.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Canonical playback state. Only [`PlaybackStore`](super::PlaybackStore) mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_loaded: bool,
    /// Seconds, never negative.
    pub current_time: f64,
    /// Seconds.
    pub duration: f64,
    /// Linear gain in `[0, 1]`.
    pub volume: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_loaded: false,
            current_time: 0.0,
            duration: 0.0,
            volume: 1.0,
        }
    }
}

impl PlaybackState {
    /// `current_time / duration`, or 0 before a track is loaded.
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            self.current_time / self.duration
        } else {
            0.0
        }
    }

    /// Whether `other` differs beyond `tolerance` in any float field, or at all in a flag.
    pub fn differs_from(&self, other: &PlaybackState, tolerance: f64) -> bool {
        self.is_playing != other.is_playing
            || self.is_loaded != other.is_loaded
            || (self.current_time - other.current_time).abs() >= tolerance
            || (self.duration - other.duration).abs() >= tolerance
            || (self.volume - other.volume).abs() >= tolerance
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    pub is_playing: Option<bool>,
    pub is_loaded: Option<bool>,
    pub current_time: Option<f64>,
    pub duration: Option<f64>,
    pub volume: Option<f64>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing(mut self, is_playing: bool) -> Self {
        self.is_playing = Some(is_playing);
        self
    }

    pub fn loaded(mut self, is_loaded: bool) -> Self {
        self.is_loaded = Some(is_loaded);
        self
    }

    pub fn current_time(mut self, seconds: f64) -> Self {
        self.current_time = Some(seconds);
        self
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Content fingerprint. Floats hash by bit pattern, so `0.1 + 0.2` and `0.3` differ.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.is_playing.hash(&mut hasher);
        self.is_loaded.hash(&mut hasher);
        self.current_time.map(f64::to_bits).hash(&mut hasher);
        self.duration.map(f64::to_bits).hash(&mut hasher);
        self.volume.map(f64::to_bits).hash(&mut hasher);
        hasher.finish()
    }

    /// Combines two updates; fields set in `later` win.
    pub fn merge(self, later: StateUpdate) -> StateUpdate {
        StateUpdate {
            is_playing: later.is_playing.or(self.is_playing),
            is_loaded: later.is_loaded.or(self.is_loaded),
            current_time: later.current_time.or(self.current_time),
            duration: later.duration.or(self.duration),
            volume: later.volume.or(self.volume),
        }
    }

    /// Applies the update to `state`, enforcing the state invariants.
    ///
    /// Non-finite floats are ignored rather than propagated.
    pub fn apply_to(&self, state: &PlaybackState) -> PlaybackState {
        let finite = |v: Option<f64>| v.filter(|v| v.is_finite());

        PlaybackState {
            is_playing: self.is_playing.unwrap_or(state.is_playing),
            is_loaded: self.is_loaded.unwrap_or(state.is_loaded),
            current_time: finite(self.current_time)
                .map(|t| t.max(0.0))
                .unwrap_or(state.current_time),
            duration: finite(self.duration)
                .map(|d| d.max(0.0))
                .unwrap_or(state.duration),
            volume: finite(self.volume)
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(state.volume),
        }
    }
}
