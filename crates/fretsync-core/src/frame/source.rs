//! Time source contract and per-frame samples.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Non-blocking snapshot of the audio clock.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeReading {
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
}

/// Anything that can report the playback clock, typically the audio graph.
pub trait TimeSource: Send + Sync {
    /// `None` when the source has nothing to report (torn down, not loaded).
    fn reading(&self) -> Option<TimeReading>;
}

/// One accepted sample of the audio clock, stamped with the frame time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSample {
    pub current_time: f64,
    pub duration: f64,
    /// `current_time / duration`, 0 when duration is 0.
    pub progress: f64,
    pub is_playing: bool,
    pub timestamp: Duration,
}

impl FrameSample {
    pub fn from_reading(reading: TimeReading, timestamp: Duration) -> Self {
        let progress = if reading.duration > 0.0 {
            reading.current_time / reading.duration
        } else {
            0.0
        };
        Self {
            current_time: reading.current_time,
            duration: reading.duration,
            progress,
            is_playing: reading.is_playing,
            timestamp,
        }
    }

    pub fn current_time_ms(&self) -> f64 {
        self.current_time * 1000.0
    }
}
