//! Beat marker generation and time-to-pixel mapping.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::tempo::{beat_timing, TimeSignature};
use crate::Result;

/// Absorbs float error when comparing a marker time against the duration.
const TIME_EPSILON: f64 = 1e-9;

/// Upper bound on markers per overlay. Longer timelines are truncated.
pub const MAX_MARKERS: u64 = 100_000;

/// A measure or beat boundary on the static overlay.
///
/// `measure` and `beat` are 1-indexed, `beat` counts within the measure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatMarker {
    pub position: f64,
    pub beat: u32,
    pub measure: u32,
    pub time: f64,
}

/// How densely markers are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerGranularity {
    /// One marker per measure start.
    #[default]
    Measure,
    /// One marker per beat.
    Beat,
    /// `n` markers per beat.
    Subdivision(u32),
}

impl MarkerGranularity {
    fn steps_per_beat(self) -> u32 {
        match self {
            MarkerGranularity::Measure | MarkerGranularity::Beat => 1,
            MarkerGranularity::Subdivision(n) => n.max(1),
        }
    }
}

/// Measure-start markers over `duration_secs`, laid out across `viewport_width`.
pub fn generate_beat_markers(
    duration_secs: f64,
    viewport_width: f64,
    bpm: f64,
    time_signature: TimeSignature,
) -> Result<Vec<BeatMarker>> {
    generate_markers(
        duration_secs,
        viewport_width,
        bpm,
        time_signature,
        MarkerGranularity::Measure,
    )
}

pub fn generate_markers(
    duration_secs: f64,
    viewport_width: f64,
    bpm: f64,
    time_signature: TimeSignature,
    granularity: MarkerGranularity,
) -> Result<Vec<BeatMarker>> {
    let timing = beat_timing(bpm, time_signature)?;

    if !(duration_secs.is_finite() && duration_secs > 0.0)
        || !(viewport_width.is_finite() && viewport_width > 0.0)
    {
        return Ok(Vec::new());
    }

    let total_beats = (duration_secs / timing.seconds_per_beat).ceil() as u64;
    let per_measure = timing.beats_per_measure as u64;
    let marker_at = |time: f64, beat_index: u64| BeatMarker {
        position: time / duration_secs * viewport_width,
        beat: (beat_index % per_measure) as u32 + 1,
        measure: (beat_index / per_measure) as u32 + 1,
        time,
    };

    let markers = match granularity {
        MarkerGranularity::Measure => {
            let total_measures = capped(total_beats.div_ceil(per_measure));
            (0..total_measures)
                .map(|m| (m as f64 * timing.seconds_per_measure, m * per_measure))
                .take_while(|(time, _)| *time <= duration_secs + TIME_EPSILON)
                .map(|(time, beat_index)| marker_at(time, beat_index))
                .collect()
        }
        MarkerGranularity::Beat | MarkerGranularity::Subdivision(_) => {
            let steps = granularity.steps_per_beat() as u64;
            let step_secs = timing.seconds_per_beat / steps as f64;
            let total_steps = capped(total_beats.saturating_mul(steps));
            (0..total_steps)
                .map(|i| (i as f64 * step_secs, i / steps))
                .take_while(|(time, _)| *time <= duration_secs + TIME_EPSILON)
                .map(|(time, beat_index)| marker_at(time, beat_index))
                .collect()
        }
    };

    Ok(markers)
}

fn capped(count: u64) -> u64 {
    if count > MAX_MARKERS {
        tracing::warn!(count, max = MAX_MARKERS, "Marker count capped");
    }
    count.min(MAX_MARKERS)
}

/// Horizontal cursor offset for `current_time`, clamped to `[0, viewport_width]`.
pub fn cursor_pixel_position(current_time: f64, duration: f64, viewport_width: f64) -> f64 {
    if duration <= 0.0 || !duration.is_finite() || viewport_width <= 0.0 {
        return 0.0;
    }
    let position = current_time / duration * viewport_width;
    if position.is_nan() {
        return 0.0;
    }
    position.clamp(0.0, viewport_width)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MarkerKey {
    duration_bits: u64,
    width_bits: u64,
    bpm_bits: u64,
    time_signature: TimeSignature,
    granularity: MarkerGranularity,
}

/// Memoized marker list, regenerated wholesale when any input changes.
#[derive(Debug, Default)]
pub struct MarkerCache {
    key: Option<MarkerKey>,
    markers: Option<Arc<[BeatMarker]>>,
    granularity: MarkerGranularity,
    regenerations: u64,
}

impl MarkerCache {
    pub fn new(granularity: MarkerGranularity) -> Self {
        Self {
            granularity,
            ..Self::default()
        }
    }

    pub fn markers(
        &mut self,
        duration_secs: f64,
        viewport_width: f64,
        bpm: f64,
        time_signature: TimeSignature,
    ) -> Result<Arc<[BeatMarker]>> {
        let key = MarkerKey {
            duration_bits: duration_secs.to_bits(),
            width_bits: viewport_width.to_bits(),
            bpm_bits: bpm.to_bits(),
            time_signature,
            granularity: self.granularity,
        };

        if self.key == Some(key) {
            if let Some(markers) = &self.markers {
                return Ok(Arc::clone(markers));
            }
        }

        let markers: Arc<[BeatMarker]> = generate_markers(
            duration_secs,
            viewport_width,
            bpm,
            time_signature,
            self.granularity,
        )?
        .into();

        tracing::debug!(
            count = markers.len(),
            bpm,
            duration_secs,
            viewport_width,
            "Regenerated beat markers"
        );

        self.key = Some(key);
        self.markers = Some(Arc::clone(&markers));
        self.regenerations += 1;
        Ok(markers)
    }

    pub fn set_granularity(&mut self, granularity: MarkerGranularity) {
        self.granularity = granularity;
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.markers = None;
    }

    /// How many times the marker list has been rebuilt.
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }
}
