//! Tempo and meter arithmetic: beat/measure durations and BBT positions.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Rejects empty measures and denominators that are not a power of two.
    pub fn validate(&self) -> Result<()> {
        if self.numerator == 0 || self.denominator == 0 || !self.denominator.is_power_of_two() {
            return Err(Error::InvalidTimeSignature {
                numerator: self.numerator,
                denominator: self.denominator,
            });
        }
        Ok(())
    }

    /// Beats per measure, counted in the denominator's note value.
    #[inline]
    pub fn beats_per_measure(&self) -> u32 {
        self.numerator
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl From<[u32; 2]> for TimeSignature {
    fn from([numerator, denominator]: [u32; 2]) -> Self {
        Self::new(numerator, denominator)
    }
}

/// Bar/beat/tick position, 1-indexed bar and beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bbt {
    pub measure: u32,
    pub beat: u32,
    pub ticks: u32,
}

impl Bbt {
    pub const TICKS_PER_BEAT: u32 = 960;

    pub fn new(measure: u32, beat: u32, ticks: u32) -> Self {
        Self {
            measure,
            beat,
            ticks,
        }
    }
}

/// Derived durations for a constant tempo and meter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatTiming {
    pub beats_per_second: f64,
    pub seconds_per_beat: f64,
    pub beats_per_measure: u32,
    pub seconds_per_measure: f64,
}

impl BeatTiming {
    #[inline]
    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds * self.beats_per_second
    }

    #[inline]
    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * self.seconds_per_beat
    }

    pub fn seconds_to_bbt(&self, seconds: f64) -> Bbt {
        let beats = self.seconds_to_beats(seconds.max(0.0));
        let per_measure = self.beats_per_measure as f64;

        let whole_measures = (beats / per_measure).floor();
        let beat_in_measure = beats - whole_measures * per_measure;
        let whole_beat = beat_in_measure.floor();
        let ticks = ((beat_in_measure - whole_beat) * Bbt::TICKS_PER_BEAT as f64) as u32;

        Bbt {
            measure: whole_measures as u32 + 1,
            beat: whole_beat as u32 + 1,
            ticks,
        }
    }

    pub fn bbt_to_seconds(&self, bbt: Bbt) -> f64 {
        let measure_beats = bbt.measure.saturating_sub(1) as f64 * self.beats_per_measure as f64;
        let beat_beats = bbt.beat.saturating_sub(1) as f64;
        let tick_beats = bbt.ticks as f64 / Bbt::TICKS_PER_BEAT as f64;

        self.beats_to_seconds(measure_beats + beat_beats + tick_beats)
    }
}

/// Beat and measure durations for `bpm` in `time_signature`.
pub fn beat_timing(bpm: f64, time_signature: TimeSignature) -> Result<BeatTiming> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(Error::InvalidTempo(bpm));
    }
    time_signature.validate()?;

    let beats_per_second = bpm / 60.0;
    let seconds_per_beat = 60.0 / bpm;
    let beats_per_measure = time_signature.beats_per_measure();

    Ok(BeatTiming {
        beats_per_second,
        seconds_per_beat,
        beats_per_measure,
        seconds_per_measure: seconds_per_beat * beats_per_measure as f64,
    })
}
