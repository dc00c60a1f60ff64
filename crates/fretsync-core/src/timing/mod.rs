//! Timing model: pure tempo/meter math and beat marker layout.

pub(crate) mod markers;
pub(crate) mod tempo;

pub use markers::{
    cursor_pixel_position, generate_beat_markers, generate_markers, BeatMarker, MarkerCache,
    MarkerGranularity, MAX_MARKERS,
};
pub use tempo::{beat_timing, Bbt, BeatTiming, TimeSignature};
