//! Time -> screen anchor resolution through an external notation lookup.
//!
//! The notation surface may not have laid out the beat under the playhead
//! yet (first render, re-layout after resize). A miss on either lookup keeps
//! the previous anchor so the cursor never snaps to the origin.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A beat as identified by the notation surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatRef {
    pub id: u64,
    pub start_ms: f64,
    pub duration_ms: f64,
}

/// Layout box of a beat in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Beat and bounds queries exposed by the notation renderer.
///
/// Called once per sampled frame, so implementations must stay cheap.
pub trait NotationLookup {
    fn find_beat(&self, tracks: &[usize], time_ms: f64) -> Option<BeatRef>;
    fn find_bounds(&self, beat: &BeatRef) -> Option<Bounds>;
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
    pub height: f64,
}

/// Where inside the beat box the cursor sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorAnchor {
    /// Left edge of the beat box.
    #[default]
    BeatStart,
    /// Linear position across the box by elapsed fraction of the beat.
    Interpolated,
}

impl CursorAnchor {
    fn place(self, beat: &BeatRef, bounds: &Bounds, time_ms: f64) -> CursorPosition {
        let x = match self {
            CursorAnchor::BeatStart => bounds.x,
            CursorAnchor::Interpolated if beat.duration_ms > 0.0 => {
                let fraction = ((time_ms - beat.start_ms) / beat.duration_ms).clamp(0.0, 1.0);
                bounds.x + bounds.width * fraction
            }
            CursorAnchor::Interpolated => bounds.x,
        };
        CursorPosition {
            x,
            y: bounds.y,
            height: bounds.height,
        }
    }
}

/// Which path the last resolution took. `Display` gives a one-line
/// description for desync diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolveTrace {
    Resolved { beat_id: u64, time_ms: f64 },
    BeatMiss { time_ms: f64, held: bool },
    BoundsMiss { beat_id: u64, time_ms: f64, held: bool },
}

impl ResolveTrace {
    pub fn is_hit(&self) -> bool {
        matches!(self, ResolveTrace::Resolved { .. })
    }
}

impl fmt::Display for ResolveTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn fallback(held: bool) -> &'static str {
            if held {
                "holding last position"
            } else {
                "no position yet"
            }
        }

        match self {
            ResolveTrace::Resolved { beat_id, time_ms } => {
                write!(f, "t={time_ms:.0}ms -> beat #{beat_id} -> bounds ok")
            }
            ResolveTrace::BeatMiss { time_ms, held } => {
                write!(f, "t={time_ms:.0}ms -> no beat ({})", fallback(*held))
            }
            ResolveTrace::BoundsMiss {
                beat_id,
                time_ms,
                held,
            } => write!(
                f,
                "t={time_ms:.0}ms -> beat #{beat_id} -> no bounds ({})",
                fallback(*held)
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// `None` only before the first successful lookup.
    pub position: Option<CursorPosition>,
    pub trace: ResolveTrace,
}

/// Resolves the cursor anchor for a playback time, holding the last good one.
#[derive(Debug, Clone, Default)]
pub struct CursorResolver {
    anchor: CursorAnchor,
    last_good: Option<CursorPosition>,
    misses: u64,
}

impl CursorResolver {
    pub fn new(anchor: CursorAnchor) -> Self {
        Self {
            anchor,
            last_good: None,
            misses: 0,
        }
    }

    pub fn resolve<L>(&mut self, lookup: &L, tracks: &[usize], time_ms: f64) -> Resolution
    where
        L: NotationLookup + ?Sized,
    {
        let held = self.last_good.is_some();

        let Some(beat) = lookup.find_beat(tracks, time_ms) else {
            return self.miss(ResolveTrace::BeatMiss { time_ms, held });
        };

        let Some(bounds) = lookup.find_bounds(&beat) else {
            return self.miss(ResolveTrace::BoundsMiss {
                beat_id: beat.id,
                time_ms,
                held,
            });
        };

        let position = self.anchor.place(&beat, &bounds, time_ms);
        self.last_good = Some(position);
        Resolution {
            position: Some(position),
            trace: ResolveTrace::Resolved {
                beat_id: beat.id,
                time_ms,
            },
        }
    }

    fn miss(&mut self, trace: ResolveTrace) -> Resolution {
        self.misses += 1;
        tracing::trace!(%trace, "Cursor lookup miss");
        Resolution {
            position: self.last_good,
            trace,
        }
    }

    pub fn last_good(&self) -> Option<CursorPosition> {
        self.last_good
    }

    /// Lookup misses since construction or the last reset.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn anchor(&self) -> CursorAnchor {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: CursorAnchor) {
        self.anchor = anchor;
    }

    /// Forgets the held position, e.g. when a new score is loaded.
    pub fn reset(&mut self) {
        self.last_good = None;
        self.misses = 0;
    }
}
