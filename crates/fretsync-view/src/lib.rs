//! Notation-side half of playback sync: where the cursor goes and when the
//! viewport follows it.
//!
//! - [`CursorResolver`]: maps a playback time to a [`CursorPosition`] through an
//!   external [`NotationLookup`], holding the last good anchor across misses.
//! - [`AutoScroller`]: leading/trailing hysteresis band that decides when the
//!   viewport must move to keep the cursor visible.
//! - [`ScrollViewport`] / [`RenderSurface`]: the host UI's side of the contract.

pub mod cursor;
pub use cursor::{
    BeatRef, Bounds, CursorAnchor, CursorPosition, CursorResolver, NotationLookup, Resolution,
    ResolveTrace,
};

pub mod scroll;
pub use scroll::{
    AutoScroller, ScrollBehavior, ScrollCommand, ScrollConfig, ScrollTolerance, ViewportMetrics,
};

pub mod surface;
pub use surface::{RenderSurface, ScrollViewport};
