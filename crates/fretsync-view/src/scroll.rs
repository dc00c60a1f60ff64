//! Auto-scroll with a leading/trailing hysteresis band.
//!
//! ```text
//!  offset                                         offset + width
//!    |<- trailing ->|       no scroll        |<- leading ->|
//! ```
//!
//! A cursor inside the middle band never moves the viewport. Leaving it on
//! either side recenters the cursor, which puts it well inside the band
//! again, so a cursor resting near an edge cannot make the view shake.

use fretsync_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Hint passed to the viewport; it may animate or jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    Instant,
    #[default]
    Smooth,
}

/// Target offsets for the viewport. `None` leaves that axis alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollCommand {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub behavior: ScrollBehavior,
}

impl ScrollCommand {
    pub fn horizontal(left: f64, behavior: ScrollBehavior) -> Self {
        Self {
            left: Some(left),
            top: None,
            behavior,
        }
    }
}

/// Current scroll offsets and visible size of a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportMetrics {
    pub scroll_left: f64,
    pub scroll_top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTolerance {
    /// Distance from the right edge that triggers a scroll right.
    pub leading: f64,
    /// Distance from the left edge that triggers a scroll left.
    pub trailing: f64,
}

impl Default for ScrollTolerance {
    fn default() -> Self {
        Self {
            leading: 300.0,
            trailing: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub enabled: bool,
    pub leading_px: f64,
    pub trailing_px: f64,
    /// Behavior for frame-driven follow scrolling.
    pub behavior: ScrollBehavior,
    /// Behavior for click-to-seek jumps.
    pub jump_behavior: ScrollBehavior,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        let tolerance = ScrollTolerance::default();
        Self {
            enabled: true,
            leading_px: tolerance.leading,
            trailing_px: tolerance.trailing,
            behavior: ScrollBehavior::Smooth,
            jump_behavior: ScrollBehavior::Smooth,
        }
    }
}

impl ScrollConfig {
    pub fn tolerance(&self) -> ScrollTolerance {
        ScrollTolerance {
            leading: self.leading_px,
            trailing: self.trailing_px,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("scroll.leading_px", self.leading_px),
            ("scroll.trailing_px", self.trailing_px),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} {value} must be finite and non-negative"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AutoScroller {
    enabled: bool,
    tolerance: ScrollTolerance,
    behavior: ScrollBehavior,
    jump_behavior: ScrollBehavior,
}

impl AutoScroller {
    pub fn new(config: &ScrollConfig) -> Self {
        Self {
            enabled: config.enabled,
            tolerance: config.tolerance(),
            behavior: config.behavior,
            jump_behavior: config.jump_behavior,
        }
    }

    pub fn tolerance(&self) -> ScrollTolerance {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: ScrollTolerance) {
        self.tolerance = tolerance;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// New horizontal offset if `target_x` left the no-scroll band, else `None`.
    pub fn decide(&self, target_x: f64, scroll_offset: f64, viewport_width: f64) -> Option<f64> {
        if !self.enabled || !target_x.is_finite() || viewport_width <= 0.0 {
            return None;
        }

        let right_edge = scroll_offset + viewport_width;
        let past_leading = target_x > right_edge - self.tolerance.leading;
        let past_trailing = target_x < scroll_offset + self.tolerance.trailing;
        if !(past_leading || past_trailing) {
            return None;
        }

        let next = (target_x - viewport_width / 2.0).max(0.0);
        // Already centered as far as possible (cursor near the start).
        (next != scroll_offset).then_some(next)
    }

    /// Follow-scroll command for the cursor at `target_x`, if one is needed.
    pub fn follow(&self, target_x: f64, viewport: &ViewportMetrics) -> Option<ScrollCommand> {
        self.decide(target_x, viewport.scroll_left, viewport.width)
            .map(|left| ScrollCommand::horizontal(left, self.behavior))
    }

    /// Unconditional jump to `(x, y)`, centering the requested axes.
    pub fn scroll_to_position(
        &self,
        x: f64,
        y: f64,
        center_x: bool,
        center_y: bool,
        viewport: &ViewportMetrics,
    ) -> ScrollCommand {
        let left = if center_x { x - viewport.width / 2.0 } else { x };
        let top = if center_y { y - viewport.height / 2.0 } else { y };
        ScrollCommand {
            left: Some(left.max(0.0)),
            top: Some(top.max(0.0)),
            behavior: self.jump_behavior,
        }
    }
}

impl Default for AutoScroller {
    fn default() -> Self {
        Self::new(&ScrollConfig::default())
    }
}
