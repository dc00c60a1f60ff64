//! Tolerance constants for sync tests.

/// Seconds; exact arithmetic on sampled times.
pub const TIME_EPSILON: f64 = 1e-9;

/// Pixels; cursor and scroll offsets.
pub const PIXEL_EPSILON: f64 = 1e-6;

/// Store change tolerance used by the default config.
pub const STORE_TOLERANCE: f64 = 0.01;
