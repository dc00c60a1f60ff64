//! Transport capability registered with the store.

/// Transport operations backed by whatever owns the audio clock.
///
/// Implementations must not call back into the store synchronously from
/// these methods with the expectation of seeing the result; state flows back
/// through sampled frames.
pub trait PlaybackControls: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn stop(&self);
    fn toggle(&self);
    fn seek(&self, time: f64);
    fn set_volume(&self, volume: f64);
}
