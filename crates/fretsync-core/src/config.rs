//! Store and frame-loop configuration.
//!
//! Defaults match the reference timings: a 100 ms coalescing window, a 0.01
//! change tolerance, and a 16 ms minimum interval between accepted samples.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Playback state store tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Updates arriving within this window collapse into one transition.
    pub debounce_window_ms: u64,
    /// Float fields must move at least this much to count as a change.
    pub tolerance: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: 100,
            tolerance: 0.01,
        }
    }
}

impl StoreConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "store.tolerance {} must be finite and non-negative",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Frame sampling loop options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub enabled: bool,
    /// Skip the callback while the source reports not-playing.
    pub only_when_playing: bool,
    /// Minimum time between accepted samples; 0 samples every frame.
    pub min_interval_ms: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            only_when_playing: true,
            min_interval_ms: 16,
        }
    }
}

impl FrameConfig {
    pub fn min_interval(&self) -> Option<Duration> {
        (self.min_interval_ms > 0).then(|| Duration::from_millis(self.min_interval_ms))
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_interval_ms > 1_000 {
            return Err(Error::InvalidConfig(format!(
                "frame.min_interval_ms {} out of range (0-1000)",
                self.min_interval_ms
            )));
        }
        Ok(())
    }
}

/// Parses a TOML document into `T`.
pub fn parse_toml<T: DeserializeOwned>(source: &str) -> Result<T> {
    Ok(toml::from_str(source)?)
}

/// Reads and parses a TOML file into `T`.
pub fn load_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let source = std::fs::read_to_string(path)?;
    parse_toml(&source)
}

/// Serializes `value` as pretty TOML.
pub fn to_toml<T: Serialize>(value: &T) -> Result<String> {
    Ok(toml::to_string_pretty(value)?)
}
