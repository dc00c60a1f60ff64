//! Audio graph configuration.

use fretsync_core::Error as CoreError;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Fixed for the lifetime of a graph; changing it means disposing and
/// building a new manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioGraphConfig {
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub channels: u32,
    pub enable_effects: bool,
    pub enable_analysis: bool,
}

impl Default for AudioGraphConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 512,
            channels: 2,
            enable_effects: true,
            enable_analysis: true,
        }
    }
}

impl AudioGraphConfig {
    pub fn validate(&self) -> Result<()> {
        if !(8_000..=384_000).contains(&self.sample_rate) {
            return Err(CoreError::InvalidConfig(format!(
                "graph.sample_rate {} must be within 8000..=384000",
                self.sample_rate
            ))
            .into());
        }
        if !self.buffer_size.is_power_of_two() || !(32..=16_384).contains(&self.buffer_size) {
            return Err(CoreError::InvalidConfig(format!(
                "graph.buffer_size {} must be a power of two within 32..=16384",
                self.buffer_size
            ))
            .into());
        }
        if !(1..=32).contains(&self.channels) {
            return Err(CoreError::InvalidConfig(format!(
                "graph.channels {} must be within 1..=32",
                self.channels
            ))
            .into());
        }
        Ok(())
    }

    /// Duration of one processing block in seconds.
    pub fn buffer_duration(&self) -> f64 {
        self.buffer_size as f64 / self.sample_rate as f64
    }
}
