//! Session configuration loaded from TOML.
//!
//! ```toml
//! [store]
//! debounce_window_ms = 100
//!
//! [timing]
//! bpm = 96.0
//! time_signature = { numerator = 3, denominator = 4 }
//!
//! [scroll]
//! leading_px = 240.0
//!
//! [graph]
//! sample_rate = 48000
//! enable_effects = false
//! ```
//!
//! Every section and field is optional and falls back to its default.

use std::path::Path;

use fretsync_core::{FrameConfig, MarkerGranularity, StoreConfig, TimeSignature};
use fretsync_view::{CursorAnchor, ScrollConfig};
use serde::{Deserialize, Serialize};

use crate::Result;

#[cfg(feature = "graph")]
use std::sync::Arc;

#[cfg(feature = "graph")]
use fretsync_graph::{AudioGraphConfig, AudioGraphManager, AudioHost};

/// Tempo and overlay settings used for beat markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub bpm: f64,
    pub granularity: MarkerGranularity,
    pub anchor: CursorAnchor,
    pub time_signature: TimeSignature,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            granularity: MarkerGranularity::default(),
            anchor: CursorAnchor::default(),
            time_signature: TimeSignature::default(),
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> fretsync_core::Result<()> {
        fretsync_core::beat_timing(self.bpm, self.time_signature).map(|_| ())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub store: StoreConfig,
    pub frame: FrameConfig,
    pub scroll: ScrollConfig,
    pub timing: TimingConfig,
    #[cfg(feature = "graph")]
    pub graph: AudioGraphConfig,
}

impl SyncConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = fretsync_core::config::parse_toml(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: Self = fretsync_core::config::load_toml(path)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded sync config");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(fretsync_core::config::to_toml(self)?)
    }

    /// Checks every section.
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.frame.validate()?;
        self.scroll.validate()?;
        self.timing.validate()?;
        #[cfg(feature = "graph")]
        self.graph.validate()?;
        Ok(())
    }

    /// Audio graph manager on `host`, set up from the `[graph]` section.
    /// Pass it to [`SyncSessionBuilder::graph`](crate::SyncSessionBuilder::graph).
    #[cfg(feature = "graph")]
    pub fn graph_manager<H: AudioHost>(&self, host: H) -> Result<Arc<AudioGraphManager<H>>> {
        let graph = AudioGraphManager::new(host, self.graph.clone())?;
        tracing::debug!(
            sample_rate = self.graph.sample_rate,
            effects = self.graph.enable_effects,
            "Created audio graph from config"
        );
        Ok(Arc::new(graph))
    }
}
