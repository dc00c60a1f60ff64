//! Configuration loading into a working session.

use std::io::Write;

use fretsync::prelude::*;
use fretsync::{CursorAnchor, MarkerGranularity, ScrollBehavior};

use crate::helpers::*;

const FULL_CONFIG: &str = r#"
[store]
debounce_window_ms = 0
tolerance = 0.05

[frame]
only_when_playing = false
min_interval_ms = 0

[scroll]
leading_px = 200.0
trailing_px = 50.0
behavior = "instant"

[timing]
bpm = 90.0
time_signature = { numerator = 3, denominator = 4 }
granularity = "beat"
anchor = "interpolated"
"#;

#[test]
fn test_loaded_config_shapes_session() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL_CONFIG.as_bytes()).unwrap();

    let config = SyncConfig::load(file.path()).unwrap();
    assert_eq!(config.scroll.behavior, ScrollBehavior::Instant);
    assert_eq!(config.timing.granularity, MarkerGranularity::Beat);
    assert_eq!(config.timing.anchor, CursorAnchor::Interpolated);

    let (_probe, source) = ScriptedSource::new(1.75, 4.0, false);
    let viewport = ProbeViewport::new(400.0, 200.0);
    let mut session = SyncSession::builder()
        .config(config)
        .time_source(&source)
        .notation(Box::new(RowNotation::new(16)))
        .viewport(Box::new(viewport.clone()))
        .start(true)
        .build()
        .unwrap();
    assert_eq!(session.tempo(), 90.0);

    // Sampled while paused; interpolated half way through beat #3
    let outcome = session.on_frame(frame(0));
    assert_eq!(outcome.cursor.map(|c| c.x), Some(350.0));
    assert!(outcome.notified);

    // 4 s at 90 BPM: a beat every 2/3 s
    assert_eq!(session.markers().unwrap().len(), 6);

    // 350 is past 400 - 200, so the narrower band recenters instantly
    let command = viewport.commands()[0];
    assert_eq!(command.left, Some(150.0));
    assert_eq!(command.behavior, ScrollBehavior::Instant);
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = SyncConfig::from_toml_str(FULL_CONFIG).unwrap();
    let text = config.to_toml_string().unwrap();
    assert_eq!(SyncConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn test_invalid_config_fails_build() {
    let mut config = SyncConfig::default();
    config.store.tolerance = f64::NAN;
    assert!(SyncSession::builder().config(config).build().is_err());

    let mut config = SyncConfig::default();
    config.scroll.leading_px = -10.0;
    assert!(matches!(
        SyncSession::builder().config(config).build(),
        Err(Error::Core(fretsync::core::Error::InvalidConfig(_)))
    ));
}
