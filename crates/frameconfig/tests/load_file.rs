use std::fs;

use frameconfig::{ConfigError, FrameConfig};
use tempfile::TempDir;

#[test]
fn loads_config_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hyperframe.toml");
    fs::write(
        &path,
        "version = 1\n[render]\nwidth = 640\nheight = 480\n[telemetry]\nmetrics_interval = \"2s\"\n",
    )
    .unwrap();

    let config = FrameConfig::load(&path).unwrap();
    assert_eq!((config.render.width, config.render.height), (640, 480));
    assert_eq!(config.telemetry.metrics_interval.as_secs(), 2);
}

#[test]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = FrameConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.version, 1);
    assert_eq!(config.render.title, "hyperframe");
}

#[test]
fn missing_file_is_an_error_for_explicit_load() {
    let dir = TempDir::new().unwrap();
    let err = FrameConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn written_defaults_round_trip_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("defaults.toml");
    fs::write(&path, FrameConfig::default().to_toml_string().unwrap()).unwrap();
    let reloaded = FrameConfig::load(&path).unwrap();
    assert_eq!(reloaded.telemetry, FrameConfig::default().telemetry);
}
