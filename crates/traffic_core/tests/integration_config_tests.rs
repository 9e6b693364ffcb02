mod support;

use std::io::Write;
use std::path::Path;

use traffic_core::config::EngineConfig;
use traffic_core::vehicles::VehicleClass;
use traffic_core::{ConfigError, ForecastWindow, TrafficEngine};

#[test]
fn bundled_dashboard_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/dashboard.json");
    let config = EngineConfig::load(&path).expect("bundled config");
    assert_eq!(config.seed, Some(2024));
    assert_eq!(config.vehicles.classes.len(), 4);
    assert_eq!(config.vehicles.classes[1], VehicleClass::Bus);
    assert_eq!(config.grid.hotspots.len(), 4);
    assert_eq!(config.forecast.default_window, ForecastWindow::Medium);
    // Unlisted profile fields keep their defaults.
    assert_eq!(config.forecast.profile.moderate_bonus, 15.0);
    assert!(TrafficEngine::new(config).is_ok());
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = EngineConfig::load(&dir.path().join("absent.json")).expect_err("missing");
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn load_validates_contents() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(file, r#"{{ "vehicles": {{ "speeds": [] }} }}"#).expect("write");
    let err = EngineConfig::load(file.path()).expect_err("invalid");
    assert!(matches!(err, ConfigError::Invalid { field: "vehicles.speeds", .. }));
}

#[test]
fn config_round_trips_through_json() {
    let config = EngineConfig::default().with_seed(9);
    let json = serde_json::to_string(&config).expect("encode");
    assert_eq!(EngineConfig::from_json_str(&json).expect("decode"), config);
}
