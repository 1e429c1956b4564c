//! Integration tests for configuration loading
//!
//! Tests that verify config loading from files and environment variables.

use std::fs;

use globe_logistics::config::AppConfig;
use globe_render::OverlayMode;
use serial_test::serial;

#[test]
#[serial]
fn test_env_override() {
    std::env::set_var("GLOBE_WINDOW__TITLE", "Test From Env");
    let config = AppConfig::load().unwrap();
    assert_eq!(config.window.title, "Test From Env");
    std::env::remove_var("GLOBE_WINDOW__TITLE");
}

#[test]
#[serial]
fn test_shipped_defaults_match_code_defaults() {
    std::env::remove_var("GLOBE_WINDOW__TITLE");
    let dir = tempfile::tempdir().unwrap();
    fs::copy("config/default.toml", dir.path().join("default.toml")).unwrap();

    let loaded = AppConfig::load_from(dir.path()).unwrap();
    let defaults = AppConfig::default();
    assert_eq!(loaded.window.title, defaults.window.title);
    assert_eq!(loaded.camera.tween_ease, defaults.camera.tween_ease);
    assert_eq!(loaded.globe.arc_style, defaults.globe.arc_style);
    assert_eq!(loaded.globe.data_file, defaults.globe.data_file);
    assert_eq!(loaded.animation.particle_seed, defaults.animation.particle_seed);
    assert_eq!(loaded.post_processing, defaults.post_processing);
    assert_eq!(loaded.overlay.mode, None);
}

#[test]
#[serial]
fn test_user_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("default.toml"), "[globe]\nradius = 2.0\nsegments = 64\n").unwrap();
    fs::write(
        dir.path().join("user.toml"),
        "[globe]\nsegments = 32\n\n[overlay]\nmode = \"category\"\n",
    )
    .unwrap();

    let config = AppConfig::load_from(dir.path()).unwrap();
    assert_eq!(config.globe.radius, 2.0);
    assert_eq!(config.globe.segments, 32);
    assert_eq!(config.overlay.mode, Some(OverlayMode::Category));
}

#[test]
#[serial]
fn test_env_beats_user_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("user.toml"), "[theme]\nactive = \"light\"\n").unwrap();
    std::env::set_var("GLOBE_THEME__ACTIVE", "dark");

    let config = AppConfig::load_from(dir.path()).unwrap();
    std::env::remove_var("GLOBE_THEME__ACTIVE");
    assert_eq!(config.theme.active, "dark");
}

#[test]
#[serial]
fn test_missing_directory_gives_defaults() {
    let config = AppConfig::load_from("does/not/exist").unwrap();
    assert_eq!(config.window.width, 1280);
}

#[test]
#[serial]
fn test_bad_value_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("default.toml"), "[globe]\nsegments = \"many\"\n").unwrap();

    let err = AppConfig::load_from(dir.path()).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}
