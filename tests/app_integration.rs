//! End-to-end tests of the globe application on the headless backend

use globe_core::DataFormat;
use globe_logistics::config::AppConfig;
use globe_logistics::systems::SimulationSystem;
use globe_logistics::{AppError, GlobeApp};
use globe_render::{Feature, HeadlessBackend, OverlayMode};

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.globe.segments = 16;
    config.globe.data_file = None;
    config.animation.particle_count = 50;
    config.overlay.heatmap_size = 64;
    config
}

fn sample_app() -> GlobeApp<HeadlessBackend> {
    let mut app = GlobeApp::new(config(), HeadlessBackend::new());
    app.import_file("assets/sample-data.json").unwrap();
    app
}

const CSV: &str = "\
ID,Name,Country,Latitude,Longitude
PEK,Beijing,China,39.9042,116.4074
JFK,New York,United States,40.7128,-74.006

ROUTES
From,To,Type
PEK,JFK,air
";

#[test]
fn test_sample_dataset_loads() {
    let app = sample_app();
    assert_eq!(app.store().data().cities.len(), 8);
    assert_eq!(app.context().world().with_tag("marker").count(), 8);
    assert_eq!(app.context().tracker(Feature::Routes).objects().len(), 8);
    assert_eq!(app.overlays().points().len(), 8);
}

#[test]
fn test_csv_import_replaces_dataset() {
    let mut app = sample_app();
    app.import_str(CSV, DataFormat::Csv).unwrap();
    assert_eq!(app.store().data().cities.len(), 2);
    assert_eq!(app.context().world().with_tag("marker").count(), 2);
    assert_eq!(app.context().tracker(Feature::Routes).objects().len(), 1);
}

#[test]
fn test_rejected_import_keeps_scene() {
    let mut app = sample_app();
    let err = app.import_str("{ not json", DataFormat::Json).unwrap_err();
    assert!(matches!(err, AppError::Data(_)));
    assert_eq!(app.context().world().with_tag("marker").count(), 8);
}

#[test]
fn test_export_writes_readable_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.performance.report_dir = dir.path().to_string_lossy().into_owned();
    let mut app = GlobeApp::new(config, HeadlessBackend::new());
    app.import_str(CSV, DataFormat::Csv).unwrap();

    let path = app.export_data(DataFormat::Json).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["cities"].as_array().unwrap().len(), 2);
    assert_eq!(value["routes"][0]["id"], "PEK-JFK");
    assert!(value["metadata"]["modified"].is_string());
}

#[test]
fn test_overlay_modes_toggle() {
    let mut app = sample_app();
    assert_eq!(app.toggle_overlay_mode(OverlayMode::Heatmap), Some(OverlayMode::Heatmap));
    assert!(app.overlays().heatmap_image().is_some());
    assert!(!app.context().tracker(Feature::Overlays).objects().is_empty());

    assert_eq!(app.toggle_overlay_mode(OverlayMode::Category), Some(OverlayMode::Category));
    assert_eq!(app.toggle_overlay_mode(OverlayMode::Category), None);
    assert!(app.context().tracker(Feature::Overlays).objects().is_empty());
}

#[test]
fn test_frames_run_without_failures() {
    let mut app = sample_app();
    app.set_overlay_mode(Some(OverlayMode::TimeSeries));
    let mut sim = SimulationSystem::new();
    for _ in 0..120 {
        let summary = sim.step(&mut app, 1.0 / 60.0);
        assert_eq!(summary.failed, 0);
    }
    assert!(app.monitor().fps() > 0);
    assert!(app.stats().draw_calls > 0);
}

#[test]
fn test_theme_cycle_keeps_data_layers() {
    let mut app = sample_app();
    let before = app.context().scheduler().len();
    let first = app.themes().current_name().to_string();
    let next = app.cycle_theme();
    assert_ne!(first, next);
    assert_eq!(app.context().world().with_tag("marker").count(), 8);
    assert_eq!(app.context().scheduler().len(), before);
}

#[test]
fn test_performance_report_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.performance.report_dir = dir.path().to_string_lossy().into_owned();
    let mut app = GlobeApp::new(config, HeadlessBackend::new());
    app.frame(1.0 / 60.0);

    let path = app.write_performance_report().unwrap();
    assert!(path.starts_with(dir.path()));
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("fps"));
}

#[test]
fn test_commit_without_route_adds_nothing() {
    let mut app = sample_app();
    assert_eq!(app.commit_route().unwrap(), 0);
    assert_eq!(app.store().data().routes.len(), 8);
}

#[test]
fn test_shutdown_releases_everything() {
    let mut app = sample_app();
    app.set_overlay_mode(Some(OverlayMode::Heatmap));
    app.frame(1.0 / 60.0);
    assert!(app.shutdown() > 0);

    let stats = app.stats();
    assert_eq!(stats.objects, 0);
    assert_eq!(stats.memory_bytes, 0);
    assert_eq!(app.context().scheduler().len(), 0);
    assert_eq!(app.shutdown(), 0);
}
