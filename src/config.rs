//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`GLOBE_SECTION__KEY`)

use figment::{Figment, providers::{Format, Toml, Env}};
use serde::{Serialize, Deserialize};
use std::path::Path;

use globe_input::OrbitController;
use globe_math::{ArcStyle, Ease, SphereConvention, Vec3};
use globe_render::overlay::{HeatmapSettings, OverlayMode, OverlaySettings};
use globe_render::{PerspectiveCamera, PostSettings};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    /// Orbit controls
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub globe: GlobeConfig,
    /// Markers, routes and particles
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub post_processing: PostSettings,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`GLOBE_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // GLOBE_WINDOW__TITLE=Test -> window.title = "Test"
        figment = figment.merge(Env::prefixed("GLOBE_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }
}

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Globe Logistics".to_string(),
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
        }
    }
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Starting position [x, y, z]
    pub start_position: [f32; 3],
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Seconds a fly-to takes
    pub tween_duration: f32,
    pub tween_ease: Ease,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            start_position: [0.0, 0.0, 5.0],
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
            tween_duration: 1.0,
            tween_ease: Ease::Power2InOut,
        }
    }
}

impl CameraConfig {
    pub fn build(&self) -> PerspectiveCamera {
        let [x, y, z] = self.start_position;
        PerspectiveCamera::new()
            .with_position(Vec3::new(x, y, z))
            .with_fov(self.fov)
            .with_clip(self.near, self.far)
    }
}

/// Orbit control configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Fraction of the angular velocity applied per frame; 0 disables damping
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Panning is not supported; kept so user files that set it still load
    pub enable_pan: bool,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            damping: 0.05,
            rotate_speed: 0.5,
            zoom_speed: 1.0,
            min_distance: 3.0,
            max_distance: 10.0,
            enable_pan: false,
        }
    }
}

impl ControlsConfig {
    pub fn build(&self) -> OrbitController {
        OrbitController::new()
            .with_rotate_speed(self.rotate_speed)
            .with_zoom_speed(self.zoom_speed)
            .with_damping(self.damping)
            .with_distance_range(self.min_distance, self.max_distance)
    }
}

/// Globe and dataset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub radius: f32,
    pub segments: u32,
    pub convention: SphereConvention,
    pub arc_style: ArcStyle,
    /// Earth texture queued at startup
    pub texture: Option<String>,
    /// Dataset imported at startup; format follows the extension
    pub data_file: Option<String>,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            radius: 2.0,
            segments: 64,
            convention: SphereConvention::Polar,
            arc_style: ArcStyle::default(),
            texture: None,
            data_file: Some("assets/sample-data.json".to_string()),
        }
    }
}

/// Effect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub pulse_speed: f32,
    /// Ring size relative to its marker
    pub pulse_scale: f32,
    pub route_fade: bool,
    pub fly_lines: bool,
    pub particle_count: usize,
    pub particle_speed: f32,
    pub particle_seed: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            pulse_speed: 1.0,
            pulse_scale: 1.5,
            route_fade: true,
            fly_lines: true,
            particle_count: 1000,
            particle_speed: 1.0,
            particle_seed: 0x5eed,
        }
    }
}

/// Pointer interaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// 1-based mode index: view, select, measure, route, area
    pub start_mode: usize,
    /// Tint hovered markers with the theme highlight color
    pub hover_highlight: bool,
    /// Fly to a city when its marker is clicked in view mode
    pub fly_on_click: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            start_mode: 1,
            hover_highlight: true,
            fly_on_click: true,
        }
    }
}

/// Overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Unset shows no overlay
    pub mode: Option<OverlayMode>,
    pub heatmap_size: u32,
    pub heatmap_radius: f32,
    pub heatmap_intensity: f32,
    pub heatmap_blur: f32,
    pub density_size_scale: f32,
    pub time_speed: f64,
    pub time_loop: bool,
    /// Points within this many milliseconds of playback time are shown
    pub time_window_ms: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        let heatmap = HeatmapSettings::default();
        let overlay = OverlaySettings::default();
        Self {
            mode: None,
            heatmap_size: heatmap.size,
            heatmap_radius: heatmap.radius,
            heatmap_intensity: heatmap.intensity,
            heatmap_blur: heatmap.blur,
            density_size_scale: heatmap.density_size_scale,
            time_speed: overlay.time_speed,
            time_loop: overlay.time_loop,
            time_window_ms: overlay.time_window,
        }
    }
}

impl OverlayConfig {
    pub fn settings(&self, globe: &GlobeConfig) -> OverlaySettings {
        OverlaySettings {
            globe_radius: globe.radius,
            shell_segments: globe.segments,
            heatmap: HeatmapSettings {
                size: self.heatmap_size,
                radius: self.heatmap_radius,
                intensity: self.heatmap_intensity,
                blur: self.heatmap_blur,
                density_size_scale: self.density_size_scale,
                ..HeatmapSettings::default()
            },
            time_speed: self.time_speed,
            time_loop: self.time_loop,
            time_window: self.time_window_ms,
        }
    }
}

/// Theme configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub active: String,
    /// RON theme files registered at startup
    pub custom_files: Vec<String>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            active: globe_core::DEFAULT_THEME.to_string(),
            custom_files: Vec::new(),
        }
    }
}

/// Performance monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Lower sphere detail while the frame rate stays low
    pub adaptive_quality: bool,
    /// GPU memory the memory tip is measured against
    pub memory_budget_mb: u32,
    /// Where performance reports are written
    pub report_dir: String,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            adaptive_quality: true,
            memory_budget_mb: 512,
            report_dir: ".".to_string(),
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace); `RUST_LOG` wins when set
    pub log_level: String,
    /// Draw axis lines through the globe
    pub show_helpers: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            show_helpers: false,
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.camera.fov, 45.0);
        assert_eq!(config.camera.far, 1000.0);
        assert_eq!(config.controls.damping, 0.05);
        assert_eq!(config.globe.segments, 64);
        assert_eq!(config.post_processing.bloom_strength, 1.5);
        assert_eq!(config.overlay.heatmap_size, 1024);
        assert_eq!(config.overlay.time_window_ms, 1000.0);
        assert_eq!(config.theme.active, "dark");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("title"));
        assert!(toml.contains("[post_processing]"));
        assert!(toml.contains("tween_ease = \"power2_in_out\""));
    }

    #[test]
    fn test_partial_sections_fall_back_to_defaults() {
        let config: AppConfig = toml::from_str("[globe]\nradius = 3.0\n").unwrap();
        assert_eq!(config.globe.radius, 3.0);
        assert_eq!(config.globe.segments, 64);
        assert_eq!(config.window.title, "Globe Logistics");
    }

    #[test]
    fn test_overlay_settings_follow_globe() {
        let globe = GlobeConfig { radius: 4.0, ..GlobeConfig::default() };
        let overlay = OverlayConfig {
            heatmap_size: 256,
            ..OverlayConfig::default()
        };
        let settings = overlay.settings(&globe);
        assert_eq!(settings.globe_radius, 4.0);
        assert_eq!(settings.heatmap.size, 256);
        assert_eq!(settings.heatmap.color_scale.len(), 4);
    }

    #[test]
    fn test_overlay_mode_names() {
        let config: AppConfig = toml::from_str("[overlay]\nmode = \"time_series\"\n").unwrap();
        assert_eq!(config.overlay.mode, Some(OverlayMode::TimeSeries));
        assert!(toml::from_str::<AppConfig>("[overlay]\nmode = \"sparkles\"\n").is_err());
    }

    #[test]
    fn test_controls_build_orbit() {
        let orbit = ControlsConfig { damping: 0.0, ..ControlsConfig::default() }.build();
        assert!(!orbit.enable_damping);
        assert_eq!(orbit.min_distance, 3.0);
        assert_eq!(orbit.max_distance, 10.0);
    }
}
