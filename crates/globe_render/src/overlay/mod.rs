//! Data overlays
//!
//! An [`OverlayManager`] shows one visualization of a set of [`DataPoint`]s
//! at a time:
//!
//! - [`OverlayMode::Heatmap`] - a rasterized [`HeatmapImage`] wrapped on a
//!   shell just above the globe, plus density markers
//! - [`OverlayMode::TimeSeries`] - points inside a moving time window
//! - [`OverlayMode::Category`] - one colored cluster per category label
//!
//! Every object and texture an overlay creates goes through the overlay
//! [`ResourceTracker`], so switching modes disposes the previous one first.

mod heatmap;
mod timeseries;
mod category;

pub use heatmap::{density_hue, density_radius, HeatmapImage, HeatmapSettings};
pub use timeseries::{TimeSeriesPlayer, DEFAULT_WINDOW_MS};
pub use category::{
    category_color, category_hash, category_radius, group_by_category, CategoryGroup,
    CATEGORY_POINT_SIZE, DEFAULT_CATEGORY,
};

use std::fmt;

use serde::{Deserialize, Serialize};

use globe_core::{City, Color, Material, Mesh, ObjectKey, ObjectKind, SceneObject, Topology, World};
use globe_math::{lat_lon_to_vec3, SphereConvention, Vec3};

use crate::geometry::{append_instance, paint_by_uv, uv_sphere};
use crate::resources::{GpuBackend, ResourceId, ResourceTracker};

/// Heatmap shell radius relative to the globe
pub const HEATMAP_SHELL_SCALE: f32 = 1.01;

/// Heatmap shell opacity
pub const HEATMAP_OPACITY: f32 = 0.6;

/// Density marker opacity
pub const DENSITY_OPACITY: f32 = 0.7;

/// Category cluster opacity
pub const CATEGORY_OPACITY: f32 = 0.8;

/// Time-series point radius
pub const SERIES_POINT_RADIUS: f32 = 0.3;

/// Segments of the small spheres used for points
const POINT_SEGMENTS: u32 = 8;

/// A measured value at a position on (or above) the globe
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub position: Vec3,
    pub value: f32,
    /// Milliseconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl DataPoint {
    pub fn new(position: Vec3, value: f32) -> Self {
        Self {
            position,
            value,
            timestamp: None,
            category: None,
            density: None,
            metadata: None,
        }
    }

    /// Point on the globe surface at a city, valued by its population
    pub fn from_city(city: &City, radius: f32, convention: SphereConvention) -> Self {
        let position = lat_lon_to_vec3(city.coordinates, radius, 0.0, convention);
        let value = city.population.map_or(1.0, |p| p as f32);
        Self::new(position, value).with_category(city.country.clone())
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = Some(density);
        self
    }
}

/// Which overlay is shown
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayMode {
    Heatmap,
    TimeSeries,
    Category,
}

impl OverlayMode {
    pub fn name(self) -> &'static str {
        match self {
            OverlayMode::Heatmap => "heatmap",
            OverlayMode::TimeSeries => "time_series",
            OverlayMode::Category => "category",
        }
    }
}

impl fmt::Display for OverlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Overlay configuration
#[derive(Clone, Debug, PartialEq)]
pub struct OverlaySettings {
    pub globe_radius: f32,
    /// Segments of the heatmap shell
    pub shell_segments: u32,
    pub heatmap: HeatmapSettings,
    /// Playback speed of the time series
    pub time_speed: f64,
    pub time_loop: bool,
    /// Visibility half-width of the time series in milliseconds
    pub time_window: f64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            globe_radius: 2.0,
            shell_segments: 64,
            heatmap: HeatmapSettings::default(),
            time_speed: 1.0,
            time_loop: true,
            time_window: DEFAULT_WINDOW_MS,
        }
    }
}

/// Owner of the active overlay's geometry
#[derive(Debug)]
pub struct OverlayManager {
    settings: OverlaySettings,
    mode: Option<OverlayMode>,
    points: Vec<DataPoint>,
    player: Option<TimeSeriesPlayer>,
    image: Option<HeatmapImage>,
    texture: Option<ResourceId>,
    series_key: Option<ObjectKey>,
    visible: Vec<usize>,
}

impl OverlayManager {
    pub fn new(settings: OverlaySettings) -> Self {
        Self {
            settings,
            mode: None,
            points: Vec::new(),
            player: None,
            image: None,
            texture: None,
            series_key: None,
            visible: Vec::new(),
        }
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn mode(&self) -> Option<OverlayMode> {
        self.mode
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn player(&self) -> Option<&TimeSeriesPlayer> {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> Option<&mut TimeSeriesPlayer> {
        self.player.as_mut()
    }

    /// Last rasterized heatmap
    pub fn heatmap_image(&self) -> Option<&HeatmapImage> {
        self.image.as_ref()
    }

    /// Texture holding the last rasterized heatmap
    pub fn heatmap_texture(&self) -> Option<ResourceId> {
        self.texture
    }

    /// Indices of the time-series points currently shown
    pub fn visible_points(&self) -> &[usize] {
        &self.visible
    }

    /// Switch overlays, disposing the previous one first
    ///
    /// `None` hides overlays entirely.
    pub fn set_mode<B: GpuBackend + ?Sized>(
        &mut self,
        mode: Option<OverlayMode>,
        world: &mut World,
        backend: &mut B,
        tracker: &mut ResourceTracker,
    ) {
        if mode != self.mode {
            log::info!(
                "Overlay mode: {} -> {}",
                self.mode.map_or("none", OverlayMode::name),
                mode.map_or("none", OverlayMode::name)
            );
        }
        self.mode = mode;
        self.rebuild(world, backend, tracker);
    }

    /// Replace the data set and rebuild the active overlay
    pub fn set_data<B: GpuBackend + ?Sized>(
        &mut self,
        points: Vec<DataPoint>,
        world: &mut World,
        backend: &mut B,
        tracker: &mut ResourceTracker,
    ) {
        self.points = points;
        self.player = TimeSeriesPlayer::spanning(&self.points).map(|player| {
            player
                .with_speed(self.settings.time_speed)
                .with_looping(self.settings.time_loop)
                .with_window(self.settings.time_window)
        });
        self.rebuild(world, backend, tracker);
    }

    /// Remove the active overlay's geometry, keeping mode and data
    pub fn clear<B: GpuBackend + ?Sized>(
        &mut self,
        world: &mut World,
        backend: &mut B,
        tracker: &mut ResourceTracker,
    ) -> usize {
        self.image = None;
        self.texture = None;
        self.series_key = None;
        self.visible.clear();
        tracker.dispose(backend, world)
    }

    /// Step time-series playback
    ///
    /// Returns true when the visible set changed and the point mesh was
    /// replaced.
    pub fn update(&mut self, world: &mut World, dt: f32) -> bool {
        if self.mode != Some(OverlayMode::TimeSeries) {
            return false;
        }
        let (Some(player), Some(key)) = (self.player.as_mut(), self.series_key) else {
            return false;
        };
        player.advance(dt);
        let visible = player.visible_indices(&self.points);
        if visible == self.visible {
            return false;
        }
        let mesh = series_mesh(&self.points, &visible);
        self.visible = visible;
        match world.get_mut(key) {
            Some(object) => {
                object.set_mesh(mesh);
                true
            }
            None => {
                log::warn!("Time series object vanished from the scene");
                self.series_key = None;
                false
            }
        }
    }

    fn rebuild<B: GpuBackend + ?Sized>(
        &mut self,
        world: &mut World,
        backend: &mut B,
        tracker: &mut ResourceTracker,
    ) {
        self.clear(world, backend, tracker);
        let Some(mode) = self.mode else {
            return;
        };
        if self.points.is_empty() {
            log::debug!("No data points for the {} overlay", mode);
            return;
        }
        match mode {
            OverlayMode::Heatmap => self.build_heatmap(world, backend, tracker),
            OverlayMode::TimeSeries => self.build_time_series(world, tracker),
            OverlayMode::Category => self.build_categories(world, tracker),
        }
    }

    fn build_heatmap<B: GpuBackend + ?Sized>(
        &mut self,
        world: &mut World,
        backend: &mut B,
        tracker: &mut ResourceTracker,
    ) {
        let image = HeatmapImage::render(&self.points, &self.settings.heatmap);
        let texture = tracker.upload_texture(backend, "heatmap", image.size(), image.size(), image.pixels());

        // Black stays transparent so the globe shows through
        let mut shell = uv_sphere(
            self.settings.globe_radius * HEATMAP_SHELL_SCALE,
            self.settings.shell_segments,
        );
        paint_by_uv(&mut shell, |u, v| {
            let [r, g, b, _] = image.sample(u, v);
            [r, g, b, r.max(g).max(b)]
        });
        tracker.spawn(
            world,
            SceneObject::new("heatmap", ObjectKind::Heatmap)
                .with_material(Material::new(Color::WHITE, HEATMAP_OPACITY))
                .with_mesh(shell),
        );

        if let Some(markers) = density_mesh(&self.points, self.settings.heatmap.density_size_scale) {
            tracker.spawn(
                world,
                SceneObject::new("density", ObjectKind::OverlayPoint)
                    .with_material(Material::new(Color::WHITE, DENSITY_OPACITY))
                    .with_mesh(markers),
            );
        }

        self.texture = Some(texture);
        self.image = Some(image);
    }

    fn build_time_series(&mut self, world: &mut World, tracker: &mut ResourceTracker) {
        self.visible = match &self.player {
            Some(player) => player.visible_indices(&self.points),
            None => (0..self.points.len()).collect(),
        };
        let mesh = series_mesh(&self.points, &self.visible);
        let key = tracker.spawn(
            world,
            SceneObject::new("time-series", ObjectKind::OverlayPoint).with_mesh(mesh),
        );
        self.series_key = Some(key);
    }

    fn build_categories(&mut self, world: &mut World, tracker: &mut ResourceTracker) {
        let unit = uv_sphere(1.0, POINT_SEGMENTS);
        for group in group_by_category(&self.points) {
            let mut cluster = Mesh::new(Topology::Triangles);
            for &i in &group.members {
                let point = &self.points[i];
                append_instance(&mut cluster, &unit, point.position, category_radius(point.value), [1.0; 4]);
            }
            tracker.spawn(
                world,
                SceneObject::new(format!("category-{}", group.label), ObjectKind::OverlayPoint)
                    .with_tag(group.label.clone())
                    .with_material(Material::new(group.color, CATEGORY_OPACITY))
                    .with_mesh(cluster),
            );
        }
    }
}

/// Small white spheres at the given points
fn series_mesh(points: &[DataPoint], visible: &[usize]) -> Mesh {
    let unit = uv_sphere(1.0, POINT_SEGMENTS);
    let mut mesh = Mesh::new(Topology::Triangles);
    for &i in visible {
        append_instance(&mut mesh, &unit, points[i].position, SERIES_POINT_RADIUS, [1.0; 4]);
    }
    mesh
}

/// Density markers, or `None` when no point carries a density
fn density_mesh(points: &[DataPoint], size_scale: f32) -> Option<Mesh> {
    let max_density = points.iter().filter_map(|p| p.density).fold(0.0f32, f32::max);
    if !points.iter().any(|p| p.density.is_some()) {
        return None;
    }
    let unit = uv_sphere(1.0, POINT_SEGMENTS);
    let mut mesh = Mesh::new(Topology::Triangles);
    for point in points {
        let Some(density) = point.density else {
            continue;
        };
        let d = if max_density > 0.0 { density / max_density } else { 0.0 };
        let color = Color::from_hsl(density_hue(d), 1.0, 0.5).to_array();
        append_instance(&mut mesh, &unit, point.position, density_radius(d, size_scale), color);
    }
    Some(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::HeadlessBackend;

    struct Harness {
        world: World,
        backend: HeadlessBackend,
        tracker: ResourceTracker,
        overlays: OverlayManager,
    }

    impl Harness {
        fn new() -> Self {
            let settings = OverlaySettings {
                shell_segments: 16,
                heatmap: HeatmapSettings {
                    size: 32,
                    ..HeatmapSettings::default()
                },
                ..OverlaySettings::default()
            };
            Self {
                world: World::new(),
                backend: HeadlessBackend::new(),
                tracker: ResourceTracker::new("overlays"),
                overlays: OverlayManager::new(settings),
            }
        }

        fn set_mode(&mut self, mode: Option<OverlayMode>) {
            self.overlays
                .set_mode(mode, &mut self.world, &mut self.backend, &mut self.tracker);
        }

        fn set_data(&mut self, points: Vec<DataPoint>) {
            self.overlays
                .set_data(points, &mut self.world, &mut self.backend, &mut self.tracker);
        }
    }

    fn sample_points() -> Vec<DataPoint> {
        vec![
            DataPoint::new(Vec3::new(2.0, 0.0, 0.0), 4.0).with_category("air").with_density(2.0),
            DataPoint::new(Vec3::new(0.0, 2.0, 0.0), 1.0).with_category("sea").with_timestamp(0.0),
            DataPoint::new(Vec3::new(0.0, 0.0, 2.0), 9.0).with_category("air").with_timestamp(5000.0),
        ]
    }

    #[test]
    fn test_no_data_builds_nothing() {
        let mut h = Harness::new();
        for mode in [OverlayMode::Heatmap, OverlayMode::TimeSeries, OverlayMode::Category] {
            h.set_mode(Some(mode));
            assert!(h.world.is_empty());
            assert_eq!(h.backend.live_count(), 0);
        }
        assert!(!h.overlays.update(&mut h.world, 1.0 / 60.0));
    }

    #[test]
    fn test_heatmap_uploads_texture_and_shell() {
        let mut h = Harness::new();
        h.set_data(sample_points());
        h.set_mode(Some(OverlayMode::Heatmap));

        assert_eq!(h.backend.live_count(), 1);
        assert!(h.overlays.heatmap_texture().is_some());
        assert_eq!(h.overlays.heatmap_image().map(|i| i.size()), Some(32));
        // Shell and density markers
        assert_eq!(h.world.len(), 2);
        let shell = h.world.find_by_name("heatmap").unwrap();
        let mesh = h.world.get(shell).unwrap().mesh().unwrap();
        assert!(mesh.is_consistent());
        assert!(mesh
            .colors
            .iter()
            .flatten()
            .all(|c| c.is_finite()));
    }

    #[test]
    fn test_switching_modes_disposes_previous() {
        let mut h = Harness::new();
        h.set_data(sample_points());
        h.set_mode(Some(OverlayMode::Heatmap));
        h.set_mode(Some(OverlayMode::Category));

        assert_eq!(h.backend.live_count(), 0);
        assert_eq!(h.backend.released(), 1);
        assert!(h.world.find_by_name("heatmap").is_none());
        // "air" and "sea"
        assert_eq!(h.world.len(), 2);
        let air = h.world.find_by_name("category-air").unwrap();
        let object = h.world.get(air).unwrap();
        assert_eq!(object.material.color, category_color("air"));
        assert_eq!(object.mesh().unwrap().vertex_count(), 2 * uv_sphere(1.0, POINT_SEGMENTS).vertex_count());

        h.set_mode(None);
        assert!(h.world.is_empty());
        assert!(h.tracker.is_empty());
    }

    #[test]
    fn test_time_series_replaces_mesh_as_window_moves() {
        let mut h = Harness::new();
        h.set_data(sample_points());
        h.set_mode(Some(OverlayMode::TimeSeries));

        // Untimed point plus the one at t=0
        assert_eq!(h.overlays.visible_points(), &[0, 1]);
        let key = h.world.find_by_name("time-series").unwrap();
        h.world.clear_all_dirty();

        // Nine half frames at speed 1 moves now to about 4500
        let mut changed = false;
        for _ in 0..9 {
            changed |= h.overlays.update(&mut h.world, 0.5 / 60.0);
        }
        assert!(changed);
        assert_eq!(h.overlays.visible_points(), &[0, 2]);
        assert!(h.world.get(key).unwrap().is_dirty());
    }

    #[test]
    fn test_density_markers_need_density() {
        let points = vec![DataPoint::new(Vec3::X, 1.0)];
        assert!(density_mesh(&points, 0.8).is_none());

        let points = vec![DataPoint::new(Vec3::X, 1.0).with_density(0.0)];
        let mesh = density_mesh(&points, 0.8).unwrap();
        assert!(mesh.positions.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_data_point_json() {
        let json = r#"{"position":{"x":1.0,"y":0.0,"z":0.0},"value":3.5,"category":"hub"}"#;
        let point: DataPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.category.as_deref(), Some("hub"));
        assert!(point.timestamp.is_none());
    }
}
