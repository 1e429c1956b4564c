//! The globe application
//!
//! [`GlobeApp`] wires the dataset, the theme registry, the input
//! controllers and the overlays onto one [`RenderContext`]. It knows
//! nothing about windows or wgpu: the binary feeds it pointer events and
//! frame times, and reads back draw lists and uniforms.
//!
//! Scene ownership:
//! - The globe mesh belongs to [`Feature::Globe`].
//! - City markers and their pulse rings belong to [`Feature::Markers`].
//! - Route arcs belong to [`Feature::Routes`].
//! - Heatmap, time-series and category geometry belong to [`Feature::Overlays`].
//! - Measurement, route previews and axes belong to [`Feature::Helpers`].
//!
//! Reloading data disposes markers and routes together with the effects
//! animating them before anything new is built.

use std::path::{Path, PathBuf};

use globe_core::{
    AssetCache, City, Color, ColorRole, DataFormat, DataIoError, DataStore, FlightRoute,
    GlobalData, Material, Mesh, ObjectKey, ObjectKind, SceneObject, TextureAsset,
    TextureLoader, ThemeError, ThemeRegistry, Topology, Transform, pick_ray_filtered,
};
use globe_input::{InteractionController, InteractionMode, OrbitController};
use globe_math::{lat_lon_to_vec3, route_arc, Vec3};
use globe_render::geometry::{append_instance, line_strip, paint_by_uv, uv_sphere};
use globe_render::pipeline::{FrameUniforms, PostUniforms};
use globe_render::{
    DataPoint, EffectKey, Feature, FlyLine, FrameStats, GlobeRotation, GpuBackend, MarkerPulse,
    MemoryUsage, OverlayManager, OverlayMode, ParticleField, PerformanceMonitor,
    PerformanceReport, PerspectiveCamera, PostChain, PostPassKind, QualityTier, RenderContext,
    ResourceId, RouteFade, SceneInfo, TickSummary,
};

use crate::config::AppConfig;

/// Marker sphere radius relative to the globe radius
const MARKER_RADIUS_RATIO: f32 = 0.02;
/// Markers float just above the surface
const MARKER_LIFT: f32 = 1.02;
const MARKER_OPACITY: f32 = 0.8;
const RING_OPACITY: f32 = 0.4;
/// Route opacity before any fade runs
const ROUTE_OPACITY: f32 = 0.6;
/// Helper lines sit above the markers
const HELPER_LIFT: f32 = 1.03;
/// Theme marker size that maps to a scale of 1
const REFERENCE_MARKER_SIZE: f32 = 0.5;
/// Asset dependent name for the earth texture
const GLOBE_DEPENDENT: &str = "globe";

/// Error from an application operation
#[derive(Debug)]
pub enum AppError {
    /// Import, export or validation failed
    Data(DataIoError),
    /// Theme switch or theme file failed
    Theme(ThemeError),
    /// No city with this id in the dataset
    UnknownCity(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Data(err) => write!(f, "{}", err),
            AppError::Theme(err) => write!(f, "{}", err),
            AppError::UnknownCity(id) => write!(f, "Unknown city '{}'", id),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Data(err) => Some(err),
            AppError::Theme(err) => Some(err),
            AppError::UnknownCity(_) => None,
        }
    }
}

impl From<DataIoError> for AppError {
    fn from(err: DataIoError) -> Self {
        AppError::Data(err)
    }
}

impl From<ThemeError> for AppError {
    fn from(err: ThemeError) -> Self {
        AppError::Theme(err)
    }
}

/// The globe visualization, independent of any window
pub struct GlobeApp<B: GpuBackend> {
    config: AppConfig,
    ctx: RenderContext<B>,
    store: DataStore,
    themes: ThemeRegistry,
    orbit: OrbitController,
    interaction: InteractionController,
    overlays: OverlayManager,
    post: PostChain,
    monitor: PerformanceMonitor,
    quality: QualityTier,
    loader: TextureLoader,
    assets: AssetCache,
    globe: Option<ObjectKey>,
    globe_texture: Option<(TextureAsset, ResourceId)>,
    rotation: Option<EffectKey>,
    particles: Option<(EffectKey, ObjectKey)>,
    /// Pulses, fades and fly lines of the current markers and routes
    data_effects: Vec<EffectKey>,
    highlighted: Option<ObjectKey>,
    pointer: (f32, f32),
    viewport: (u32, u32),
}

impl<B: GpuBackend> GlobeApp<B> {
    /// Build the scene from `config` on top of `backend`
    ///
    /// The dataset starts empty; see [`GlobeApp::import_file`].
    pub fn new(config: AppConfig, backend: B) -> Self {
        let viewport = (config.window.width.max(1), config.window.height.max(1));
        let mut camera = config.camera.build();
        camera.set_viewport(viewport.0, viewport.1);

        let mut themes = ThemeRegistry::new();
        for path in &config.theme.custom_files {
            if let Err(e) = themes.load_theme_file(path) {
                log::warn!("Skipping theme file {}: {}", path, e);
            }
        }
        if let Err(e) = themes.switch_theme(&config.theme.active) {
            log::warn!("Configured theme unavailable, keeping '{}': {}", themes.current_name(), e);
        }

        let mut interaction = InteractionController::new();
        match InteractionMode::from_index(config.interaction.start_mode) {
            Some(mode) => interaction.set_mode(mode),
            None => log::warn!("Unknown interaction mode index {}", config.interaction.start_mode),
        }

        let mut loader = TextureLoader::new();
        if let Some(texture) = &config.globe.texture {
            loader.enqueue(texture);
        }

        let mut app = Self {
            ctx: RenderContext::new(backend, camera),
            store: DataStore::new(),
            themes,
            orbit: config.controls.build(),
            interaction,
            overlays: OverlayManager::new(config.overlay.settings(&config.globe)),
            post: PostChain::from_config(&config.post_processing, viewport.0, viewport.1),
            monitor: PerformanceMonitor::new(),
            quality: QualityTier::new(config.globe.segments),
            loader,
            assets: AssetCache::new(),
            globe: None,
            globe_texture: None,
            rotation: None,
            particles: None,
            data_effects: Vec::new(),
            highlighted: None,
            pointer: (0.0, 0.0),
            viewport,
            config,
        };
        app.build_globe();
        app.build_particles();
        app.rebuild_data_layers();
        if let Some(mode) = app.config.overlay.mode {
            app.set_overlay_mode(Some(mode));
        }
        app
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn context(&self) -> &RenderContext<B> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut RenderContext<B> {
        &mut self.ctx
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn themes(&self) -> &ThemeRegistry {
        &self.themes
    }

    pub fn orbit_mut(&mut self) -> &mut OrbitController {
        &mut self.orbit
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn overlays(&self) -> &OverlayManager {
        &self.overlays
    }

    pub fn post(&self) -> &PostChain {
        &self.post
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn loader(&self) -> &TextureLoader {
        &self.loader
    }

    pub fn globe(&self) -> Option<ObjectKey> {
        self.globe
    }

    /// Orbit controls take the mouse only in the browsing modes
    pub fn orbit_enabled(&self) -> bool {
        matches!(self.interaction.mode(), InteractionMode::View | InteractionMode::Select)
    }

    // --- Data ---------------------------------------------------------

    /// Replace the dataset and rebuild markers, routes and overlays
    ///
    /// An invalid dataset is rejected and the scene is left as it was.
    pub fn reload_data(&mut self, data: GlobalData) -> Result<(), AppError> {
        self.store.replace(data)?;
        self.rebuild_data_layers();
        Ok(())
    }

    /// Import a dataset file; the format follows the extension
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<(), AppError> {
        self.store.import_file(path)?;
        self.rebuild_data_layers();
        Ok(())
    }

    /// Import a dataset from text
    pub fn import_str(&mut self, content: &str, format: DataFormat) -> Result<(), AppError> {
        self.store.import_str(content, format)?;
        self.rebuild_data_layers();
        Ok(())
    }

    /// Write the dataset into the report directory
    pub fn export_data(&self, format: DataFormat) -> Result<PathBuf, AppError> {
        Ok(self.store.export_to_file(&self.config.performance.report_dir, format)?)
    }

    /// Flip route visibility; returns the new state
    pub fn toggle_lines(&mut self) -> bool {
        let shown = self.store.toggle_lines();
        let routes: Vec<ObjectKey> = self.ctx.tracker(Feature::Routes).objects().to_vec();
        for key in routes {
            if let Some(route) = self.ctx.world_mut().get_mut(key) {
                route.set_visible(shown);
            }
        }
        log::info!("Route lines {}", if shown { "shown" } else { "hidden" });
        shown
    }

    /// Turn the route built in route mode into dataset routes
    ///
    /// Every consecutive city pair becomes one route. Returns how many
    /// routes were added; the pending route is cleared either way.
    pub fn commit_route(&mut self) -> Result<usize, AppError> {
        let Some(cities) = self.interaction.route().map(<[String]>::to_vec) else {
            return Ok(0);
        };
        let mut data = self.store.data().clone();
        for pair in cities.windows(2) {
            data.routes.push(FlightRoute::between(pair[0].as_str(), pair[1].as_str()));
        }
        let added = cities.len() - 1;
        self.store.replace(data)?;
        self.interaction.clear();
        self.rebuild_data_layers();
        log::info!("Added {} routes from the route planner", added);
        Ok(added)
    }

    /// Ids of cities whose name contains `term`, case-insensitively
    pub fn search_cities(&self, term: &str) -> Vec<String> {
        self.interaction
            .search(self.ctx.world(), term)
            .into_iter()
            .filter_map(|key| city_id_of(&self.ctx.world().get(key)?.kind))
            .collect()
    }

    // --- Theme --------------------------------------------------------

    /// Switch to a named theme; unknown names change nothing
    pub fn switch_theme(&mut self, name: &str) -> Result<bool, AppError> {
        let changed = self.themes.switch_theme(name)?;
        if changed {
            self.apply_theme();
        }
        Ok(changed)
    }

    /// Advance to the next theme and return its name
    pub fn cycle_theme(&mut self) -> String {
        let name = self.themes.cycle().to_string();
        self.apply_theme();
        name
    }

    /// Register a theme from a RON file
    pub fn load_theme_file(&mut self, path: impl AsRef<Path>) -> Result<String, AppError> {
        Ok(self.themes.load_theme_file(path)?)
    }

    /// Background color of the active theme
    pub fn clear_color(&self) -> Color {
        self.themes.current().color(ColorRole::Background)
    }

    fn apply_theme(&mut self) {
        let theme = self.themes.current();
        let globe_color = theme.color(ColorRole::Globe);
        let particle_color = theme.color(ColorRole::Text);

        if let Some(key) = self.globe {
            if let Some(globe) = self.ctx.world_mut().get_mut(key) {
                globe.set_color(globe_color);
            }
        }
        if let Some((_, key)) = self.particles {
            if let Some(particles) = self.ctx.world_mut().get_mut(key) {
                particles.set_color(particle_color);
            }
        }
        self.restart_rotation();
        self.rebuild_data_layers();
    }

    // --- Modes --------------------------------------------------------

    pub fn set_interaction_mode(&mut self, mode: InteractionMode) {
        self.interaction.set_mode(mode);
        self.clear_highlight();
        self.orbit.stop();
        self.refresh_helpers();
    }

    /// Show `mode`, or hide overlays when it is already shown
    pub fn toggle_overlay_mode(&mut self, mode: OverlayMode) -> Option<OverlayMode> {
        let next = (self.overlays.mode() != Some(mode)).then_some(mode);
        self.set_overlay_mode(next);
        next
    }

    pub fn set_overlay_mode(&mut self, mode: Option<OverlayMode>) {
        let parts = self.ctx.parts(Feature::Overlays);
        self.overlays.set_mode(mode, parts.world, parts.backend, parts.tracker);
    }

    /// Flip bloom on or off; returns the new state
    pub fn toggle_bloom(&mut self) -> bool {
        self.post.toggle(PostPassKind::Bloom)
    }

    // --- Camera -------------------------------------------------------

    /// Fly the camera over a city, keeping the current distance
    pub fn fly_to_city(&mut self, city_id: &str) -> Result<(), AppError> {
        let city = self
            .store
            .city(city_id)
            .ok_or_else(|| AppError::UnknownCity(city_id.to_string()))?;
        let surface = self.city_position(city, 1.0);
        let distance = self
            .ctx
            .camera()
            .distance_to_target()
            .clamp(self.orbit.min_distance, self.orbit.max_distance);
        let destination = surface.normalized() * distance;
        log::info!("Flying to {} ({})", city.name, city.id);

        self.orbit.stop();
        let camera = &self.config.camera;
        self.ctx
            .fly_to(destination, Vec3::ZERO, camera.tween_duration, camera.tween_ease);
        Ok(())
    }

    // --- Pointer ------------------------------------------------------

    /// Pointer moved to pixel position (`x`, `y`)
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        let ndc = PerspectiveCamera::ndc_from_pixels(x, y, self.viewport.0 as f32, self.viewport.1 as f32);
        self.pointer = ndc;
        let ray = self.ctx.camera().ray_from_ndc(ndc);
        self.interaction.pointer_moved(ndc, ray.as_ref(), self.ctx.world());
        if self.config.interaction.hover_highlight {
            self.update_highlight();
        }
    }

    /// Primary button pressed at the last pointer position
    pub fn pointer_down(&mut self) {
        let ray = self.ctx.camera().ray_from_ndc(self.pointer);
        self.interaction.pointer_down(ray.as_ref(), self.ctx.world());

        match self.interaction.mode() {
            InteractionMode::View => {
                let clicked = self
                    .interaction
                    .click()
                    .and_then(|key| city_id_of(&self.ctx.world().get(key)?.kind));
                if let Some(city_id) = clicked {
                    log::info!("Selected city {}", city_id);
                    if self.config.interaction.fly_on_click {
                        if let Err(e) = self.fly_to_city(&city_id) {
                            log::warn!("{}", e);
                        }
                    }
                }
            }
            InteractionMode::Route => {
                let hit = ray.as_ref().and_then(|ray| {
                    pick_ray_filtered(self.ctx.world(), ray, |object| {
                        matches!(object.kind, ObjectKind::CityMarker { .. })
                    })
                });
                let city = hit.and_then(|hit| city_id_of(&self.ctx.world().get(hit.key)?.kind));
                if let Some(city_id) = city {
                    log::debug!("Route point {}", city_id);
                    self.interaction.add_route_point(city_id);
                    self.refresh_helpers();
                }
            }
            InteractionMode::Measure => self.refresh_helpers(),
            InteractionMode::Select | InteractionMode::Area => {}
        }
    }

    /// Primary button released
    pub fn pointer_up(&mut self) {
        self.interaction.pointer_up(self.ctx.world(), self.ctx.camera());
    }

    fn update_highlight(&mut self) {
        let hovered = self.interaction.hovered().filter(|key| {
            self.ctx
                .world()
                .get(*key)
                .is_some_and(|o| matches!(o.kind, ObjectKind::CityMarker { .. }))
        });
        if hovered == self.highlighted {
            return;
        }
        self.clear_highlight();
        if let Some(key) = hovered {
            let color = self.themes.current().color(ColorRole::Highlight);
            if let Some(marker) = self.ctx.world_mut().get_mut(key) {
                marker.set_color(color);
            }
            self.highlighted = Some(key);
        }
    }

    fn clear_highlight(&mut self) {
        if let Some(key) = self.highlighted.take() {
            let color = self.themes.current().color(ColorRole::Marker);
            if let Some(marker) = self.ctx.world_mut().get_mut(key) {
                marker.set_color(color);
            }
        }
    }

    // --- Frame --------------------------------------------------------

    /// Track a new viewport size in pixels
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        self.ctx.camera_mut().set_viewport(width, height);
        self.post.resize(width, height);
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Advance everything by `dt` seconds and bring the GPU up to date
    pub fn frame(&mut self, dt: f32) -> TickSummary {
        if !self.ctx.is_flying() {
            let height = self.viewport.1 as f32;
            self.orbit.update(self.ctx.camera_mut(), height);
        }

        let summary = self.ctx.tick(dt);
        self.overlays.update(self.ctx.world_mut(), dt);
        self.poll_textures();
        self.ctx.sync_gpu();

        if self.monitor.record_frame(dt) && self.config.performance.adaptive_quality {
            if let Some(segments) = self.quality.adjust(self.monitor.is_low_performance()) {
                self.rebuild_globe_mesh(segments);
            }
        }
        let stats = self.ctx.stats();
        let budget = self.config.performance.memory_budget_mb as usize * 1024 * 1024;
        self.monitor.set_counters(
            stats.draw_calls,
            stats.triangles,
            stats.textures,
            MemoryUsage::from_bytes(stats.memory_bytes, budget),
        );
        summary
    }

    pub fn stats(&self) -> FrameStats {
        self.ctx.stats()
    }

    /// Camera parameters for the scene pass
    pub fn frame_uniforms(&self) -> FrameUniforms {
        FrameUniforms {
            view_projection: self.ctx.camera().view_projection(),
            ..FrameUniforms::default()
        }
    }

    /// Post-processing parameters for the composite pass
    pub fn post_uniforms(&self) -> PostUniforms {
        let camera = self.ctx.camera();
        let mut uniforms = PostUniforms {
            near: camera.near,
            far: camera.far,
            ..PostUniforms::default()
        };
        self.post.write_uniforms(&mut uniforms);
        uniforms
    }

    pub fn performance_report(&self) -> PerformanceReport {
        let world = self.ctx.world();
        let scene_info = SceneInfo {
            objects: world.len(),
            materials: world.iter().filter(|(_, o)| o.mesh().is_some()).count(),
        };
        PerformanceReport::new(&self.monitor, scene_info)
    }

    /// Write a performance report into the report directory
    pub fn write_performance_report(&self) -> std::io::Result<PathBuf> {
        let path = self
            .performance_report()
            .write_to(&self.config.performance.report_dir)?;
        log::info!("Performance report written to {}", path.display());
        Ok(path)
    }

    /// Release every scene object, effect and GPU resource
    ///
    /// Safe to call more than once. Returns how much was freed.
    pub fn shutdown(&mut self) -> usize {
        self.loader.cancel_all();
        let freed = self.ctx.dispose_all();
        self.globe = None;
        self.globe_texture = None;
        self.rotation = None;
        self.particles = None;
        self.data_effects.clear();
        self.highlighted = None;
        self.interaction.clear();
        self.assets.release_feature(GLOBE_DEPENDENT);
        self.assets.gc();
        freed
    }

    // --- Scene building -----------------------------------------------

    fn build_globe(&mut self) {
        let radius = self.config.globe.radius;
        let color = self.themes.current().color(ColorRole::Globe);
        let key = self.ctx.spawn(
            Feature::Globe,
            SceneObject::new("globe", ObjectKind::Globe)
                .with_mesh(uv_sphere(radius, self.quality.segments()))
                .with_material(Material::new(color, 1.0))
                .with_pick_radius(radius),
        );
        self.globe = Some(key);
        self.restart_rotation();
    }

    fn rebuild_globe_mesh(&mut self, segments: u32) {
        let mut mesh = uv_sphere(self.config.globe.radius, segments);
        if let Some((texture, _)) = &self.globe_texture {
            paint_texture(&mut mesh, texture);
        }
        if let Some(globe) = self.globe.and_then(|key| self.ctx.world_mut().get_mut(key)) {
            globe.set_mesh(mesh);
        }
    }

    fn restart_rotation(&mut self) {
        if let Some(key) = self.rotation.take() {
            self.ctx.remove_effect(key);
        }
        if let Some(globe) = self.globe {
            let speed = self.themes.current().animations.rotation_speed;
            self.rotation = Some(self.ctx.add_effect(GlobeRotation::new(globe, speed)));
        }
    }

    fn build_particles(&mut self) {
        let animation = &self.config.animation;
        if animation.particle_count == 0 {
            return;
        }
        let color = self.themes.current().color(ColorRole::Text);
        let field = ParticleField::spawn(
            self.ctx.world_mut(),
            animation.particle_count,
            animation.particle_speed * 0.01,
            animation.particle_seed,
            color,
        );
        if let Some(object) = field.key() {
            let effect = self.ctx.add_effect(field);
            self.particles = Some((effect, object));
        }
    }

    /// Dispose markers, routes and their effects, then build them again
    fn rebuild_data_layers(&mut self) {
        for key in self.data_effects.drain(..) {
            self.ctx.remove_effect(key);
        }
        self.highlighted = None;
        self.interaction.clear();
        self.ctx.dispose_feature(Feature::Markers);
        self.ctx.dispose_feature(Feature::Routes);

        self.build_markers();
        self.build_routes();
        self.load_overlay_points();
        self.refresh_helpers();
    }

    fn build_markers(&mut self) {
        let theme = self.themes.current();
        let marker_color = theme.color(ColorRole::Marker);
        let pulse = theme.animations.marker_pulse;
        let base_scale = theme.sizes.marker_size / REFERENCE_MARKER_SIZE;
        let marker_radius = self.config.globe.radius * MARKER_RADIUS_RATIO;
        let marker_mesh = std::sync::Arc::new(uv_sphere(marker_radius, 8));
        let animation = self.config.animation.clone();

        let cities = self.store.data().cities.clone();
        for city in &cities {
            let position = self.city_position(city, MARKER_LIFT);
            let transform = Transform {
                scale: Vec3::splat(base_scale),
                ..Transform::at(position)
            };
            let marker = self.ctx.spawn(
                Feature::Markers,
                SceneObject::new(city.name.clone(), ObjectKind::CityMarker { city_id: city.id.clone() })
                    .with_mesh(marker_mesh.clone())
                    .with_transform(transform)
                    .with_material(Material::new(marker_color, MARKER_OPACITY))
                    .with_pick_radius(marker_radius)
                    .with_tag("marker"),
            );
            if !pulse {
                continue;
            }
            let ring = self.ctx.spawn(
                Feature::Markers,
                SceneObject::new(format!("{} ring", city.name), ObjectKind::MarkerRing { city_id: city.id.clone() })
                    .with_mesh(marker_mesh.clone())
                    .with_transform(Transform {
                        scale: Vec3::splat(base_scale * animation.pulse_scale),
                        ..Transform::at(position)
                    })
                    .with_material(Material::new(marker_color, RING_OPACITY)),
            );
            let effect = MarkerPulse::new(marker, animation.pulse_speed)
                .with_ring(ring)
                .with_base_scale(base_scale)
                .with_ring_scale(animation.pulse_scale);
            self.data_effects.push(self.ctx.add_effect(effect));
        }
        log::debug!("Built {} city markers", cities.len());
    }

    fn build_routes(&mut self) {
        let theme = self.themes.current();
        let line_color = theme.color(ColorRole::Line);
        let line_speed = theme.animations.line_speed;
        let shown = self.store.show_lines();
        let style = self.config.globe.arc_style;
        let animation = self.config.animation.clone();

        let data = self.store.data().clone();
        let count = data.routes.len().max(1) as f32;
        for (i, route) in data.routes.iter().enumerate() {
            let Some((from, to)) = data.route_endpoints(route) else {
                log::warn!("Route {} has a missing endpoint", route.id);
                continue;
            };
            let arc = route_arc(self.city_position(from, 1.0), self.city_position(to, 1.0), style);
            let mut object = SceneObject::new(route.id.clone(), ObjectKind::Route { route_id: route.id.clone() })
                .with_mesh(line_strip(arc))
                .with_material(Material::new(line_color, ROUTE_OPACITY));
            object.visible = shown;
            let key = self.ctx.spawn(Feature::Routes, object);

            if animation.route_fade {
                let fade = RouteFade::new(key).with_phase(i as f32 / count);
                self.data_effects.push(self.ctx.add_effect(fade));
            }
            if animation.fly_lines {
                self.data_effects.push(self.ctx.add_effect(FlyLine::new(key, line_speed)));
            }
        }
        log::debug!("Built {} route arcs", data.routes.len());
    }

    fn load_overlay_points(&mut self) {
        let radius = self.overlays.settings().globe_radius;
        let convention = self.config.globe.convention;
        let points: Vec<DataPoint> = self
            .store
            .data()
            .cities
            .iter()
            .map(|city| city_data_point(city, radius, convention))
            .collect();
        let parts = self.ctx.parts(Feature::Overlays);
        self.overlays.set_data(points, parts.world, parts.backend, parts.tracker);
    }

    /// Measurement path, route preview and optional axes
    fn refresh_helpers(&mut self) {
        self.ctx.dispose_feature(Feature::Helpers);
        let highlight = self.themes.current().color(ColorRole::Highlight);
        let radius = self.config.globe.radius;

        let points = self.interaction.measure_points();
        if !points.is_empty() {
            let lifted: Vec<Vec3> = points
                .iter()
                .map(|p| p.normalized() * radius * HELPER_LIFT)
                .collect();
            let dot = uv_sphere(radius * MARKER_RADIUS_RATIO * 0.5, 8);
            let mut dots = Mesh::new(Topology::Triangles);
            for p in &lifted {
                append_instance(&mut dots, &dot, *p, 1.0, highlight.to_array());
            }
            self.spawn_helper("measure points", dots, highlight);
            if lifted.len() >= 2 {
                self.spawn_helper("measure path", line_strip(lifted), highlight);
            }
        }

        let planned: Vec<String> = self
            .interaction
            .route()
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        for pair in planned.windows(2) {
            let (Some(from), Some(to)) = (self.store.city(&pair[0]), self.store.city(&pair[1])) else {
                continue;
            };
            let arc = route_arc(
                self.city_position(from, HELPER_LIFT),
                self.city_position(to, HELPER_LIFT),
                self.config.globe.arc_style,
            );
            self.spawn_helper(&format!("route preview {}-{}", pair[0], pair[1]), line_strip(arc), highlight);
        }

        if self.config.debug.show_helpers {
            let length = radius * 1.5;
            let axes = [
                ("x axis", Vec3::X, Color::rgb(1.0, 0.0, 0.0)),
                ("y axis", Vec3::Y, Color::rgb(0.0, 1.0, 0.0)),
                ("z axis", Vec3::Z, Color::rgb(0.0, 0.0, 1.0)),
            ];
            for (name, axis, color) in axes {
                let line = Mesh::from_positions(Topology::LineStrip, vec![Vec3::ZERO, axis * length]);
                self.spawn_helper(name, line, color);
            }
        }
    }

    fn spawn_helper(&mut self, name: &str, mesh: Mesh, color: Color) {
        self.ctx.spawn(
            Feature::Helpers,
            SceneObject::new(name, ObjectKind::Helper)
                .with_mesh(mesh)
                .with_material(Material::new(color, 1.0)),
        );
    }

    // --- Textures -----------------------------------------------------

    fn poll_textures(&mut self) {
        let Some(result) = self.loader.poll(&mut self.assets) else {
            return;
        };
        let Ok(handle) = result else {
            // The loader has already logged the failure
            return;
        };
        self.assets.add_dependent(&handle, GLOBE_DEPENDENT);
        if let Some(texture) = self.assets.get::<TextureAsset>(&handle) {
            self.apply_globe_texture(&texture);
        }
    }

    /// Color the globe from a decoded earth texture
    ///
    /// An empty texture leaves the globe with its theme color.
    pub fn apply_globe_texture(&mut self, texture: &TextureAsset) -> bool {
        let (width, height) = texture.size();
        if width == 0 || height == 0 {
            log::warn!("Earth texture is empty; globe keeps its theme color");
            return false;
        }
        let parts = self.ctx.parts(Feature::Globe);
        if let Some((_, previous)) = self.globe_texture.take() {
            parts.tracker.release_resource(parts.backend, previous);
        }
        let id = parts
            .tracker
            .upload_texture(parts.backend, "earth", width, height, &texture.pixels);
        self.globe_texture = Some((texture.clone(), id));
        log::info!("Applied {}x{} {:?} earth texture", width, height, texture.source);
        self.rebuild_globe_mesh(self.quality.segments());
        if let Some(globe) = self.globe.and_then(|key| self.ctx.world_mut().get_mut(key)) {
            globe.set_color(Color::WHITE);
        }
        true
    }

    fn city_position(&self, city: &City, lift: f32) -> Vec3 {
        lat_lon_to_vec3(
            city.coordinates,
            self.config.globe.radius * lift,
            0.0,
            self.config.globe.convention,
        )
    }
}

impl<B: GpuBackend> Drop for GlobeApp<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn city_id_of(kind: &ObjectKind) -> Option<String> {
    match kind {
        ObjectKind::CityMarker { city_id } => Some(city_id.clone()),
        _ => None,
    }
}

/// Overlay point for a city
///
/// `timestamp` (milliseconds) and `density` are read from the city's free
/// form data when present.
fn city_data_point(city: &City, radius: f32, convention: globe_math::SphereConvention) -> DataPoint {
    let mut point = DataPoint::from_city(city, radius, convention);
    if let Some(data) = &city.data {
        if let Some(timestamp) = data.get("timestamp").and_then(|v| v.as_f64()) {
            point = point.with_timestamp(timestamp);
        }
        if let Some(density) = data.get("density").and_then(|v| v.as_f64()) {
            point = point.with_density(density as f32);
        }
    }
    point
}

/// Nearest-texel sample of an RGBA8 image at spherical UV
fn paint_texture(mesh: &mut Mesh, texture: &TextureAsset) {
    let (width, height) = texture.size();
    paint_by_uv(mesh, |u, v| {
        let x = (u.clamp(0.0, 1.0) * width as f32) as u32;
        let y = (v.clamp(0.0, 1.0) * height as f32) as u32;
        texture.pixel(x, y).map(|c| c as f32 / 255.0)
    });
}
