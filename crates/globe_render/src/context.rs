//! Explicit rendering context
//!
//! A [`RenderContext`] owns everything a frame needs: the scene [`World`],
//! the camera, the GPU backend, the animation scheduler and one
//! [`ResourceTracker`] per [`Feature`]. It is constructed once and passed
//! by reference; there is no global renderer.
//!
//! GPU vertex buffers for object meshes are owned by the context itself and
//! follow the world: [`RenderContext::sync_gpu`] uploads meshes marked dirty
//! and releases buffers whose object has gone.

use slotmap::SecondaryMap;

use globe_core::{DirtyFlags, ObjectKey, SceneObject, Topology, World};
use globe_math::{Ease, Vec3};

use crate::camera::PerspectiveCamera;
use crate::effects::{AnimationScheduler, CameraTween, EffectKey, Tickable, TickSummary};
use crate::pipeline::{vertices_from_mesh, DrawItem, ObjectUniforms};
use crate::resources::{GpuBackend, ResourceId, ResourceKind, ResourceTracker};

/// Owner of a group of scene objects and GPU resources
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    Globe,
    Markers,
    Routes,
    Overlays,
    Effects,
    Helpers,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::Globe,
        Feature::Markers,
        Feature::Routes,
        Feature::Overlays,
        Feature::Effects,
        Feature::Helpers,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::Globe => "globe",
            Feature::Markers => "markers",
            Feature::Routes => "routes",
            Feature::Overlays => "overlays",
            Feature::Effects => "effects",
            Feature::Helpers => "helpers",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Uploaded vertex data of one object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GpuMesh {
    buffer: ResourceId,
    vertex_count: u32,
    topology: Topology,
}

/// Split borrow of a context for code that builds one feature
pub struct ContextParts<'a, B: GpuBackend> {
    pub world: &'a mut World,
    pub backend: &'a mut B,
    pub tracker: &'a mut ResourceTracker,
}

/// Counters for the performance monitor
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: u32,
    pub triangles: u64,
    pub textures: u32,
    pub memory_bytes: usize,
    pub objects: usize,
}

pub struct RenderContext<B: GpuBackend> {
    world: World,
    camera: PerspectiveCamera,
    backend: B,
    scheduler: AnimationScheduler,
    trackers: [ResourceTracker; 6],
    gpu_meshes: SecondaryMap<ObjectKey, GpuMesh>,
    flight: Option<(EffectKey, globe_core::CancellationToken)>,
}

impl<B: GpuBackend> RenderContext<B> {
    pub fn new(backend: B, camera: PerspectiveCamera) -> Self {
        Self {
            world: World::new(),
            camera,
            backend,
            scheduler: AnimationScheduler::new(),
            trackers: Feature::ALL.map(|f| ResourceTracker::new(f.name())),
            gpu_meshes: SecondaryMap::new(),
            flight: None,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut AnimationScheduler {
        &mut self.scheduler
    }

    pub fn tracker(&self, feature: Feature) -> &ResourceTracker {
        &self.trackers[feature.index()]
    }

    /// World, backend and the tracker of `feature`, borrowed together
    pub fn parts(&mut self, feature: Feature) -> ContextParts<'_, B> {
        ContextParts {
            world: &mut self.world,
            backend: &mut self.backend,
            tracker: &mut self.trackers[feature.index()],
        }
    }

    /// Add an object owned by `feature`
    pub fn spawn(&mut self, feature: Feature, object: SceneObject) -> ObjectKey {
        self.trackers[feature.index()].spawn(&mut self.world, object)
    }

    /// Remove everything `feature` owns; returns how much was freed
    pub fn dispose_feature(&mut self, feature: Feature) -> usize {
        let freed = self.trackers[feature.index()].dispose(&mut self.backend, &mut self.world);
        self.release_orphaned_meshes();
        freed
    }

    /// Start an effect
    pub fn add_effect<T: Tickable + 'static>(&mut self, effect: T) -> EffectKey {
        self.scheduler.add(effect)
    }

    /// Stop an effect and free whatever it owned
    pub fn remove_effect(&mut self, key: EffectKey) -> bool {
        let removed = self
            .scheduler
            .remove(key, &mut self.trackers[Feature::Effects.index()]);
        if removed {
            self.dispose_feature(Feature::Effects);
        }
        removed
    }

    /// Fly the camera to `destination`, cancelling any flight in progress
    pub fn fly_to(&mut self, destination: Vec3, look_at: Vec3, duration: f32, ease: Ease) -> EffectKey {
        if let Some((_, token)) = self.flight.take() {
            token.cancel();
        }
        let tween = CameraTween::new(destination, look_at, duration, ease);
        let token = tween.token();
        let key = self.scheduler.add(tween);
        self.flight = Some((key, token));
        key
    }

    /// True while a camera flight is running
    pub fn is_flying(&self) -> bool {
        self.flight
            .as_ref()
            .is_some_and(|(key, token)| !token.is_cancelled() && self.scheduler.contains(*key))
    }

    /// Advance every effect by `dt` seconds
    pub fn tick(&mut self, dt: f32) -> TickSummary {
        let summary = self.scheduler.tick(
            &mut self.world,
            &mut self.camera,
            &mut self.trackers[Feature::Effects.index()],
            dt,
        );
        if summary.retired > 0 {
            self.dispose_feature(Feature::Effects);
        }
        if self
            .flight
            .as_ref()
            .is_some_and(|(key, _)| !self.scheduler.contains(*key))
        {
            self.flight = None;
        }
        summary
    }

    /// Bring GPU buffers in line with the world
    ///
    /// Objects seen for the first time or with a dirty mesh are uploaded.
    /// Buffers of removed objects, or of objects that lost their mesh, are
    /// released. Returns how many meshes were uploaded.
    pub fn sync_gpu(&mut self) -> usize {
        let mut uploaded = 0;
        for (key, object) in self.world.iter() {
            let Some(mesh) = object.mesh() else {
                if let Some(stale) = self.gpu_meshes.remove(key) {
                    self.backend.release(stale.buffer);
                }
                continue;
            };
            let known = self.gpu_meshes.get(key).copied();
            if known.is_some() && !object.dirty_flags().contains(DirtyFlags::MESH) {
                continue;
            }

            let vertices = vertices_from_mesh(mesh);
            let bytes: &[u8] = bytemuck::cast_slice(&vertices);
            let buffer = match known {
                Some(gpu) if self.backend.write_buffer(gpu.buffer, bytes) => gpu.buffer,
                _ => self.backend.create_buffer(&object.name, bytes),
            };
            self.gpu_meshes.insert(
                key,
                GpuMesh {
                    buffer,
                    vertex_count: vertices.len() as u32,
                    topology: mesh.topology,
                },
            );
            uploaded += 1;
        }
        self.world.clear_all_dirty();
        self.release_orphaned_meshes();
        uploaded
    }

    fn release_orphaned_meshes(&mut self) {
        let orphans: Vec<ObjectKey> = self
            .gpu_meshes
            .keys()
            .filter(|key| !self.world.contains(*key))
            .collect();
        for key in orphans {
            if let Some(gpu) = self.gpu_meshes.remove(key) {
                self.backend.release(gpu.buffer);
            }
        }
    }

    /// Visible uploaded objects, opaque ones first
    pub fn draw_list(&self) -> Vec<DrawItem> {
        let mut items: Vec<DrawItem> = self
            .world
            .iter()
            .filter(|(_, object)| object.visible)
            .filter_map(|(key, object)| {
                let gpu = self.gpu_meshes.get(key)?;
                (gpu.vertex_count > 0).then(|| DrawItem {
                    key,
                    buffer: gpu.buffer,
                    vertex_count: gpu.vertex_count,
                    topology: gpu.topology,
                    uniforms: ObjectUniforms {
                        model: object.transform.matrix(),
                        color: object.material.rgba(),
                    },
                })
            })
            .collect();
        items.sort_by_key(DrawItem::is_translucent);
        items
    }

    pub fn stats(&self) -> FrameStats {
        let draws = self.draw_list();
        let triangles = draws
            .iter()
            .filter_map(|item| self.world.get(item.key)?.mesh())
            .map(|mesh| mesh.triangle_count() as u64)
            .sum();
        let textures = self
            .trackers
            .iter()
            .flat_map(|t| t.resources().iter())
            .filter(|id| self.backend.kind(**id) == Some(ResourceKind::Texture))
            .count();
        FrameStats {
            draw_calls: draws.len() as u32,
            triangles,
            textures: textures as u32,
            memory_bytes: self.backend.live_bytes(),
            objects: self.world.len(),
        }
    }

    /// Tear everything down; a second call frees nothing and returns 0
    pub fn dispose_all(&mut self) -> usize {
        let effects = Feature::Effects.index();
        self.scheduler.dispose_all(&mut self.trackers[effects]);
        self.flight = None;

        let mut freed = 0;
        for tracker in &mut self.trackers {
            freed += tracker.dispose(&mut self.backend, &mut self.world);
        }
        for (_, gpu) in self.gpu_meshes.drain() {
            if self.backend.release(gpu.buffer) {
                freed += 1;
            }
        }
        if freed > 0 {
            log::info!("Render context released {} objects and resources", freed);
        }
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_core::{Mesh, ObjectKind};

    use crate::effects::GlobeRotation;
    use crate::geometry::uv_sphere;
    use crate::resources::HeadlessBackend;

    fn context() -> RenderContext<HeadlessBackend> {
        RenderContext::new(HeadlessBackend::new(), PerspectiveCamera::new())
    }

    fn globe(ctx: &mut RenderContext<HeadlessBackend>) -> ObjectKey {
        ctx.spawn(
            Feature::Globe,
            SceneObject::new("globe", ObjectKind::Globe).with_mesh(uv_sphere(2.0, 16)),
        )
    }

    #[test]
    fn test_sync_uploads_once_until_dirty() {
        let mut ctx = context();
        let key = globe(&mut ctx);
        assert_eq!(ctx.sync_gpu(), 1);
        assert_eq!(ctx.sync_gpu(), 0);
        assert_eq!(ctx.backend().live_count(), 1);

        ctx.world_mut().get_mut(key).unwrap().mark_mesh_dirty();
        assert_eq!(ctx.sync_gpu(), 1);
        assert_eq!(ctx.backend().live_count(), 1);
    }

    #[test]
    fn test_disposing_feature_releases_mesh_buffers() {
        let mut ctx = context();
        globe(&mut ctx);
        ctx.spawn(
            Feature::Markers,
            SceneObject::new("PEK", ObjectKind::CityMarker { city_id: "PEK".into() })
                .with_mesh(uv_sphere(0.05, 8)),
        );
        ctx.sync_gpu();
        assert_eq!(ctx.backend().live_count(), 2);

        assert_eq!(ctx.dispose_feature(Feature::Markers), 1);
        assert_eq!(ctx.backend().live_count(), 1);
        assert_eq!(ctx.world().len(), 1);
        assert_eq!(ctx.dispose_feature(Feature::Markers), 0);
    }

    #[test]
    fn test_draw_list_puts_translucent_last() {
        let mut ctx = context();
        let shell = ctx.spawn(
            Feature::Overlays,
            SceneObject::new("heatmap", ObjectKind::Heatmap).with_mesh(uv_sphere(2.02, 8)),
        );
        ctx.world_mut().get_mut(shell).unwrap().set_opacity(0.6);
        let solid = globe(&mut ctx);
        let hidden = ctx.spawn(
            Feature::Helpers,
            SceneObject::new("axes", ObjectKind::Helper)
                .with_mesh(Mesh::from_positions(Topology::LineStrip, vec![Vec3::ZERO, Vec3::X])),
        );
        ctx.world_mut().get_mut(hidden).unwrap().set_visible(false);
        ctx.sync_gpu();

        let keys: Vec<_> = ctx.draw_list().iter().map(|d| d.key).collect();
        assert_eq!(keys, vec![solid, shell]);
        let stats = ctx.stats();
        assert_eq!(stats.draw_calls, 2);
        assert!(stats.triangles > 0);
        assert_eq!(stats.objects, 3);
    }

    #[test]
    fn test_fly_to_replaces_previous_flight() {
        let mut ctx = context();
        let first = ctx.fly_to(Vec3::new(0.0, 0.0, 8.0), Vec3::ZERO, 1.0, Ease::Linear);
        ctx.tick(0.25);
        let second = ctx.fly_to(Vec3::new(4.0, 0.0, 4.0), Vec3::ZERO, 1.0, Ease::Linear);
        ctx.tick(0.25);
        assert!(!ctx.scheduler().contains(first));
        assert!(ctx.scheduler().contains(second));
        assert!(ctx.is_flying());

        for _ in 0..8 {
            ctx.tick(0.25);
        }
        assert!(!ctx.is_flying());
        assert!(ctx.camera().position.distance(Vec3::new(4.0, 0.0, 4.0)) < 1e-4);
    }

    #[test]
    fn test_effect_failure_keeps_loop_running() {
        let mut ctx = context();
        let key = globe(&mut ctx);
        ctx.add_effect(GlobeRotation::new(key, 0.001));
        ctx.world_mut().remove(key);
        let summary = ctx.tick(1.0 / 60.0);
        assert_eq!(summary.failed, 1);
        assert_eq!(ctx.scheduler().len(), 1);
    }

    #[test]
    fn test_dispose_all_is_idempotent() {
        let mut ctx = context();
        globe(&mut ctx);
        let tracker_tex = {
            let parts = ctx.parts(Feature::Overlays);
            parts.tracker.upload_texture(parts.backend, "heat", 4, 4, &[0u8; 64])
        };
        ctx.sync_gpu();
        assert_eq!(ctx.stats().textures, 1);
        assert_eq!(ctx.backend().kind(tracker_tex), Some(ResourceKind::Texture));

        // globe object + texture + globe vertex buffer
        assert_eq!(ctx.dispose_all(), 3);
        assert_eq!(ctx.backend().live_count(), 0);
        assert!(ctx.world().is_empty());
        assert_eq!(ctx.dispose_all(), 0);
    }
}
