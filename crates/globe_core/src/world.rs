//! Scene world
//!
//! The [`World`] holds every drawable object: the globe, city markers,
//! route lines, particles and overlay geometry. Objects are addressed by
//! generational [`ObjectKey`]s so a key to a removed object never aliases a
//! newer one. Iteration follows insertion order.

use std::collections::HashSet;
use std::sync::Arc;

use bitflags::bitflags;
use slotmap::{new_key_type, SlotMap};

use globe_math::{mat4, Mat4, Vec3};

use crate::mesh::Mesh;
use crate::theme::Color;

new_key_type! {
    /// Key to an object in the world
    pub struct ObjectKey;
}

bitflags! {
    /// Parts of an object that changed since the renderer last looked
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        const NONE = 0;
        const TRANSFORM = 1 << 0;
        const MESH = 1 << 1;
        const MATERIAL = 1 << 2;
        const VISIBILITY = 1 << 3;
        const ALL = Self::TRANSFORM.bits()
            | Self::MESH.bits()
            | Self::MATERIAL.bits()
            | Self::VISIBILITY.bits();
    }
}

/// What an object represents
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectKind {
    Globe,
    CityMarker { city_id: String },
    /// Pulsing halo around a city marker
    MarkerRing { city_id: String },
    Route { route_id: String },
    Particles,
    OverlayPoint,
    Heatmap,
    Helper,
}

/// Position, uniform-per-axis scale and rotation about Y
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation_y: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation_y: 0.0,
        }
    }
}

impl Transform {
    /// Transform placed at `position`
    pub fn at(position: Vec3) -> Self {
        Self { position, ..Self::default() }
    }

    /// Model matrix for rendering
    pub fn matrix(&self) -> Mat4 {
        mat4::model_matrix(self.position, self.rotation_y, self.scale)
    }
}

/// Flat color with opacity
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: Color,
    pub opacity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            opacity: 1.0,
        }
    }
}

impl Material {
    pub fn new(color: Color, opacity: f32) -> Self {
        Self { color, opacity }
    }

    /// Color with the opacity folded into alpha
    pub fn rgba(&self) -> [f32; 4] {
        self.color.with_alpha(self.color.a * self.opacity).to_array()
    }
}

/// An object in the scene
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: String,
    pub tags: HashSet<String>,
    pub kind: ObjectKind,
    pub transform: Transform,
    pub material: Material,
    pub visible: bool,
    /// Considered by ray picking
    pub pickable: bool,
    /// Bounding sphere radius in object space (scaled by the largest scale axis)
    pub bounding_radius: f32,
    mesh: Option<Arc<Mesh>>,
    dirty: DirtyFlags,
}

impl SceneObject {
    /// New visible, non-pickable object
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            tags: HashSet::new(),
            kind,
            transform: Transform::default(),
            material: Material::default(),
            visible: true,
            pickable: false,
            bounding_radius: 0.0,
            mesh: None,
            dirty: DirtyFlags::ALL,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Make the object pickable with the given bounding radius
    pub fn with_pick_radius(mut self, radius: f32) -> Self {
        self.pickable = true;
        self.bounding_radius = radius;
        self
    }

    /// Attach geometry; meshes are shared until first mutated
    pub fn with_mesh(mut self, mesh: impl Into<Arc<Mesh>>) -> Self {
        self.mesh = Some(mesh.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// World-space bounding sphere as (center, radius)
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        let s = self.transform.scale.abs();
        let max_scale = s.x.max(s.y).max(s.z);
        (self.transform.position, self.bounding_radius * max_scale)
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.dirty |= DirtyFlags::TRANSFORM;
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.transform.scale = Vec3::splat(scale);
        self.dirty |= DirtyFlags::TRANSFORM;
    }

    pub fn set_rotation_y(&mut self, angle: f32) {
        self.transform.rotation_y = angle;
        self.dirty |= DirtyFlags::TRANSFORM;
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.material.opacity = opacity;
        self.dirty |= DirtyFlags::MATERIAL;
    }

    pub fn set_color(&mut self, color: Color) {
        self.material.color = color;
        self.dirty |= DirtyFlags::MATERIAL;
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.dirty |= DirtyFlags::VISIBILITY;
        }
    }

    /// Mark the object's geometry as rebuilt-needed
    pub fn mark_mesh_dirty(&mut self) {
        self.dirty |= DirtyFlags::MESH;
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_deref()
    }

    /// Shared handle to the mesh
    pub fn mesh_arc(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    /// Replace the geometry
    pub fn set_mesh(&mut self, mesh: impl Into<Arc<Mesh>>) {
        self.mesh = Some(mesh.into());
        self.dirty |= DirtyFlags::MESH;
    }

    /// Mutable geometry, cloned first if shared
    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        let mesh = self.mesh.as_mut()?;
        self.dirty |= DirtyFlags::MESH;
        Some(Arc::make_mut(mesh))
    }

    #[inline]
    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = DirtyFlags::NONE;
    }
}

/// Container for all scene objects
#[derive(Debug, Default)]
pub struct World {
    objects: SlotMap<ObjectKey, SceneObject>,
    /// Insertion order; removed keys are pruned on removal
    order: Vec<ObjectKey>,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object, returning its key
    pub fn add(&mut self, object: SceneObject) -> ObjectKey {
        let key = self.objects.insert(object);
        self.order.push(key);
        key
    }

    /// Remove an object; `None` if the key is stale
    pub fn remove(&mut self, key: ObjectKey) -> Option<SceneObject> {
        let object = self.objects.remove(key)?;
        self.order.retain(|k| *k != key);
        Some(object)
    }

    pub fn get(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    pub fn get_mut(&mut self, key: ObjectKey) -> Option<&mut SceneObject> {
        self.objects.get_mut(key)
    }

    pub fn contains(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate (key, object) in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectKey, &SceneObject)> {
        self.order
            .iter()
            .filter_map(|&k| self.objects.get(k).map(|o| (k, o)))
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.order.iter().copied()
    }

    /// First object with this name
    pub fn find_by_name(&self, name: &str) -> Option<ObjectKey> {
        self.iter().find(|(_, o)| o.name == name).map(|(k, _)| k)
    }

    /// All objects carrying a tag, in insertion order
    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = ObjectKey> + 'a {
        self.iter().filter(move |(_, o)| o.has_tag(tag)).map(|(k, _)| k)
    }

    /// True if any object is dirty
    pub fn has_dirty(&self) -> bool {
        self.objects.values().any(SceneObject::is_dirty)
    }

    /// Clear all dirty flags after the renderer has synced
    pub fn clear_all_dirty(&mut self) {
        for object in self.objects.values_mut() {
            object.clear_dirty();
        }
    }

    /// Remove every object
    pub fn clear(&mut self) {
        self.objects.clear();
        self.order.clear();
    }
}
