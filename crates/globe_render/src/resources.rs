//! GPU resource lifecycle
//!
//! Every buffer and texture is created through a [`GpuBackend`] and
//! recorded by the [`ResourceTracker`] of the feature that owns it (globe,
//! markers, routes, overlays, effects, helpers). Disposing a tracker
//! removes its objects from the [`World`] and releases its GPU resources.
//! Disposal is idempotent: a second call finds nothing left and returns 0.

use slotmap::{new_key_type, SlotMap};

use globe_core::{ObjectKey, SceneObject, World};

new_key_type! {
    /// Key to a backend allocation
    pub struct ResourceId;
}

/// What a resource is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer,
    Texture,
}

/// Allocator for GPU buffers and textures
pub trait GpuBackend {
    /// Create a vertex buffer holding `contents`
    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> ResourceId;

    /// Overwrite a buffer's contents, growing it if needed
    ///
    /// Returns false when the id is unknown or not a buffer.
    fn write_buffer(&mut self, id: ResourceId, contents: &[u8]) -> bool;

    /// Create an RGBA8 texture; `rgba` holds `width * height * 4` bytes
    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> ResourceId;

    /// Free a resource; false when it was already released
    fn release(&mut self, id: ResourceId) -> bool;

    fn kind(&self, id: ResourceId) -> Option<ResourceKind>;

    /// Number of allocations not yet released
    fn live_count(&self) -> usize;

    /// Bytes held by live allocations
    fn live_bytes(&self) -> usize;
}

#[derive(Clone, Debug)]
struct HeadlessResource {
    kind: ResourceKind,
    label: String,
    bytes: usize,
}

/// Backend that only does the bookkeeping
///
/// Used by tests and by headless runs; nothing touches a GPU.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    resources: SlotMap<ResourceId, HeadlessResource>,
    created: usize,
    released: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total allocations ever made
    pub fn created(&self) -> usize {
        self.created
    }

    /// Total allocations released
    pub fn released(&self) -> usize {
        self.released
    }

    pub fn label(&self, id: ResourceId) -> Option<&str> {
        self.resources.get(id).map(|r| r.label.as_str())
    }

    /// Size of a live allocation in bytes
    pub fn size_of(&self, id: ResourceId) -> Option<usize> {
        self.resources.get(id).map(|r| r.bytes)
    }

    fn insert(&mut self, kind: ResourceKind, label: &str, bytes: usize) -> ResourceId {
        self.created += 1;
        self.resources.insert(HeadlessResource {
            kind,
            label: label.to_string(),
            bytes,
        })
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> ResourceId {
        self.insert(ResourceKind::Buffer, label, contents.len())
    }

    fn write_buffer(&mut self, id: ResourceId, contents: &[u8]) -> bool {
        match self.resources.get_mut(id) {
            Some(resource) if resource.kind == ResourceKind::Buffer => {
                resource.bytes = resource.bytes.max(contents.len());
                true
            }
            _ => false,
        }
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, _rgba: &[u8]) -> ResourceId {
        self.insert(ResourceKind::Texture, label, width as usize * height as usize * 4)
    }

    fn release(&mut self, id: ResourceId) -> bool {
        if self.resources.remove(id).is_some() {
            self.released += 1;
            true
        } else {
            false
        }
    }

    fn kind(&self, id: ResourceId) -> Option<ResourceKind> {
        self.resources.get(id).map(|r| r.kind)
    }

    fn live_count(&self) -> usize {
        self.resources.len()
    }

    fn live_bytes(&self) -> usize {
        self.resources.values().map(|r| r.bytes).sum()
    }
}

/// Resources and scene objects owned by one feature
#[derive(Debug)]
pub struct ResourceTracker {
    name: String,
    resources: Vec<ResourceId>,
    objects: Vec<ObjectKey>,
}

impl ResourceTracker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
            objects: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn track_resource(&mut self, id: ResourceId) {
        if !self.resources.contains(&id) {
            self.resources.push(id);
        }
    }

    pub fn track_object(&mut self, key: ObjectKey) {
        if !self.objects.contains(&key) {
            self.objects.push(key);
        }
    }

    /// Add an object to the world and track it
    pub fn spawn(&mut self, world: &mut World, object: SceneObject) -> ObjectKey {
        let key = world.add(object);
        self.objects.push(key);
        key
    }

    /// Create a texture and track it
    pub fn upload_texture<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> ResourceId {
        let id = backend.create_texture(label, width, height, rgba);
        self.resources.push(id);
        id
    }

    /// Create a buffer and track it
    pub fn upload_buffer<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        label: &str,
        contents: &[u8],
    ) -> ResourceId {
        let id = backend.create_buffer(label, contents);
        self.resources.push(id);
        id
    }

    /// Stop tracking an object without removing it
    pub fn untrack_object(&mut self, key: ObjectKey) -> bool {
        let before = self.objects.len();
        self.objects.retain(|k| *k != key);
        self.objects.len() != before
    }

    /// Remove a single tracked object from the world now
    pub fn remove_object(&mut self, world: &mut World, key: ObjectKey) -> bool {
        self.untrack_object(key) && world.remove(key).is_some()
    }

    /// Release one tracked resource now
    pub fn release_resource<B: GpuBackend + ?Sized>(&mut self, backend: &mut B, id: ResourceId) -> bool {
        let before = self.resources.len();
        self.resources.retain(|r| *r != id);
        self.resources.len() != before && backend.release(id)
    }

    pub fn objects(&self) -> &[ObjectKey] {
        &self.objects
    }

    pub fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.resources.is_empty()
    }

    /// Remove every tracked object and release every tracked resource
    ///
    /// Returns how many objects and resources were actually freed. Keys
    /// already gone from the world and ids already released are skipped.
    pub fn dispose<B: GpuBackend + ?Sized>(&mut self, backend: &mut B, world: &mut World) -> usize {
        let mut freed = 0;
        for key in self.objects.drain(..) {
            if world.remove(key).is_some() {
                freed += 1;
            }
        }
        for id in self.resources.drain(..) {
            if backend.release(id) {
                freed += 1;
            }
        }
        if freed > 0 {
            log::debug!("Disposed {} resources from '{}'", freed, self.name);
        }
        freed
    }
}
