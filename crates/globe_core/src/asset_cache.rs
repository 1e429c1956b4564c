//! Texture cache
//!
//! Assets are loaded once per path and shared behind `Arc`. Features that
//! use a texture register themselves as dependents; [`AssetCache::gc`]
//! drops everything nobody depends on. Modified files can be picked up with
//! [`AssetCache::check_hot_reload`].
//!
//! ```ignore
//! let mut cache = AssetCache::new();
//! let handle = cache.load::<TextureAsset>("assets/earth.jpg")?;
//! cache.add_dependent(&handle, "globe");
//! let texture = cache.get::<TextureAsset>(&handle).unwrap();
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::asset_error::AssetError;

/// Identifier of a cached asset; 0 is never assigned
pub type AssetId = u64;

/// Handle to a cached asset
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct AssetHandle {
    id: AssetId,
    path: PathBuf,
}

impl AssetHandle {
    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Types that can be loaded from a file into the cache
pub trait Asset: Sized + Send + Sync + 'static {
    fn load_from_file(path: &Path) -> Result<Self, AssetError>;
}

/// Where a texture's pixels came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    /// Raw RGBA8 produced in memory (heatmaps)
    Rgba8,
}

impl ImageFormat {
    /// Detect the format from magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
        if bytes.starts_with(PNG) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(JPEG) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }
}

/// A decoded texture: row-major RGBA8 pixels
#[derive(Clone, Debug, PartialEq)]
pub struct TextureAsset {
    /// Encoding the pixels were decoded from
    pub source: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureAsset {
    /// Wrap an in-memory RGBA8 image
    pub fn rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(AssetError::Parse(format!(
                "RGBA8 texture {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            source: ImageFormat::Rgba8,
            width,
            height,
            pixels,
        })
    }

    /// Decode a PNG or JPEG file held in memory
    pub fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        let source = ImageFormat::sniff(bytes)
            .ok_or_else(|| AssetError::Parse("not a PNG or JPEG image".to_string()))?;
        let format = match source {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Rgba8 => {
                return Err(AssetError::Parse("raw RGBA8 has no file encoding".to_string()))
            }
        };
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| AssetError::Parse(format!("failed to decode {:?} image: {}", source, e)))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Ok(Self {
            source,
            width,
            height,
            pixels: decoded.into_raw(),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// RGBA of the pixel at (`x`, `y`), clamped to the edges
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width.saturating_sub(1)) as usize;
        let y = y.min(self.height.saturating_sub(1)) as usize;
        let i = (y * self.width as usize + x) * 4;
        match self.pixels.get(i..i + 4) {
            Some(p) => [p[0], p[1], p[2], p[3]],
            None => [0; 4],
        }
    }
}

impl Asset for TextureAsset {
    fn load_from_file(path: &Path) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes).map_err(|e| match e {
            AssetError::Parse(msg) => AssetError::Parse(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }
}

struct CachedEntry {
    data: Arc<dyn Any + Send + Sync>,
    path: PathBuf,
    load_time: SystemTime,
    /// Feature names holding this asset
    dependents: Vec<String>,
}

/// Type-erased asset cache with path deduplication
pub struct AssetCache {
    assets: HashMap<AssetId, CachedEntry>,
    path_index: HashMap<PathBuf, AssetId>,
    next_id: u64,
    watch_for_changes: bool,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetCache {
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
            path_index: HashMap::new(),
            next_id: 1,
            watch_for_changes: false,
        }
    }

    /// Load `path`, or return the existing handle if it is already cached
    pub fn load<T: Asset>(&mut self, path: impl AsRef<Path>) -> Result<AssetHandle, AssetError> {
        let path = path.as_ref().to_path_buf();
        if let Some(&id) = self.path_index.get(&path) {
            return Ok(AssetHandle { id, path });
        }
        let data = T::load_from_file(&path)?;
        Ok(self.store(path, Arc::new(data)))
    }

    /// Cache an asset built in memory under a virtual path
    ///
    /// An existing entry at the same path is replaced and keeps its id.
    pub fn insert<T: Asset>(&mut self, path: impl AsRef<Path>, asset: T) -> AssetHandle {
        let path = path.as_ref().to_path_buf();
        if let Some(&id) = self.path_index.get(&path) {
            if let Some(entry) = self.assets.get_mut(&id) {
                entry.data = Arc::new(asset);
                entry.load_time = SystemTime::now();
            }
            return AssetHandle { id, path };
        }
        self.store(path, Arc::new(asset))
    }

    fn store(&mut self, path: PathBuf, data: Arc<dyn Any + Send + Sync>) -> AssetHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.assets.insert(
            id,
            CachedEntry {
                data,
                path: path.clone(),
                load_time: SystemTime::now(),
                dependents: Vec::new(),
            },
        );
        self.path_index.insert(path.clone(), id);
        AssetHandle { id, path }
    }

    /// Fetch a cached asset; `None` if removed or of another type
    pub fn get<T: Asset>(&self, handle: &AssetHandle) -> Option<Arc<T>> {
        let entry = self.assets.get(&handle.id)?;
        entry.data.clone().downcast::<T>().ok()
    }

    pub fn add_dependent(&mut self, handle: &AssetHandle, feature: &str) {
        if let Some(entry) = self.assets.get_mut(&handle.id) {
            if !entry.dependents.iter().any(|d| d == feature) {
                entry.dependents.push(feature.to_string());
            }
        }
    }

    pub fn remove_dependent(&mut self, handle: &AssetHandle, feature: &str) {
        if let Some(entry) = self.assets.get_mut(&handle.id) {
            entry.dependents.retain(|d| d != feature);
        }
    }

    /// Drop `feature` from every asset's dependents
    pub fn release_feature(&mut self, feature: &str) {
        for entry in self.assets.values_mut() {
            entry.dependents.retain(|d| d != feature);
        }
    }

    pub fn dependents(&self, handle: &AssetHandle) -> Option<&[String]> {
        self.assets.get(&handle.id).map(|e| e.dependents.as_slice())
    }

    pub fn set_watch_for_changes(&mut self, enabled: bool) {
        self.watch_for_changes = enabled;
    }

    pub fn is_watching_for_changes(&self) -> bool {
        self.watch_for_changes
    }

    /// Reload assets of type `T` whose files changed since they were loaded
    pub fn check_hot_reload<T: Asset>(&mut self) -> Vec<AssetHandle> {
        if !self.watch_for_changes {
            return Vec::new();
        }

        let candidates: Vec<(AssetId, PathBuf, SystemTime)> = self
            .assets
            .iter()
            .filter(|(_, e)| e.data.clone().downcast::<T>().is_ok())
            .map(|(&id, e)| (id, e.path.clone(), e.load_time))
            .collect();

        let mut reloaded = Vec::new();
        for (id, path, load_time) in candidates {
            let Ok(modified) = std::fs::metadata(&path).and_then(|m| m.modified()) else {
                continue;
            };
            if modified <= load_time {
                continue;
            }
            match T::load_from_file(&path) {
                Ok(data) => {
                    if let Some(entry) = self.assets.get_mut(&id) {
                        entry.data = Arc::new(data);
                        entry.load_time = SystemTime::now();
                    }
                    log::info!("Hot-reloaded asset: {}", path.display());
                    reloaded.push(AssetHandle { id, path });
                }
                Err(err) => log::warn!("Failed to hot-reload asset {}: {}", path.display(), err),
            }
        }
        reloaded
    }

    /// Remove assets with no dependents, returning how many were removed
    pub fn gc(&mut self) -> usize {
        let orphans: Vec<AssetId> = self
            .assets
            .iter()
            .filter(|(_, e)| e.dependents.is_empty())
            .map(|(&id, _)| id)
            .collect();
        for id in &orphans {
            if let Some(entry) = self.assets.remove(id) {
                self.path_index.remove(&entry.path);
            }
        }
        if !orphans.is_empty() {
            log::debug!("Asset gc removed {} texture(s)", orphans.len());
        }
        orphans.len()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn contains(&self, handle: &AssetHandle) -> bool {
        self.assets.contains_key(&handle.id)
    }
}
