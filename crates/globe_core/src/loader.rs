//! Cooperative texture loading
//!
//! The [`TextureLoader`] queues texture paths and loads at most one per
//! [`poll`](TextureLoader::poll), so the frame loop keeps running while
//! textures stream in. Progress is exposed through [`LoadProgress`]. A
//! failed load fills the error slot, clears the loading flag and hands the
//! error back to the caller; it never panics inside the frame loop.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::asset_cache::{AssetCache, AssetHandle, TextureAsset};
use crate::asset_error::AssetError;
use crate::tween::CancellationToken;

/// Observable loading state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
    pub is_loading: bool,
    /// Message of the most recent failure
    pub error: Option<String>,
}

impl LoadProgress {
    /// Fraction complete, 0.0-1.0 (1.0 when nothing was requested)
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.loaded as f32 / self.total as f32
        }
    }
}

struct LoadRequest {
    path: PathBuf,
    token: CancellationToken,
}

/// Queue of pending texture loads
#[derive(Default)]
pub struct TextureLoader {
    queue: VecDeque<LoadRequest>,
    progress: LoadProgress,
}

impl TextureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a texture, returning the token that cancels it
    pub fn enqueue(&mut self, path: impl AsRef<Path>) -> CancellationToken {
        let token = CancellationToken::new();
        let path = path.as_ref().to_path_buf();
        log::debug!("Queued texture {}", path.display());
        self.queue.push_back(LoadRequest {
            path,
            token: token.clone(),
        });
        self.progress.total += 1;
        self.progress.is_loading = true;
        token
    }

    /// Load the next pending texture into `cache`
    ///
    /// Cancelled requests are dropped without touching the file system and
    /// no longer count toward the total. Returns `None` when nothing is left.
    pub fn poll(&mut self, cache: &mut AssetCache) -> Option<Result<AssetHandle, AssetError>> {
        let request = loop {
            let request = self.queue.pop_front()?;
            if request.token.is_cancelled() {
                log::debug!("Dropped cancelled texture load {}", request.path.display());
                self.progress.total = self.progress.total.saturating_sub(1);
                self.finish_if_idle();
                continue;
            }
            break request;
        };

        self.progress.is_loading = true;
        log::info!("Loading texture {}", request.path.display());
        match cache.load::<TextureAsset>(&request.path) {
            Ok(handle) => {
                self.progress.loaded += 1;
                log::debug!(
                    "Texture progress {}/{} ({:.0}%)",
                    self.progress.loaded,
                    self.progress.total,
                    self.progress.fraction() * 100.0
                );
                self.finish_if_idle();
                Some(Ok(handle))
            }
            Err(err) => {
                log::error!("Failed to load texture {}: {}", request.path.display(), err);
                self.progress.total = self.progress.total.saturating_sub(1);
                self.progress.error = Some(err.to_string());
                self.progress.is_loading = false;
                Some(Err(err))
            }
        }
    }

    fn finish_if_idle(&mut self) {
        if self.queue.is_empty() {
            self.progress.is_loading = false;
        }
    }

    /// Cancel and drop every pending request
    ///
    /// Dropped requests leave the total, so progress settles at what
    /// actually loaded and the loader is idle right away.
    pub fn cancel_all(&mut self) {
        let dropped = self.queue.len();
        for request in self.queue.drain(..) {
            request.token.cancel();
        }
        self.progress.total = self.progress.total.saturating_sub(dropped);
        self.progress.is_loading = false;
        if dropped > 0 {
            log::debug!("Cancelled {} pending texture load(s)", dropped);
        }
    }

    pub fn progress(&self) -> &LoadProgress {
        &self.progress
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear_error(&mut self) {
        self.progress.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_loads_one_per_poll() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AssetCache::new();
        let mut loader = TextureLoader::new();
        loader.enqueue(png(&dir, "a.png"));
        loader.enqueue(png(&dir, "b.png"));
        assert!(loader.progress().is_loading);
        assert_eq!(loader.progress().fraction(), 0.0);

        assert!(loader.poll(&mut cache).unwrap().is_ok());
        assert_eq!(loader.progress().fraction(), 0.5);
        assert!(loader.progress().is_loading);

        assert!(loader.poll(&mut cache).unwrap().is_ok());
        assert!(!loader.progress().is_loading);
        assert!(loader.poll(&mut cache).is_none());
        assert_eq!(cache.asset_count(), 2);
    }

    #[test]
    fn test_failure_sets_error_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AssetCache::new();
        let mut loader = TextureLoader::new();
        loader.enqueue(dir.path().join("missing.jpg"));

        let result = loader.poll(&mut cache).unwrap();
        assert!(matches!(result, Err(AssetError::Io(_))));
        assert!(!loader.progress().is_loading);
        assert!(loader.progress().error.is_some());

        loader.clear_error();
        assert!(loader.progress().error.is_none());
    }

    #[test]
    fn test_cancelled_request_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AssetCache::new();
        let mut loader = TextureLoader::new();
        let token = loader.enqueue(png(&dir, "a.png"));
        loader.enqueue(png(&dir, "b.png"));
        token.cancel();

        let handle = loader.poll(&mut cache).unwrap().unwrap();
        assert!(handle.path().ends_with("b.png"));
        assert_eq!(loader.progress().total, 1);
        assert_eq!(loader.progress().fraction(), 1.0);
        assert_eq!(cache.asset_count(), 1);
    }

    #[test]
    fn test_cancel_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AssetCache::new();
        let mut loader = TextureLoader::new();
        let first = loader.enqueue(png(&dir, "a.png"));
        loader.enqueue(png(&dir, "b.png"));
        loader.cancel_all();

        // Idle before any further poll
        assert!(first.is_cancelled());
        assert_eq!(loader.pending(), 0);
        assert!(!loader.progress().is_loading);
        assert_eq!(loader.progress().total, 0);
        assert_eq!(loader.progress().fraction(), 1.0);

        assert!(loader.poll(&mut cache).is_none());
        assert_eq!(cache.asset_count(), 0);
    }

    #[test]
    fn test_cancel_all_keeps_finished_loads() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = AssetCache::new();
        let mut loader = TextureLoader::new();
        loader.enqueue(png(&dir, "a.png"));
        loader.enqueue(png(&dir, "b.png"));
        assert!(loader.poll(&mut cache).unwrap().is_ok());

        loader.cancel_all();
        assert_eq!(loader.progress().loaded, 1);
        assert_eq!(loader.progress().total, 1);
        assert!(!loader.progress().is_loading);

        loader.enqueue(png(&dir, "c.png"));
        assert!(loader.progress().is_loading);
        assert!(loader.poll(&mut cache).unwrap().is_ok());
        assert_eq!(loader.progress().fraction(), 1.0);
    }
}
