//! Frame-rate monitoring and quality scaling

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::geometry::MIN_SPHERE_SEGMENTS;

/// Below this many frames per second the session counts as slow
pub const LOW_FPS_THRESHOLD: u32 = 30;

/// Draw calls above which merging meshes is suggested
pub const DRAW_CALL_WARNING: u32 = 1000;

/// Memory ratio above which a leak warning is raised
pub const MEMORY_WARNING_RATIO: f64 = 0.8;

/// Segments a globe is lowered to on the first slow window
pub const REDUCED_SEGMENTS: u32 = 32;

/// Fewest segments quality scaling ever goes down to
pub const MIN_QUALITY_SEGMENTS: u32 = 16;

const MIB: f64 = 1024.0 * 1024.0;

/// Memory use in MiB
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used: f64,
    pub total: f64,
}

impl MemoryUsage {
    pub fn from_bytes(used: usize, budget: usize) -> Self {
        Self {
            used: (used as f64 / MIB).round(),
            total: (budget as f64 / MIB).round(),
        }
    }

    /// `used / total`, 0 when no budget is known
    pub fn ratio(&self) -> f64 {
        if self.total > 0.0 {
            self.used / self.total
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub fps: u32,
    pub memory: MemoryUsage,
    pub draw_calls: u32,
    pub triangles: u64,
    pub textures: u32,
}

impl PerformanceMetrics {
    /// Human-readable hints for the current numbers
    pub fn optimization_tips(&self) -> Vec<String> {
        let mut tips = Vec::new();
        if self.fps < LOW_FPS_THRESHOLD {
            tips.push("Low FPS: consider reducing scene complexity".to_string());
        }
        if self.draw_calls > DRAW_CALL_WARNING {
            tips.push("Too many draw calls: consider merging meshes".to_string());
        }
        if self.memory.ratio() > MEMORY_WARNING_RATIO {
            tips.push("High memory use: check for leaked resources".to_string());
        }
        tips
    }
}

/// Counts frames per one-second window
#[derive(Clone, Debug, Default)]
pub struct PerformanceMonitor {
    frames: u32,
    elapsed: f32,
    fps: u32,
    low: bool,
    metrics: PerformanceMetrics,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame
    ///
    /// Returns true when this frame closed a one-second window and `fps`
    /// was updated.
    pub fn record_frame(&mut self, dt: f32) -> bool {
        self.frames += 1;
        self.elapsed += dt.max(0.0);
        if self.elapsed < 1.0 {
            return false;
        }
        self.fps = self.frames;
        self.low = self.fps < LOW_FPS_THRESHOLD;
        self.frames = 0;
        self.elapsed = 0.0;
        self.metrics.fps = self.fps;
        true
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn is_low_performance(&self) -> bool {
        self.low
    }

    /// Store the renderer counters of the latest frame
    pub fn set_counters(&mut self, draw_calls: u32, triangles: u64, textures: u32, memory: MemoryUsage) {
        self.metrics = PerformanceMetrics {
            fps: self.fps,
            memory,
            draw_calls,
            triangles,
            textures,
        };
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn optimization_tips(&self) -> Vec<String> {
        self.metrics.optimization_tips()
    }
}

/// Sphere detail level that steps down while performance stays low
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QualityTier {
    segments: u32,
}

impl QualityTier {
    pub fn new(segments: u32) -> Self {
        Self {
            segments: segments.max(MIN_SPHERE_SEGMENTS),
        }
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Lower the detail level one step if `low`
    ///
    /// The first step drops to [`REDUCED_SEGMENTS`], later steps to three
    /// quarters, never below [`MIN_QUALITY_SEGMENTS`]. Returns the new
    /// segment count when it changed.
    pub fn adjust(&mut self, low: bool) -> Option<u32> {
        if !low || self.segments <= MIN_QUALITY_SEGMENTS {
            return None;
        }
        let next = if self.segments > REDUCED_SEGMENTS {
            REDUCED_SEGMENTS
        } else {
            (self.segments * 3 / 4).max(MIN_QUALITY_SEGMENTS)
        };
        log::info!("Lowering sphere quality: {} -> {} segments", self.segments, next);
        self.segments = next;
        Some(next)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub objects: usize,
    pub materials: usize,
}

/// Snapshot of the monitor, written out as JSON
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub timestamp: String,
    pub metrics: PerformanceMetrics,
    pub optimization_tips: Vec<String>,
    pub scene_info: SceneInfo,
}

impl PerformanceReport {
    pub fn new(monitor: &PerformanceMonitor, scene_info: SceneInfo) -> Self {
        Self {
            timestamp: globe_core::now_rfc3339(),
            metrics: *monitor.metrics(),
            optimization_tips: monitor.optimization_tips(),
            scene_info,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write `performance-report-{timestamp}.json` into `dir`
    pub fn write_to(&self, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
        let stamp: String = self
            .timestamp
            .chars()
            .map(|c| if c == ':' { '-' } else { c })
            .collect();
        let path = dir.as_ref().join(format!("performance-report-{}.json", stamp));
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_per_second_window() {
        let mut monitor = PerformanceMonitor::new();
        let mut closed = 0;
        for _ in 0..64 {
            if monitor.record_frame(1.0 / 64.0) {
                closed += 1;
            }
        }
        assert_eq!(closed, 1);
        assert_eq!(monitor.fps(), 64);
        assert!(!monitor.is_low_performance());

        for _ in 0..16 {
            monitor.record_frame(1.0 / 16.0);
        }
        assert_eq!(monitor.fps(), 16);
        assert!(monitor.is_low_performance());
    }

    #[test]
    fn test_tips() {
        let good = PerformanceMetrics {
            fps: 60,
            memory: MemoryUsage { used: 100.0, total: 512.0 },
            draw_calls: 10,
            ..Default::default()
        };
        assert!(good.optimization_tips().is_empty());

        let bad = PerformanceMetrics {
            fps: 12,
            memory: MemoryUsage { used: 500.0, total: 512.0 },
            draw_calls: 1001,
            ..Default::default()
        };
        assert_eq!(bad.optimization_tips().len(), 3);
    }

    #[test]
    fn test_memory_ratio_without_budget() {
        assert_eq!(MemoryUsage::default().ratio(), 0.0);
        let usage = MemoryUsage::from_bytes(256 * 1024 * 1024, 512 * 1024 * 1024);
        assert_eq!(usage.ratio(), 0.5);
    }

    #[test]
    fn test_quality_steps_down_to_floor() {
        let mut tier = QualityTier::new(64);
        assert_eq!(tier.adjust(false), None);
        assert_eq!(tier.adjust(true), Some(32));
        assert_eq!(tier.adjust(true), Some(24));
        assert_eq!(tier.adjust(true), Some(18));
        assert_eq!(tier.adjust(true), Some(16));
        assert_eq!(tier.adjust(true), None);
        assert_eq!(tier.segments(), 16);
    }

    #[test]
    fn test_report_json() {
        let mut monitor = PerformanceMonitor::new();
        monitor.set_counters(3, 1200, 1, MemoryUsage { used: 10.0, total: 512.0 });
        let report = PerformanceReport::new(&monitor, SceneInfo { objects: 4, materials: 2 });
        let json = report.to_json().unwrap();
        assert!(json.contains("\"drawCalls\": 3"));
        assert!(json.contains("\"optimizationTips\""));
        assert!(json.contains("\"sceneInfo\""));

        let dir = tempfile::tempdir().unwrap();
        let path = report.write_to(dir.path()).unwrap();
        let back: PerformanceReport =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back, report);
    }
}
