//! Rendering for the globe visualization
//!
//! This crate turns the scene world from `globe_core` into frames, and
//! drives everything that moves.
//!
//! ## Key Components
//!
//! - [`context::RenderContext`] - World, camera, backend, scheduler and per-feature trackers
//! - [`resources::GpuBackend`] - Buffer and texture allocation, headless or on wgpu
//! - [`effects::AnimationScheduler`] - Per-frame effects with fault isolation
//! - [`overlay::OverlayManager`] - Heatmap, time-series and category overlays
//! - [`post::PostChain`] - Bloom, SSAO, tone mapping and color correction settings
//! - [`pipeline::GlobePipeline`] - Lit triangles, lines and points with depth
//! - [`pipeline::PostPipeline`] - Offscreen scene target and the bloom/SSAO composite
//! - [`performance::PerformanceMonitor`] - FPS window, tips and quality scaling

pub mod camera;
pub mod context;
pub mod effects;
pub mod geometry;
pub mod overlay;
pub mod performance;
pub mod pipeline;
pub mod post;
pub mod resources;
pub mod surface;
pub mod wgpu_backend;

pub use camera::PerspectiveCamera;
pub use context::{ContextParts, Feature, FrameStats, RenderContext};
pub use effects::{
    AnimationScheduler, CameraTween, EffectContext, EffectError, EffectKey, FlyLine, GlobeRotation,
    MarkerPulse, ParticleField, RouteFade, Tickable, TickSummary,
};
pub use overlay::{DataPoint, OverlayManager, OverlayMode, OverlaySettings};
pub use performance::{MemoryUsage, PerformanceMetrics, PerformanceMonitor, PerformanceReport, QualityTier, SceneInfo};
pub use post::{PostChain, PostPass, PostPassKind, PostSettings};
pub use resources::{GpuBackend, HeadlessBackend, ResourceId, ResourceKind, ResourceTracker};
pub use surface::{RenderError, SurfaceContext};
pub use wgpu_backend::WgpuBackend;
