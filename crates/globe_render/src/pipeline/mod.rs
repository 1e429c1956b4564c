//! Rendering pipeline components
//!
//! This module contains the GPU data layouts, the forward pipeline that
//! draws the globe scene into an offscreen target, and the composite pass
//! that post-processes that target onto the surface.

pub mod types;
pub mod globe_pipeline;
pub mod post_pipeline;

// Re-export types
pub use types::{vertices_from_mesh, FrameUniforms, ObjectUniforms, PostUniforms, Vertex, OBJECT_UNIFORM_STRIDE};

// Re-export pipelines
pub use globe_pipeline::{pack_object_uniforms, DrawItem, GlobePipeline};
pub use post_pipeline::{PostPipeline, SCENE_FORMAT};
