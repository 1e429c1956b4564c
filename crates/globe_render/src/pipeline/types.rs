//! GPU-compatible data types for the globe pipeline
//!
//! These types are designed to match the shader layouts exactly.
//! All types derive Pod and Zeroable for safe GPU buffer operations.

use bytemuck::{Pod, Zeroable};

use globe_core::Mesh;
use globe_math::mat4;

/// Dynamic uniform offsets must be multiples of this on every backend
pub const OBJECT_UNIFORM_STRIDE: u64 = 256;

/// A vertex as uploaded to the GPU
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Outward normal; zero for unlit geometry (lines, points)
    pub normal: [f32; 3],
    /// RGBA multiplied with the object color
    pub color: [f32; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0; 3],
            color: [1.0; 4],
        }
    }
}

/// Flatten a mesh into GPU vertices
pub fn vertices_from_mesh(mesh: &Mesh) -> Vec<Vertex> {
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, p)| Vertex {
            position: p.to_array(),
            normal: mesh.normals.get(i).map_or([0.0; 3], |n| n.to_array()),
            color: mesh.colors.get(i).copied().unwrap_or([1.0; 4]),
        })
        .collect()
}

/// Per-frame uniforms
/// Layout: 80 bytes total (must match globe.wgsl FrameUniforms)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    /// projection * view (64 bytes)
    pub view_projection: [[f32; 4]; 4],
    /// Direction toward the light + ambient strength (16 bytes)
    pub light_dir: [f32; 3],
    pub ambient_strength: f32,
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            view_projection: mat4::IDENTITY,
            light_dir: [0.5, 1.0, 0.3],
            ambient_strength: 0.4,
        }
    }
}

/// Composite pass uniforms
/// Layout: 96 bytes total (must match post.wgsl PostUniforms)
///
/// The fourth lane of `bloom` and `ssao` is the pass switch.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PostUniforms {
    /// strength, radius, threshold, enabled (16 bytes)
    pub bloom: [f32; 4],
    /// kernel radius in pixels, min distance, max distance, enabled (16 bytes)
    pub ssao: [f32; 4],
    /// Color-correction exponent + tone-mapping exposure (16 bytes)
    pub color_pow: [f32; 3],
    pub exposure: f32,
    /// Color-correction multiplier + tone-mapping switch (16 bytes)
    pub color_mul: [f32; 3],
    pub tone_mapping: f32,
    /// One pixel in UV units + camera clip planes (16 bytes)
    pub texel_size: [f32; 2],
    pub near: f32,
    pub far: f32,
    /// Color-correction switch (16 bytes)
    pub color_correction: f32,
    pub _padding: [f32; 3],
}

impl Default for PostUniforms {
    fn default() -> Self {
        Self {
            bloom: [0.0; 4],
            ssao: [0.0; 4],
            color_pow: [1.0; 3],
            exposure: 1.0,
            color_mul: [1.0; 3],
            tone_mapping: 0.0,
            texel_size: [1.0; 2],
            near: 0.1,
            far: 1000.0,
            color_correction: 0.0,
            _padding: [0.0; 3],
        }
    }
}

/// Per-object uniforms, one slot of [`OBJECT_UNIFORM_STRIDE`] bytes each
/// Layout: 80 bytes used (must match globe.wgsl ObjectUniforms)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ObjectUniforms {
    /// Model matrix (64 bytes)
    pub model: [[f32; 4]; 4],
    /// Material color with opacity folded into alpha (16 bytes)
    pub color: [f32; 4],
}

impl Default for ObjectUniforms {
    fn default() -> Self {
        Self {
            model: mat4::IDENTITY,
            color: [1.0; 4],
        }
    }
}
