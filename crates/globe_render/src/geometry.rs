//! Mesh builders
//!
//! All meshes are non-indexed and built in object space. Spheres are
//! latitude/longitude grids whose vertex normals point outward.

use std::f32::consts::{PI, TAU};

use globe_core::{Mesh, Topology};
use globe_math::{spherical_uv, Vec3};

/// Fewest segments a sphere is ever built with
pub const MIN_SPHERE_SEGMENTS: u32 = 8;

/// Sphere of `radius` with `segments` divisions around and from pole to pole
pub fn uv_sphere(radius: f32, segments: u32) -> Mesh {
    let segments = segments.max(MIN_SPHERE_SEGMENTS);
    let point = |i: u32, j: u32| -> Vec3 {
        let theta = i as f32 / segments as f32 * TAU;
        let phi = j as f32 / segments as f32 * PI;
        Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos())
    };

    let quads = (segments * segments) as usize;
    let mut positions = Vec::with_capacity(quads * 6);
    let mut normals = Vec::with_capacity(quads * 6);
    for j in 0..segments {
        for i in 0..segments {
            let a = point(i, j);
            let b = point(i, j + 1);
            let c = point(i + 1, j + 1);
            let d = point(i + 1, j);
            // Counter-clockwise seen from outside; skip the collapsed
            // triangle at each pole
            if j != 0 {
                for n in [a, b, d] {
                    normals.push(n);
                    positions.push(n * radius);
                }
            }
            if j != segments - 1 {
                for n in [b, c, d] {
                    normals.push(n);
                    positions.push(n * radius);
                }
            }
        }
    }
    Mesh {
        topology: Topology::Triangles,
        positions,
        normals,
        colors: Vec::new(),
    }
}

/// Polyline through `points`
pub fn line_strip(points: Vec<Vec3>) -> Mesh {
    Mesh::from_positions(Topology::LineStrip, points)
}

/// Append `part`, scaled then moved to `offset`, onto `target`
///
/// Both meshes must share a topology; colors are filled with `color` when
/// `part` has none.
pub fn append_instance(target: &mut Mesh, part: &Mesh, offset: Vec3, scale: f32, color: [f32; 4]) {
    target.positions.extend(part.positions.iter().map(|p| *p * scale + offset));
    if !part.normals.is_empty() {
        target.normals.extend_from_slice(&part.normals);
    }
    if part.colors.is_empty() {
        target
            .colors
            .extend(std::iter::repeat(color).take(part.positions.len()));
    } else {
        target.colors.extend_from_slice(&part.colors);
    }
}

/// Color every vertex by its spherical UV
pub fn paint_by_uv<F>(mesh: &mut Mesh, mut sample: F)
where
    F: FnMut(f32, f32) -> [f32; 4],
{
    mesh.colors = mesh
        .positions
        .iter()
        .map(|p| {
            let (u, v) = spherical_uv(*p);
            sample(u, v)
        })
        .collect();
}
