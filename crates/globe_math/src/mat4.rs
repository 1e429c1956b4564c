//! 4x4 matrix utilities for view and projection
//!
//! Matrices are column-major (`m[column][row]`), matching WGSL uniform layout.

use crate::Vec3;

/// 4x4 matrix type (column-major)
pub type Mat4 = [[f32; 4]; 4];

/// Identity matrix
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Multiply two 4x4 matrices: result = a * b
///
/// In column-major convention, this applies b first, then a.
#[allow(clippy::needless_range_loop)]
pub fn mul(a: Mat4, b: Mat4) -> Mat4 {
    let mut result = [[0.0f32; 4]; 4];

    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                result[i][j] += a[k][j] * b[i][k];
            }
        }
    }

    result
}

/// Multiply a matrix by a homogeneous vector
#[allow(clippy::needless_range_loop)]
pub fn transform_vec4(m: Mat4, v: [f32; 4]) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for row in 0..4 {
        for col in 0..4 {
            out[row] += m[col][row] * v[col];
        }
    }
    out
}

/// Transform a point (w = 1) and apply the perspective divide
///
/// Returns `None` when the point lands on or behind the projection plane.
pub fn transform_point(m: Mat4, p: Vec3) -> Option<Vec3> {
    let out = transform_vec4(m, [p.x, p.y, p.z, 1.0]);
    if out[3] <= f32::EPSILON {
        return None;
    }
    Some(Vec3::new(out[0] / out[3], out[1] / out[3], out[2] / out[3]))
}

/// Right-handed view matrix looking from `eye` toward `target`
pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let f = (target - eye).normalized();
    let mut s = f.cross(up).normalized();
    if s == Vec3::ZERO {
        // Looking straight along `up`; any side vector will do
        s = f.any_perpendicular();
    }
    let u = s.cross(f);

    [
        [s.x, u.x, -f.x, 0.0],
        [s.y, u.y, -f.y, 0.0],
        [s.z, u.z, -f.z, 0.0],
        [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
    ]
}

/// Right-handed perspective projection with a 0..1 depth range (wgpu clip space)
pub fn perspective_rh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fov_y * 0.5).tan();
    let range = near - far;

    [
        [f / aspect.max(1e-6), 0.0, 0.0, 0.0],
        [0.0, f, 0.0, 0.0],
        [0.0, 0.0, far / range, -1.0],
        [0.0, 0.0, near * far / range, 0.0],
    ]
}

/// Rotation about the Y axis
pub fn rotation_y(angle: f32) -> Mat4 {
    let (s, c) = angle.sin_cos();
    [
        [c, 0.0, -s, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [s, 0.0, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Model matrix: translation * rotation about Y * scale
pub fn model_matrix(position: Vec3, rotation_y_angle: f32, scale: Vec3) -> Mat4 {
    let mut m = rotation_y(rotation_y_angle);
    for row in 0..3 {
        m[0][row] *= scale.x;
        m[1][row] *= scale.y;
        m[2][row] *= scale.z;
    }
    m[3] = [position.x, position.y, position.z, 1.0];
    m
}
