//! CPU-side mesh data
//!
//! Meshes live in object space on their [`SceneObject`](crate::SceneObject).
//! The renderer uploads them when the object's mesh is marked dirty.

use globe_math::Vec3;

/// How vertices are assembled into primitives
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    #[default]
    Triangles,
    /// Connected polyline, used for route arcs
    LineStrip,
    Points,
}

/// Vertex data for one object
///
/// `normals` and `colors` are either empty or the same length as
/// `positions`. Empty colors mean the object's material color is used.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub topology: Topology,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<[f32; 4]>,
}

impl Mesh {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            ..Self::default()
        }
    }

    /// Mesh from positions alone
    pub fn from_positions(topology: Topology, positions: Vec<Vec3>) -> Self {
        Self {
            topology,
            positions,
            ..Self::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_colors(mut self, colors: Vec<[f32; 4]>) -> Self {
        self.colors = colors;
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Triangles for triangle lists, zero otherwise
    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.positions.len() / 3,
            Topology::LineStrip | Topology::Points => 0,
        }
    }

    /// Check that attribute arrays line up with positions
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        (self.normals.is_empty() || self.normals.len() == n)
            && (self.colors.is_empty() || self.colors.len() == n)
            && (self.topology != Topology::Triangles || n % 3 == 0)
    }

    /// Radius of the smallest origin-centered sphere holding every vertex
    pub fn bounding_radius(&self) -> f32 {
        self.positions
            .iter()
            .map(|p| p.length())
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency() {
        let tri = Mesh::from_positions(Topology::Triangles, vec![Vec3::X, Vec3::Y, Vec3::Z]);
        assert!(tri.is_consistent());
        assert_eq!(tri.triangle_count(), 1);

        let bad = tri.clone().with_colors(vec![[1.0; 4]]);
        assert!(!bad.is_consistent());

        let strip = Mesh::from_positions(Topology::LineStrip, vec![Vec3::X, Vec3::Y]);
        assert!(strip.is_consistent());
        assert_eq!(strip.triangle_count(), 0);
    }

    #[test]
    fn test_bounding_radius() {
        let mesh = Mesh::from_positions(
            Topology::Points,
            vec![Vec3::new(0.0, 3.0, 4.0), Vec3::X],
        );
        assert_eq!(mesh.bounding_radius(), 5.0);
        assert_eq!(Mesh::new(Topology::Points).bounding_radius(), 0.0);
    }
}
