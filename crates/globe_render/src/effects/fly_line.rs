//! Dashes travelling along a route arc

use globe_core::ObjectKey;

use super::{frames, EffectContext, EffectError, Tickable};
use crate::resources::ResourceTracker;

/// Alpha of the gaps between dashes
const GAP_ALPHA: f32 = 0.15;

/// Animates a dashed pattern along a route's line strip
///
/// The dash phase drops by `0.01·speed` per reference frame and wraps back
/// to 1 once it reaches 0. The pattern is written into the route mesh's
/// vertex colors as alpha; the route itself belongs to the routes feature.
pub struct FlyLine {
    route: ObjectKey,
    speed: f32,
    dash: f32,
    dash_count: f32,
}

impl FlyLine {
    pub fn new(route: ObjectKey, speed: f32) -> Self {
        Self {
            route,
            speed,
            dash: 1.0,
            dash_count: 12.0,
        }
    }

    /// Number of dashes along the whole arc
    pub fn with_dash_count(mut self, count: f32) -> Self {
        self.dash_count = count.max(1.0);
        self
    }

    pub fn dash(&self) -> f32 {
        self.dash
    }

    /// Next dash phase after `frame_count` reference frames
    pub fn step_dash(dash: f32, speed: f32, frame_count: f32) -> f32 {
        let next = dash - 0.01 * speed * frame_count;
        if next <= 0.0 {
            1.0
        } else {
            next
        }
    }

    /// Alpha for the vertex at fraction `t` along the arc
    fn alpha_at(&self, t: f32) -> f32 {
        if (t * self.dash_count + self.dash).fract() < 0.5 {
            1.0
        } else {
            GAP_ALPHA
        }
    }
}

impl Tickable for FlyLine {
    fn update(&mut self, ctx: &mut EffectContext<'_>, dt: f32) -> Result<(), EffectError> {
        self.dash = Self::step_dash(self.dash, self.speed, frames(dt));

        let key = self.route;
        let route = ctx.world.get_mut(key).ok_or_else(|| EffectError::MissingObject {
            effect: self.name().to_string(),
            key,
        })?;
        let count = route.mesh().map(|m| m.vertex_count()).ok_or_else(|| EffectError::MissingMesh {
            effect: self.name().to_string(),
            key,
        })?;
        let last = count.saturating_sub(1).max(1) as f32;
        let colors: Vec<[f32; 4]> = (0..count)
            .map(|i| [1.0, 1.0, 1.0, self.alpha_at(i as f32 / last)])
            .collect();
        if let Some(mesh) = route.mesh_mut() {
            mesh.colors = colors;
        }
        Ok(())
    }

    fn dispose(&mut self, _resources: &mut ResourceTracker) {}

    fn name(&self) -> &str {
        "fly line"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use globe_core::{Mesh, ObjectKind, SceneObject, Topology, World};
    use globe_math::Vec3;

    #[test]
    fn test_dash_wraps_to_one() {
        let mut dash = 1.0;
        for _ in 0..99 {
            dash = FlyLine::step_dash(dash, 1.0, 1.0);
        }
        assert!((dash - 0.01).abs() < 1e-4);
        dash = FlyLine::step_dash(dash, 1.0, 1.0);
        assert!(dash == 1.0 || (dash - 0.0).abs() < 1e-4);
        assert_eq!(FlyLine::step_dash(0.005, 1.0, 1.0), 1.0);
        assert!((FlyLine::step_dash(0.5, 2.0, 1.0) - 0.48).abs() < 1e-6);
    }

    #[test]
    fn test_update_writes_dash_alpha() {
        let mut world = World::new();
        let positions: Vec<Vec3> = (0..=50).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let route = world.add(
            SceneObject::new("PEK-JFK", ObjectKind::Route { route_id: "PEK-JFK".into() })
                .with_mesh(Mesh::from_positions(Topology::LineStrip, positions)),
        );
        let mut camera = PerspectiveCamera::default();
        let mut line = FlyLine::new(route, 1.0);
        let mut ctx = EffectContext { world: &mut world, camera: &mut camera, time: 0.0 };
        line.update(&mut ctx, 1.0 / 60.0).unwrap();
        assert!((line.dash() - 0.99).abs() < 1e-4);

        let mesh = world.get(route).unwrap().mesh().unwrap();
        assert_eq!(mesh.colors.len(), 51);
        assert!(mesh.is_consistent());
        assert!(mesh.colors.iter().any(|c| c[3] == 1.0));
        assert!(mesh.colors.iter().any(|c| c[3] == GAP_ALPHA));
    }

    #[test]
    fn test_route_without_mesh_is_an_error() {
        let mut world = World::new();
        let route = world.add(SceneObject::new("r", ObjectKind::Helper));
        let mut camera = PerspectiveCamera::default();
        let mut line = FlyLine::new(route, 1.0);
        let mut ctx = EffectContext { world: &mut world, camera: &mut camera, time: 0.0 };
        assert!(matches!(
            line.update(&mut ctx, 0.016),
            Err(EffectError::MissingMesh { .. })
        ));
    }
}
