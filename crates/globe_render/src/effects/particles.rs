//! Drifting background particles

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use globe_core::{Color, Material, Mesh, ObjectKey, ObjectKind, SceneObject, Topology, World};
use globe_math::Vec3;

use super::{frames, EffectContext, EffectError, Tickable};
use crate::resources::ResourceTracker;

/// Edge length of the spawn cube
pub const SPAWN_EXTENT: f32 = 100.0;

/// A field of points drifting at constant per-frame velocities
///
/// Particles that drift past `wrap_distance` from the origin jump back to
/// where they spawned, so the field never empties out.
pub struct ParticleField {
    key: Option<ObjectKey>,
    spawn: Vec<Vec3>,
    velocities: Vec<Vec3>,
    wrap_distance: f32,
}

impl ParticleField {
    /// Spawn `count` particles into the world
    ///
    /// Positions are uniform in a cube of edge [`SPAWN_EXTENT`]; velocities
    /// are uniform in ±`speed`/2 per axis, in units per reference frame.
    pub fn spawn(world: &mut World, count: usize, speed: f32, seed: u64, color: Color) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut unit = || rng.gen::<f32>() - 0.5;

        let mut spawn = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);
        for _ in 0..count {
            spawn.push(Vec3::new(unit(), unit(), unit()) * SPAWN_EXTENT);
            velocities.push(Vec3::new(unit(), unit(), unit()) * speed);
        }

        let mesh = Mesh::from_positions(Topology::Points, spawn.clone());
        let key = world.add(
            SceneObject::new("particles", ObjectKind::Particles)
                .with_material(Material::new(color, 0.6))
                .with_mesh(mesh),
        );

        Self {
            key: Some(key),
            spawn,
            velocities,
            wrap_distance: SPAWN_EXTENT,
        }
    }

    pub fn with_wrap_distance(mut self, distance: f32) -> Self {
        self.wrap_distance = distance;
        self
    }

    pub fn key(&self) -> Option<ObjectKey> {
        self.key
    }

    pub fn len(&self) -> usize {
        self.spawn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spawn.is_empty()
    }
}

impl Tickable for ParticleField {
    fn update(&mut self, ctx: &mut EffectContext<'_>, dt: f32) -> Result<(), EffectError> {
        let Some(key) = self.key else {
            return Ok(());
        };
        let object = ctx.world.get_mut(key).ok_or_else(|| EffectError::MissingObject {
            effect: self.name().to_string(),
            key,
        })?;
        let mesh = object.mesh_mut().ok_or_else(|| EffectError::MissingMesh {
            effect: self.name().to_string(),
            key,
        })?;
        if mesh.positions.len() != self.spawn.len() {
            return Err(EffectError::InvalidState(format!(
                "particle mesh has {} points, expected {}",
                mesh.positions.len(),
                self.spawn.len()
            )));
        }

        let step = frames(dt);
        let limit_sq = self.wrap_distance * self.wrap_distance;
        for ((position, velocity), origin) in mesh
            .positions
            .iter_mut()
            .zip(&self.velocities)
            .zip(&self.spawn)
        {
            *position = *position + *velocity * step;
            if position.length_squared() > limit_sq {
                *position = *origin;
            }
        }
        Ok(())
    }

    fn dispose(&mut self, resources: &mut ResourceTracker) {
        if let Some(key) = self.key.take() {
            resources.track_object(key);
        }
    }

    fn name(&self) -> &str {
        "particles"
    }
}
