//! Breathing city markers

use globe_core::ObjectKey;

use super::{EffectContext, EffectError, Tickable};
use crate::resources::ResourceTracker;

/// Scales a marker with a sine wave and fades its halo ring
///
/// At time `t` seconds the marker scale is `1 + sin(t·1000·0.003·speed)·0.1`,
/// the ring scale is that times `ring_scale`, and the ring opacity is
/// `0.4·(1 − (scale − 1))`. The marker and ring belong to the markers
/// feature, so disposing the pulse hands nothing over.
pub struct MarkerPulse {
    marker: ObjectKey,
    ring: Option<ObjectKey>,
    pulse_speed: f32,
    ring_scale: f32,
    base_scale: f32,
    scale: f32,
}

impl MarkerPulse {
    pub fn new(marker: ObjectKey, pulse_speed: f32) -> Self {
        Self {
            marker,
            ring: None,
            pulse_speed,
            ring_scale: 1.5,
            base_scale: 1.0,
            scale: 1.0,
        }
    }

    pub fn with_ring(mut self, ring: ObjectKey) -> Self {
        self.ring = Some(ring);
        self
    }

    /// Scale the marker rests at (the theme's marker size)
    pub fn with_base_scale(mut self, scale: f32) -> Self {
        self.base_scale = scale;
        self
    }

    pub fn with_ring_scale(mut self, scale: f32) -> Self {
        self.ring_scale = scale;
        self
    }

    /// Current pulse factor around 1.0
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Pulse factor at `time` seconds
    pub fn scale_at(time: f32, pulse_speed: f32) -> f32 {
        let now_ms = time * 1000.0;
        1.0 + (now_ms * 0.003 * pulse_speed).sin() * 0.1
    }

    /// Ring opacity for a pulse factor
    pub fn ring_opacity(scale: f32) -> f32 {
        0.4 * (1.0 - (scale - 1.0))
    }
}

impl Tickable for MarkerPulse {
    fn update(&mut self, ctx: &mut EffectContext<'_>, _dt: f32) -> Result<(), EffectError> {
        self.scale = Self::scale_at(ctx.time, self.pulse_speed);

        let marker = ctx.world.get_mut(self.marker).ok_or_else(|| EffectError::MissingObject {
            effect: self.name().to_string(),
            key: self.marker,
        })?;
        marker.set_scale(self.base_scale * self.scale);

        if let Some(ring_key) = self.ring {
            let ring = ctx.world.get_mut(ring_key).ok_or_else(|| EffectError::MissingObject {
                effect: self.name().to_string(),
                key: ring_key,
            })?;
            ring.set_scale(self.base_scale * self.scale * self.ring_scale);
            ring.set_opacity(Self::ring_opacity(self.scale));
        }
        Ok(())
    }

    fn dispose(&mut self, _resources: &mut ResourceTracker) {}

    fn name(&self) -> &str {
        "marker pulse"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use globe_core::{ObjectKind, SceneObject, World};
    use globe_math::Vec3;

    #[test]
    fn test_scale_curve() {
        assert_eq!(MarkerPulse::scale_at(0.0, 1.0), 1.0);
        // Peak when 3·t·speed = π/2
        let peak = std::f32::consts::FRAC_PI_2 / 3.0;
        assert!((MarkerPulse::scale_at(peak, 1.0) - 1.1).abs() < 1e-5);
        assert!((MarkerPulse::ring_opacity(1.1) - 0.36).abs() < 1e-6);
        assert!((MarkerPulse::ring_opacity(0.9) - 0.44).abs() < 1e-6);
    }

    #[test]
    fn test_update_scales_marker_and_ring() {
        let mut world = World::new();
        let marker = world.add(SceneObject::new("PEK", ObjectKind::CityMarker { city_id: "PEK".into() }));
        let ring = world.add(SceneObject::new("PEK ring", ObjectKind::MarkerRing { city_id: "PEK".into() }));
        let mut camera = PerspectiveCamera::default();
        let mut pulse = MarkerPulse::new(marker, 1.0).with_ring(ring).with_base_scale(0.5);

        let time = std::f32::consts::FRAC_PI_2 / 3.0;
        let mut ctx = EffectContext { world: &mut world, camera: &mut camera, time };
        pulse.update(&mut ctx, 0.016).unwrap();

        let m = world.get(marker).unwrap();
        assert!((m.transform.scale - Vec3::splat(0.55)).length() < 1e-5);
        let r = world.get(ring).unwrap();
        assert!((r.transform.scale.x - 0.825).abs() < 1e-5);
        assert!((r.material.opacity - 0.36).abs() < 1e-5);
    }

    #[test]
    fn test_missing_ring_is_an_error() {
        let mut world = World::new();
        let marker = world.add(SceneObject::new("PEK", ObjectKind::Helper));
        let ring = world.add(SceneObject::new("ring", ObjectKind::Helper));
        world.remove(ring);
        world.clear_all_dirty();
        let mut camera = PerspectiveCamera::default();
        let mut pulse = MarkerPulse::new(marker, 1.0).with_ring(ring);
        let mut ctx = EffectContext { world: &mut world, camera: &mut camera, time: 1.0 };
        assert!(pulse.update(&mut ctx, 0.016).is_err());
        // The marker itself was still updated
        assert!(world.get(marker).unwrap().is_dirty());
    }
}
