//! Constant spin about the Y axis

use globe_core::ObjectKey;

use super::{frames, EffectContext, EffectError, Tickable};
use crate::resources::ResourceTracker;

/// Rotates the globe (and anything riding on it) by `speed` radians per
/// reference frame
pub struct GlobeRotation {
    targets: Vec<ObjectKey>,
    speed: f32,
}

impl GlobeRotation {
    pub fn new(globe: ObjectKey, speed: f32) -> Self {
        Self {
            targets: vec![globe],
            speed,
        }
    }

    /// Also rotate `key` along with the globe
    pub fn with_follower(mut self, key: ObjectKey) -> Self {
        self.targets.push(key);
        self
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }
}

impl Tickable for GlobeRotation {
    fn update(&mut self, ctx: &mut EffectContext<'_>, dt: f32) -> Result<(), EffectError> {
        let delta = self.speed * frames(dt);
        let mut missing = None;
        for &key in &self.targets {
            match ctx.world.get_mut(key) {
                Some(object) => {
                    let angle = object.transform.rotation_y + delta;
                    object.set_rotation_y(angle);
                }
                None => {
                    missing.get_or_insert(key);
                }
            }
        }
        match missing {
            Some(key) => Err(EffectError::MissingObject {
                effect: self.name().to_string(),
                key,
            }),
            None => Ok(()),
        }
    }

    fn dispose(&mut self, _resources: &mut ResourceTracker) {}

    fn name(&self) -> &str {
        "globe rotation"
    }
}
