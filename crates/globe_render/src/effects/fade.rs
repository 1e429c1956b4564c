//! Route opacity fade

use globe_core::ObjectKey;

use super::{frames, EffectContext, EffectError, Tickable};
use crate::resources::ResourceTracker;

/// Progress gained per reference frame
pub const FADE_STEP: f32 = 0.005;

/// Route opacity at zero progress
pub const FADE_PEAK_OPACITY: f32 = 0.6;

/// Repeatedly fades a route from 0.6 opacity to nothing
pub struct RouteFade {
    route: ObjectKey,
    progress: f32,
}

impl RouteFade {
    pub fn new(route: ObjectKey) -> Self {
        Self { route, progress: 0.0 }
    }

    /// Start part way through the cycle so routes do not fade in lockstep
    pub fn with_phase(mut self, progress: f32) -> Self {
        self.progress = progress.rem_euclid(1.0);
        self
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn opacity_at(progress: f32) -> f32 {
        FADE_PEAK_OPACITY * (1.0 - progress)
    }
}

impl Tickable for RouteFade {
    fn update(&mut self, ctx: &mut EffectContext<'_>, dt: f32) -> Result<(), EffectError> {
        self.progress = (self.progress + FADE_STEP * frames(dt)) % 1.0;
        let route = ctx.world.get_mut(self.route).ok_or_else(|| EffectError::MissingObject {
            effect: self.name().to_string(),
            key: self.route,
        })?;
        route.set_opacity(Self::opacity_at(self.progress));
        Ok(())
    }

    fn dispose(&mut self, _resources: &mut ResourceTracker) {}

    fn name(&self) -> &str {
        "route fade"
    }
}
