//! Camera flights

use globe_core::{CancellationToken, Tween};
use globe_math::{Ease, Vec3};

use super::{EffectContext, EffectError, Tickable};
use crate::resources::ResourceTracker;

/// Moves the camera to a destination while keeping it aimed at `look_at`
///
/// The flight starts from wherever the camera is on its first tick, so a
/// flight that replaces another picks up mid-air. Cancelling the token
/// freezes the camera where it is and retires the effect.
pub struct CameraTween {
    destination: Vec3,
    look_at: Vec3,
    duration: f32,
    ease: Ease,
    token: CancellationToken,
    tween: Option<Tween<Vec3>>,
    done: bool,
}

impl CameraTween {
    pub fn new(destination: Vec3, look_at: Vec3, duration: f32, ease: Ease) -> Self {
        Self {
            destination,
            look_at,
            duration,
            ease,
            token: CancellationToken::new(),
            tween: None,
            done: false,
        }
    }

    /// Token that cancels this flight
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn destination(&self) -> Vec3 {
        self.destination
    }

    /// Fraction of the flight completed
    pub fn progress(&self) -> f32 {
        self.tween.as_ref().map_or(0.0, |t| t.progress())
    }
}

impl Tickable for CameraTween {
    fn update(&mut self, ctx: &mut EffectContext<'_>, dt: f32) -> Result<(), EffectError> {
        if self.done || self.token.is_cancelled() {
            self.done = true;
            return Ok(());
        }

        let tween = self.tween.get_or_insert_with(|| {
            Tween::new(ctx.camera.position, self.destination, self.duration, self.ease)
                .with_token(self.token.clone())
        });
        ctx.camera.position = tween.advance(dt);
        ctx.camera.look_at(self.look_at);
        if tween.is_finished() {
            self.done = true;
        }
        Ok(())
    }

    fn dispose(&mut self, _resources: &mut ResourceTracker) {
        self.done = true;
    }

    fn name(&self) -> &str {
        "camera tween"
    }

    fn is_finished(&self) -> bool {
        self.done || self.token.is_cancelled()
    }
}
