//! Tweens with explicit cancellation
//!
//! A [`Tween`] interpolates a value over time along an [`Ease`] curve. It is
//! driven by the frame loop through [`Tween::advance`]; nothing runs in the
//! background. Every tween carries a [`CancellationToken`] that can be
//! cloned and handed to whoever may need to stop it.

use std::cell::Cell;
use std::rc::Rc;

use globe_math::{Ease, Vec3};

/// Shared cancellation flag
///
/// Clones observe the same flag. Single-threaded: tweens and texture loads
/// are driven from the frame loop.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Values that can be interpolated
pub trait Tweenable: Copy {
    fn interpolate(self, to: Self, t: f32) -> Self;
}

impl Tweenable for f32 {
    fn interpolate(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Tweenable for Vec3 {
    fn interpolate(self, to: Self, t: f32) -> Self {
        self.lerp(to, t)
    }
}

/// Lifecycle of a tween
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweenState {
    /// Waiting out its delay
    Pending,
    Running,
    Complete,
    /// Stopped by its token; the value is frozen where it was
    Cancelled,
}

/// What happens when a tween reaches its end
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RepeatMode {
    /// Play once and complete
    #[default]
    Once,
    /// Play back and forth forever
    Yoyo,
}

/// Interpolation of `T` from `from` to `to`
#[derive(Clone, Debug)]
pub struct Tween<T: Tweenable> {
    from: T,
    to: T,
    duration: f32,
    delay: f32,
    ease: Ease,
    repeat: RepeatMode,
    /// Seconds since the tween was created
    elapsed: f32,
    value: T,
    state: TweenState,
    token: CancellationToken,
}

impl<T: Tweenable> Tween<T> {
    /// Create a tween lasting `duration` seconds
    pub fn new(from: T, to: T, duration: f32, ease: Ease) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            delay: 0.0,
            ease,
            repeat: RepeatMode::Once,
            elapsed: 0.0,
            value: from,
            state: TweenState::Running,
            token: CancellationToken::new(),
        }
    }

    /// Start after `delay` seconds
    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        if self.delay > 0.0 {
            self.state = TweenState::Pending;
        }
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatMode) -> Self {
        self.repeat = repeat;
        self
    }

    /// Use an existing token instead of a fresh one
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Token that cancels this tween
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Advance by `dt` seconds and return the current value
    pub fn advance(&mut self, dt: f32) -> T {
        if self.token.is_cancelled() {
            self.state = TweenState::Cancelled;
        }
        if matches!(self.state, TweenState::Complete | TweenState::Cancelled) {
            return self.value;
        }

        self.elapsed += dt.max(0.0);
        let active = self.elapsed - self.delay;
        if active < 0.0 {
            self.state = TweenState::Pending;
            return self.value;
        }
        self.state = TweenState::Running;

        let t = if self.duration <= 0.0 {
            1.0
        } else {
            match self.repeat {
                RepeatMode::Once => (active / self.duration).min(1.0),
                RepeatMode::Yoyo => {
                    let cycle = (active / self.duration) % 2.0;
                    if cycle <= 1.0 { cycle } else { 2.0 - cycle }
                }
            }
        };

        self.value = self.from.interpolate(self.to, self.ease.apply(t));
        if self.repeat == RepeatMode::Once && t >= 1.0 {
            self.value = self.to;
            self.state = TweenState::Complete;
        }
        self.value
    }

    /// Current value without advancing
    pub fn value(&self) -> T {
        self.value
    }

    pub fn target(&self) -> T {
        self.to
    }

    /// Linear progress through one pass, 0.0-1.0
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return if self.state == TweenState::Complete { 1.0 } else { 0.0 };
        }
        ((self.elapsed - self.delay) / self.duration).clamp(0.0, 1.0)
    }

    pub fn state(&self) -> TweenState {
        if self.token.is_cancelled() && self.state != TweenState::Complete {
            TweenState::Cancelled
        } else {
            self.state
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == TweenState::Complete
    }

    /// Complete or cancelled
    pub fn is_finished(&self) -> bool {
        matches!(self.state(), TweenState::Complete | TweenState::Cancelled)
    }
}
