//! Per-frame effects and their scheduler
//!
//! Every animated behavior (particles, marker pulses, flying dashes, route
//! fades, globe rotation, camera flights) implements [`Tickable`] and is
//! owned by the [`AnimationScheduler`]. The frame loop calls
//! [`AnimationScheduler::tick`] once per frame; nothing animates on its own.
//!
//! Fault handling: an effect whose update fails is logged and skipped for
//! that frame. The remaining effects still run.

mod particles;
mod pulse;
mod fly_line;
mod fade;
mod rotation;
mod camera_tween;

pub use particles::ParticleField;
pub use pulse::MarkerPulse;
pub use fly_line::FlyLine;
pub use fade::RouteFade;
pub use rotation::GlobeRotation;
pub use camera_tween::CameraTween;

use std::fmt;

use slotmap::{new_key_type, SlotMap};

use globe_core::{ObjectKey, World};

use crate::camera::PerspectiveCamera;
use crate::resources::ResourceTracker;

/// Rate the per-frame constants were tuned at
pub const REFERENCE_FPS: f32 = 60.0;

/// Convert elapsed seconds to reference frames
#[inline]
pub fn frames(dt: f32) -> f32 {
    dt * REFERENCE_FPS
}

new_key_type! {
    /// Key to an effect in the scheduler
    pub struct EffectKey;
}

/// Error raised by an effect during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum EffectError {
    /// The scene object the effect drives no longer exists
    MissingObject { effect: String, key: ObjectKey },
    /// The scene object exists but has no geometry to animate
    MissingMesh { effect: String, key: ObjectKey },
    /// Any other inconsistency
    InvalidState(String),
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectError::MissingObject { effect, key } => {
                write!(f, "{}: scene object {:?} no longer exists", effect, key)
            }
            EffectError::MissingMesh { effect, key } => {
                write!(f, "{}: scene object {:?} has no mesh", effect, key)
            }
            EffectError::InvalidState(msg) => write!(f, "Invalid effect state: {}", msg),
        }
    }
}

impl std::error::Error for EffectError {}

/// What an effect can touch during a tick
pub struct EffectContext<'a> {
    pub world: &'a mut World,
    pub camera: &'a mut PerspectiveCamera,
    /// Seconds since the scheduler started ticking
    pub time: f32,
}

/// An effect driven by the frame loop
pub trait Tickable {
    /// Advance by `dt` seconds
    fn update(&mut self, ctx: &mut EffectContext<'_>, dt: f32) -> Result<(), EffectError>;

    /// Hand every owned scene object and GPU resource to `resources`
    ///
    /// Called once when the effect finishes or is removed. Calling it again
    /// must be harmless.
    fn dispose(&mut self, resources: &mut ResourceTracker);

    fn name(&self) -> &str;

    /// Finished effects are disposed and dropped after the tick
    fn is_finished(&self) -> bool {
        false
    }
}

/// Outcome of one scheduler tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub updated: usize,
    pub failed: usize,
    /// Finished effects disposed after the tick
    pub retired: usize,
}

/// Owner of all running effects
#[derive(Default)]
pub struct AnimationScheduler {
    effects: SlotMap<EffectKey, Box<dyn Tickable>>,
    /// Insertion order
    order: Vec<EffectKey>,
    time: f32,
    paused: bool,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start running an effect
    pub fn add<T: Tickable + 'static>(&mut self, effect: T) -> EffectKey {
        self.add_boxed(Box::new(effect))
    }

    pub fn add_boxed(&mut self, effect: Box<dyn Tickable>) -> EffectKey {
        log::debug!("Effect '{}' started", effect.name());
        let key = self.effects.insert(effect);
        self.order.push(key);
        key
    }

    /// Stop an effect and dispose it
    pub fn remove(&mut self, key: EffectKey, resources: &mut ResourceTracker) -> bool {
        let Some(mut effect) = self.effects.remove(key) else {
            return false;
        };
        self.order.retain(|k| *k != key);
        effect.dispose(resources);
        log::debug!("Effect '{}' removed", effect.name());
        true
    }

    pub fn contains(&self, key: EffectKey) -> bool {
        self.effects.contains_key(key)
    }

    pub fn get(&self, key: EffectKey) -> Option<&dyn Tickable> {
        self.effects.get(key).map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Effect names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|k| self.effects.get(*k))
            .map(|e| e.name())
            .collect()
    }

    /// Seconds ticked so far
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Run every effect once
    ///
    /// `retired` receives whatever finished effects owned.
    pub fn tick(
        &mut self,
        world: &mut World,
        camera: &mut PerspectiveCamera,
        retired: &mut ResourceTracker,
        dt: f32,
    ) -> TickSummary {
        let mut summary = TickSummary::default();
        if self.paused {
            return summary;
        }
        self.time += dt;

        let mut ctx = EffectContext {
            world,
            camera,
            time: self.time,
        };
        for key in &self.order {
            let Some(effect) = self.effects.get_mut(*key) else {
                continue;
            };
            match effect.update(&mut ctx, dt) {
                Ok(()) => summary.updated += 1,
                Err(err) => {
                    log::error!("Effect '{}' failed this frame: {}", effect.name(), err);
                    summary.failed += 1;
                }
            }
        }

        let finished: Vec<EffectKey> = self
            .order
            .iter()
            .copied()
            .filter(|k| self.effects.get(*k).is_some_and(|e| e.is_finished()))
            .collect();
        for key in finished {
            if self.remove(key, retired) {
                summary.retired += 1;
            }
        }
        summary
    }

    /// Dispose and drop every effect; returns how many there were
    pub fn dispose_all(&mut self, resources: &mut ResourceTracker) -> usize {
        let count = self.order.len();
        for key in std::mem::take(&mut self.order) {
            if let Some(mut effect) = self.effects.remove(key) {
                effect.dispose(resources);
            }
        }
        self.effects.clear();
        if count > 0 {
            log::info!("Disposed {} effects", count);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use globe_core::{ObjectKind, SceneObject};

    /// Records calls; fails on chosen frames and finishes after `lifetime` ticks
    struct Recorder {
        name: String,
        log: Rc<RefCell<Vec<String>>>,
        fail: bool,
        ticks: usize,
        lifetime: Option<usize>,
        owned: Option<ObjectKey>,
    }

    impl Recorder {
        fn new(name: &str, log: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                log: log.clone(),
                fail: false,
                ticks: 0,
                lifetime: None,
                owned: None,
            }
        }
    }

    impl Tickable for Recorder {
        fn update(&mut self, _ctx: &mut EffectContext<'_>, _dt: f32) -> Result<(), EffectError> {
            self.ticks += 1;
            self.log.borrow_mut().push(format!("update {}", self.name));
            if self.fail {
                Err(EffectError::InvalidState("scripted failure".into()))
            } else {
                Ok(())
            }
        }

        fn dispose(&mut self, resources: &mut ResourceTracker) {
            if let Some(key) = self.owned.take() {
                resources.track_object(key);
            }
            self.log.borrow_mut().push(format!("dispose {}", self.name));
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn is_finished(&self) -> bool {
            self.lifetime.is_some_and(|n| self.ticks >= n)
        }
    }

    fn setup() -> (World, PerspectiveCamera, ResourceTracker, Rc<RefCell<Vec<String>>>) {
        (
            World::new(),
            PerspectiveCamera::default(),
            ResourceTracker::new("effects"),
            Rc::new(RefCell::new(Vec::new())),
        )
    }

    #[test]
    fn test_ticks_in_insertion_order() {
        let (mut world, mut camera, mut retired, log) = setup();
        let mut scheduler = AnimationScheduler::new();
        scheduler.add(Recorder::new("a", &log));
        scheduler.add(Recorder::new("b", &log));
        scheduler.add(Recorder::new("c", &log));

        let summary = scheduler.tick(&mut world, &mut camera, &mut retired, 1.0 / 60.0);
        assert_eq!(summary.updated, 3);
        assert_eq!(*log.borrow(), vec!["update a", "update b", "update c"]);
        assert_eq!(scheduler.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_failing_effect_does_not_stop_the_loop() {
        let (mut world, mut camera, mut retired, log) = setup();
        let mut scheduler = AnimationScheduler::new();
        let mut bad = Recorder::new("bad", &log);
        bad.fail = true;
        scheduler.add(bad);
        scheduler.add(Recorder::new("good", &log));

        for _ in 0..3 {
            let summary = scheduler.tick(&mut world, &mut camera, &mut retired, 0.016);
            assert_eq!(summary.failed, 1);
            assert_eq!(summary.updated, 1);
        }
        assert_eq!(scheduler.len(), 2);
        assert_eq!(log.borrow().iter().filter(|l| *l == "update good").count(), 3);
    }

    #[test]
    fn test_finished_effects_are_retired() {
        let (mut world, mut camera, mut retired, log) = setup();
        let owned = world.add(SceneObject::new("particles", ObjectKind::Particles));
        let mut scheduler = AnimationScheduler::new();
        let mut short = Recorder::new("short", &log);
        short.lifetime = Some(2);
        short.owned = Some(owned);
        scheduler.add(short);
        let keep = scheduler.add(Recorder::new("keep", &log));

        assert_eq!(scheduler.tick(&mut world, &mut camera, &mut retired, 0.1).retired, 0);
        assert_eq!(scheduler.tick(&mut world, &mut camera, &mut retired, 0.1).retired, 1);
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.contains(keep));
        assert_eq!(retired.objects(), &[owned]);
        assert!((scheduler.time() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_remove_disposes() {
        let (_, _, mut retired, log) = setup();
        let mut scheduler = AnimationScheduler::new();
        let key = scheduler.add(Recorder::new("a", &log));
        assert!(scheduler.remove(key, &mut retired));
        assert!(!scheduler.remove(key, &mut retired));
        assert_eq!(*log.borrow(), vec!["dispose a"]);
    }

    #[test]
    fn test_dispose_all_is_idempotent() {
        let (_, _, mut retired, log) = setup();
        let mut scheduler = AnimationScheduler::new();
        scheduler.add(Recorder::new("a", &log));
        scheduler.add(Recorder::new("b", &log));
        assert_eq!(scheduler.dispose_all(&mut retired), 2);
        assert_eq!(scheduler.dispose_all(&mut retired), 0);
        assert!(scheduler.is_empty());
        assert_eq!(*log.borrow(), vec!["dispose a", "dispose b"]);
    }

    #[test]
    fn test_paused_scheduler_skips_updates() {
        let (mut world, mut camera, mut retired, log) = setup();
        let mut scheduler = AnimationScheduler::new();
        scheduler.add(Recorder::new("a", &log));
        scheduler.set_paused(true);
        let summary = scheduler.tick(&mut world, &mut camera, &mut retired, 0.1);
        assert_eq!(summary, TickSummary::default());
        assert!(log.borrow().is_empty());
        assert_eq!(scheduler.time(), 0.0);
    }

    #[test]
    fn test_frames() {
        assert_eq!(frames(1.0 / 60.0), 1.0);
        assert_eq!(frames(0.5), 30.0);
    }

    #[test]
    fn test_error_display() {
        let err = EffectError::InvalidState("x".into());
        assert_eq!(err.to_string(), "Invalid effect state: x");
    }
}
