//! Frame simulation system
//!
//! Manages the per-frame update including:
//! - Delta time calculation
//! - Stepping the globe application (orbit, effects, overlays, GPU sync)
//! - Reporting effect faults

use std::time::Instant;
use globe_render::{GpuBackend, TickSummary};

use crate::app::GlobeApp;

/// Longest step a single frame may take, in seconds
pub const MAX_FRAME_DT: f32 = 0.25;

/// Manages the frame loop timing
pub struct SimulationSystem {
    last_frame: Instant,
    frames: u64,
}

impl SimulationSystem {
    /// Create a new simulation system
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            frames: 0,
        }
    }

    /// Run one frame of the application
    ///
    /// Returns the scheduler summary of the frame.
    pub fn update<B: GpuBackend>(&mut self, app: &mut GlobeApp<B>) -> TickSummary {
        let now = Instant::now();
        let raw_dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.step(app, raw_dt)
    }

    /// Run one frame with an explicit elapsed time
    pub fn step<B: GpuBackend>(&mut self, app: &mut GlobeApp<B>, raw_dt: f32) -> TickSummary {
        // Cap dt so a stall (first frame, window drag) does not jump the animations
        let dt = raw_dt.clamp(0.0, MAX_FRAME_DT);
        self.frames += 1;

        let summary = app.frame(dt);
        if summary.failed > 0 {
            log::debug!("Frame {}: {} effects failed", self.frames, summary.failed);
        }
        summary
    }

    /// Frames run so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for SimulationSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_render::HeadlessBackend;

    use crate::config::AppConfig;

    #[test]
    fn test_default_construction() {
        let sim = SimulationSystem::default();
        assert!(sim.last_frame.elapsed().as_millis() < 100);
        assert_eq!(sim.frames(), 0);
    }

    #[test]
    fn test_long_frames_are_capped() {
        let mut config = AppConfig::default();
        config.globe.segments = 16;
        config.animation.particle_count = 0;
        let mut app = GlobeApp::new(config, HeadlessBackend::new());
        let mut sim = SimulationSystem::new();

        sim.step(&mut app, 10.0);
        // One frame of 0.25 s still closes no one-second FPS window
        assert_eq!(app.monitor().fps(), 0);
        sim.step(&mut app, -1.0);
        assert_eq!(sim.frames(), 2);
    }
}
