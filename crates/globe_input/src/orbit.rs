//! Orbit controls around the globe
//!
//! Controls:
//! - Left drag: orbit around the target
//! - Mouse wheel: zoom, clamped to the configured distance range
//!
//! Panning is disabled; the camera always looks at its target. Angular
//! velocity decays by the damping factor every update, so a drag keeps
//! drifting briefly after release.

use std::f32::consts::PI;

use globe_math::Vec3;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// Keeps the polar angle away from the poles
const POLAR_EPSILON: f32 = 1e-4;

/// Zoom factor per wheel notch
const ZOOM_BASE: f32 = 0.95;

/// Pixels per wheel line for pixel-precise touchpads
const PIXELS_PER_LINE: f32 = 40.0;

/// Orbit controller state
pub struct OrbitController {
    dragging: bool,
    cursor: Option<(f64, f64)>,
    pending_dx: f32,
    pending_dy: f32,
    pending_zoom: f32,

    // Angular velocity carried between updates when damping is enabled
    delta_theta: f32,
    delta_phi: f32,

    // Configuration
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub damping_factor: f32,
    pub enable_damping: bool,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitController {
    pub fn new() -> Self {
        Self {
            dragging: false,
            cursor: None,
            pending_dx: 0.0,
            pending_dy: 0.0,
            pending_zoom: 0.0,

            delta_theta: 0.0,
            delta_phi: 0.0,

            rotate_speed: 0.5,
            zoom_speed: 1.0,
            damping_factor: 0.05,
            enable_damping: true,
            min_distance: 3.0,
            max_distance: 10.0,
        }
    }

    /// Process mouse button input
    ///
    /// Returns true when the event was consumed.
    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) -> bool {
        if button != MouseButton::Left {
            return false;
        }
        self.dragging = state == ElementState::Pressed;
        true
    }

    /// Process an absolute cursor position in physical pixels
    pub fn process_cursor_moved(&mut self, x: f64, y: f64) {
        if let Some((last_x, last_y)) = self.cursor {
            if self.dragging {
                self.pending_dx += (x - last_x) as f32;
                self.pending_dy += (y - last_y) as f32;
            }
        }
        self.cursor = Some((x, y));
    }

    /// Process a mouse wheel event
    pub fn process_scroll(&mut self, delta: MouseScrollDelta) {
        let notches = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
        };
        self.pending_zoom += notches;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Last known cursor position in physical pixels
    pub fn cursor(&self) -> Option<(f64, f64)> {
        self.cursor
    }

    /// Apply accumulated input to the camera
    ///
    /// A drag across the full viewport height turns the camera by
    /// `2π · rotate_speed`. Returns the new camera distance from the target.
    pub fn update<C: OrbitCamera>(&mut self, camera: &mut C, viewport_height: f32) -> f32 {
        let height = viewport_height.max(1.0);
        self.delta_theta -= 2.0 * PI * self.pending_dx / height * self.rotate_speed;
        self.delta_phi -= 2.0 * PI * self.pending_dy / height * self.rotate_speed;
        self.pending_dx = 0.0;
        self.pending_dy = 0.0;

        let target = camera.target();
        let offset = camera.position() - target;
        let mut radius = offset.length();
        let (mut theta, mut phi) = if radius > f32::EPSILON {
            (offset.x.atan2(offset.z), (offset.y / radius).clamp(-1.0, 1.0).acos())
        } else {
            (0.0, PI / 2.0)
        };

        if self.enable_damping {
            theta += self.delta_theta * self.damping_factor;
            phi += self.delta_phi * self.damping_factor;
        } else {
            theta += self.delta_theta;
            phi += self.delta_phi;
        }
        phi = phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        if self.pending_zoom != 0.0 {
            let scale = ZOOM_BASE.powf(self.zoom_speed * self.pending_zoom);
            radius *= scale;
            self.pending_zoom = 0.0;
        }
        radius = radius.clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let position = target
            + Vec3::new(
                radius * sin_phi * theta.sin(),
                radius * phi.cos(),
                radius * sin_phi * theta.cos(),
            );
        camera.set_position(position);

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }

        radius
    }

    /// Drop any residual drift
    pub fn stop(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.pending_dx = 0.0;
        self.pending_dy = 0.0;
        self.pending_zoom = 0.0;
    }

    /// Builder: set rotate speed
    pub fn with_rotate_speed(mut self, speed: f32) -> Self {
        self.rotate_speed = speed;
        self
    }

    /// Builder: set zoom speed
    pub fn with_zoom_speed(mut self, speed: f32) -> Self {
        self.zoom_speed = speed;
        self
    }

    /// Builder: set damping factor (0 disables damping)
    pub fn with_damping(mut self, factor: f32) -> Self {
        self.damping_factor = factor.clamp(0.0, 1.0);
        self.enable_damping = self.damping_factor > 0.0;
        self
    }

    /// Builder: set the zoom range
    pub fn with_distance_range(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min.min(max);
        self.max_distance = max.max(min);
        self
    }
}

/// Trait for camera control
/// Lets the controller drive any camera that looks at a fixed target
pub trait OrbitCamera {
    fn position(&self) -> Vec3;
    fn target(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
}
