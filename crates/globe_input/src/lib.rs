//! Input handling for the globe
//!
//! Orbit camera controls driven by winit mouse events, and the modal
//! pointer interaction (hover, select, measure, route building, area
//! selection) that works on the scene world.

mod orbit;
mod interaction;

pub use orbit::{OrbitCamera, OrbitController};
pub use interaction::{InteractionController, InteractionMode, ScreenProjector, SelectionBox};
