//! Application systems
//!
//! Window, rendering and frame timing, kept out of main.rs so the
//! application itself stays window-independent.

mod render;
mod simulation;
mod window;

pub use render::RenderSystem;
pub use simulation::{SimulationSystem, MAX_FRAME_DT};
pub use window::{TitleStatus, WindowError, WindowSystem};
