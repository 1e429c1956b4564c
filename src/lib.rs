//! Globe Logistics
//!
//! Interactive 3D globe for visualizing logistics data: cities as pulsing
//! markers, routes as animated arcs, and heatmap, time-series or category
//! overlays on top.
//!
//! The library half holds everything that can run without a window, so
//! the whole application can be driven headless in tests. The binary adds
//! the window, the wgpu surface and the event loop.

pub mod app;
pub mod config;
pub mod systems;

pub use app::{AppError, GlobeApp};
pub use config::{AppConfig, ConfigError};
