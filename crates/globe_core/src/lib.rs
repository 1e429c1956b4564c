//! Core types for the globe visualization
//!
//! - [`GlobalData`] - Cities, routes and metadata, imported and exported as a whole
//! - [`DataValidator`] - Checks a dataset before it is accepted
//! - [`DataFormat`] - JSON, CSV and GeoJSON codecs
//! - [`DataStore`] - Owner of the current dataset
//! - [`ThemeRegistry`] - Built-in and custom themes with one active selection
//! - [`World`] - Scene objects keyed by [`ObjectKey`], each optionally carrying a [`Mesh`]
//! - [`pick_ray`] - Nearest pickable object along a ray
//! - [`AssetCache`] / [`TextureLoader`] - Texture caching and cooperative loading
//! - [`Tween`] / [`CancellationToken`] - Frame-driven interpolation that can be stopped

mod data;
mod data_validator;
mod data_io;
mod store;
mod theme;
mod mesh;
mod world;
mod picking;
mod asset_error;
mod asset_cache;
mod loader;
mod tween;

pub use data::{City, FlightRoute, GlobalData, Metadata, DATA_VERSION, route_id, now_rfc3339};
pub use data_validator::{DataValidator, ValidationError};
pub use data_io::{DataFormat, DataIoError};
pub use store::{DataStore, export_file_name};
pub use theme::{
    Color, ColorRole, PartialTheme, Theme, ThemeAnimations, ThemeColors, ThemeError, ThemeFonts,
    ThemeRegistry, ThemeSizes, DEFAULT_THEME,
};
pub use mesh::{Mesh, Topology};
pub use world::{DirtyFlags, Material, ObjectKey, ObjectKind, SceneObject, Transform, World};
pub use picking::{PickHit, pick_all, pick_ray, pick_ray_filtered, pick_screen};
pub use asset_error::AssetError;
pub use asset_cache::{Asset, AssetCache, AssetHandle, AssetId, ImageFormat, TextureAsset};
pub use loader::{LoadProgress, TextureLoader};
pub use tween::{CancellationToken, RepeatMode, Tween, TweenState, Tweenable};

// Re-export the math types every consumer needs
pub use globe_math::{GeoPoint, Ray, Vec3};
