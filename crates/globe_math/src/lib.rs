//! Globe Mathematics Library
//!
//! This crate provides the vector, matrix and geographic types used to place
//! data on a sphere and to interact with it.
//!
//! ## Core Types
//!
//! - [`Vec3`] - 3D vector with x, y, z components
//! - [`Mat4`] - 4x4 column-major matrix for view and projection
//! - [`Ray`] - Half-line used for picking
//!
//! ## Geography
//!
//! - [`GeoPoint`] - Validated latitude/longitude pair
//! - [`SphereConvention`] - How latitude/longitude map onto sphere axes
//! - [`QuadraticBezier`] - Route arcs lifted off the sphere surface
//! - [`Ease`] - Easing curves for tweens

mod vec3;
pub mod mat4;
pub mod ray;
pub mod geo;
pub mod arc;
pub mod easing;

pub use vec3::Vec3;
pub use mat4::Mat4;
pub use ray::{Ray, ray_sphere_intersection};
pub use geo::{GeoPoint, GeoError, SphereConvention, lat_lon_to_vec3, vec3_to_lat_lon, spherical_uv};
pub use arc::{ArcStyle, QuadraticBezier, ARC_SEGMENTS, arc_control_point, lifted_control_point, route_arc};
pub use easing::Ease;
