//! Geographic coordinates and their placement on a sphere
//!
//! Two axis conventions exist for mapping latitude/longitude to Cartesian
//! space. Both are expressed by one function parameterized by
//! [`SphereConvention`].

use std::f64::consts::PI;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::Vec3;

/// Latitude range (inclusive)
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
/// Longitude range (inclusive)
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// A latitude/longitude pair in degrees
///
/// Values built with [`GeoPoint::new`] are guaranteed to be in range.
/// Deserialized or [`GeoPoint::new_unchecked`] values must be checked with
/// [`GeoPoint::is_valid`] before use; the data validator does this for
/// every imported city.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Create a validated point
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        let point = Self { latitude, longitude };
        if !latitude_in_range(latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !longitude_in_range(longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        Ok(point)
    }

    /// Create a point without range checks (parsers, tests)
    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Latitude in degrees
    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees
    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Both coordinates finite and inside their closed ranges
    pub fn is_valid(&self) -> bool {
        latitude_in_range(self.latitude) && longitude_in_range(self.longitude)
    }
}

fn latitude_in_range(lat: f64) -> bool {
    lat >= LATITUDE_RANGE.0 && lat <= LATITUDE_RANGE.1
}

fn longitude_in_range(lon: f64) -> bool {
    lon >= LONGITUDE_RANGE.0 && lon <= LONGITUDE_RANGE.1
}

/// Error constructing a [`GeoPoint`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GeoError {
    /// Latitude outside [-90, 90] or NaN
    LatitudeOutOfRange(f64),
    /// Longitude outside [-180, 180] or NaN
    LongitudeOutOfRange(f64),
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoError::LatitudeOutOfRange(v) => write!(f, "Latitude out of range: {}", v),
            GeoError::LongitudeOutOfRange(v) => write!(f, "Longitude out of range: {}", v),
        }
    }
}

impl std::error::Error for GeoError {}

/// How latitude/longitude map onto sphere axes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SphereConvention {
    /// phi measured from the north pole (`90 - lat`), theta = `lon + 180`,
    /// X mirrored. Lines up with equirectangular earth textures on a
    /// standard UV sphere; (0, 0) lands on +X.
    #[default]
    Polar,
    /// phi measured from the equator (`lat`), theta = `lon`, result
    /// swizzled to `(z, y, x)`.
    Equatorial,
}

/// Convert latitude/longitude (degrees) to a point on a sphere
///
/// `rotation` (radians) is added to the longitude angle. The result always
/// lies at distance `radius` from the origin.
pub fn lat_lon_to_vec3(
    point: GeoPoint,
    radius: f32,
    rotation: f32,
    convention: SphereConvention,
) -> Vec3 {
    let lat = point.latitude;
    let lon = point.longitude;
    let r = radius as f64;
    let rotation = rotation as f64;

    match convention {
        SphereConvention::Polar => {
            let phi = (90.0 - lat) * PI / 180.0;
            let theta = (lon + 180.0) * PI / 180.0 + rotation;
            Vec3::new(
                (-(r * phi.sin() * theta.cos())) as f32,
                (r * phi.cos()) as f32,
                (r * phi.sin() * theta.sin()) as f32,
            )
        }
        SphereConvention::Equatorial => {
            let phi = lat * PI / 180.0;
            let theta = lon * PI / 180.0 + rotation;
            let x = r * phi.cos() * theta.cos();
            let y = r * phi.sin();
            let z = r * phi.cos() * theta.sin();
            Vec3::new(z as f32, y as f32, x as f32)
        }
    }
}

/// Inverse of [`lat_lon_to_vec3`]: recover (latitude, longitude) in degrees
///
/// Longitude is normalized to [-180, 180). At the poles longitude is
/// undefined and reported as whatever `atan2` yields.
pub fn vec3_to_lat_lon(p: Vec3, rotation: f32, convention: SphereConvention) -> (f64, f64) {
    let r = p.length() as f64;
    if r == 0.0 {
        return (0.0, 0.0);
    }
    let (x, y, z) = (p.x as f64, p.y as f64, p.z as f64);
    let rotation_deg = (rotation as f64).to_degrees();

    match convention {
        SphereConvention::Polar => {
            let phi = (y / r).clamp(-1.0, 1.0).acos();
            let theta = z.atan2(-x);
            let lat = 90.0 - phi.to_degrees();
            let lon = theta.to_degrees() - 180.0 - rotation_deg;
            (lat, wrap_longitude(lon))
        }
        SphereConvention::Equatorial => {
            // Swizzled: p = (cos phi sin theta, sin phi, cos phi cos theta)
            let lat = (y / r).clamp(-1.0, 1.0).asin().to_degrees();
            let theta = x.atan2(z);
            let lon = theta.to_degrees() - rotation_deg;
            (lat, wrap_longitude(lon))
        }
    }
}

/// Wrap any angle in degrees into [-180, 180)
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Spherical texture coordinates of a point: (theta / 2π, phi / π)
///
/// theta is the azimuth around +Y measured from +Z toward +X, phi the polar
/// angle from +Y. Both outputs lie in [0, 1].
pub fn spherical_uv(p: Vec3) -> (f32, f32) {
    let r = p.length();
    if r == 0.0 {
        return (0.0, 0.0);
    }
    let theta = p.x.atan2(p.z);
    let theta = if theta < 0.0 { theta + std::f32::consts::TAU } else { theta };
    let phi = (p.y / r).clamp(-1.0, 1.0).acos();
    (theta / std::f32::consts::TAU, phi / std::f32::consts::PI)
}
