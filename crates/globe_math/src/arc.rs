//! Route arcs between two surface points
//!
//! A route is drawn as a quadratic Bézier lifted off the sphere. The control
//! point is either pushed sideways along the plane normal of the two
//! endpoints ([`ArcStyle::Normal`]) or straight out from the midpoint
//! ([`ArcStyle::Lifted`]). Antipodal and coincident endpoints have no plane
//! normal; both builders fall back to a perpendicular of the start vector so
//! the output never contains NaN.

use serde::{Serialize, Deserialize};

use crate::Vec3;

/// Number of segments a route arc is sampled into
pub const ARC_SEGMENTS: usize = 50;

/// Default sideways offset factor for [`ArcStyle::Normal`]
pub const DEFAULT_ARC_FACTOR: f32 = 0.3;

/// Default height factor for [`ArcStyle::Lifted`]
pub const DEFAULT_LIFT_FACTOR: f32 = 0.2;

const DEGENERATE_EPSILON: f32 = 1e-6;

/// How the arc's control point is placed
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum ArcStyle {
    /// Midpoint offset along `normalize(start × end)` by `chord * arc_factor`
    Normal { arc_factor: f32 },
    /// Midpoint pushed out to radius `|start| + chord * height_factor`
    Lifted { height_factor: f32 },
}

impl Default for ArcStyle {
    fn default() -> Self {
        ArcStyle::Lifted { height_factor: DEFAULT_LIFT_FACTOR }
    }
}

/// Quadratic Bézier curve
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadraticBezier {
    pub p0: Vec3,
    pub p1: Vec3,
    pub p2: Vec3,
}

impl QuadraticBezier {
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        Self { p0, p1, p2 }
    }

    /// Build the curve for a route between two surface points
    pub fn for_route(start: Vec3, end: Vec3, style: ArcStyle) -> Self {
        let control = match style {
            ArcStyle::Normal { arc_factor } => arc_control_point(start, end, arc_factor),
            ArcStyle::Lifted { height_factor } => lifted_control_point(start, end, height_factor),
        };
        Self::new(start, control, end)
    }

    /// Evaluate the curve at `t` in [0, 1]
    pub fn point_at(&self, t: f32) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        self.p0 * (u * u) + self.p1 * (2.0 * u * t) + self.p2 * (t * t)
    }

    /// Sample `divisions + 1` evenly spaced points, endpoints included
    pub fn sample(&self, divisions: usize) -> Vec<Vec3> {
        let divisions = divisions.max(1);
        (0..=divisions)
            .map(|i| self.point_at(i as f32 / divisions as f32))
            .collect()
    }

    /// Approximate curve length from a sampled polyline
    pub fn approximate_length(&self, divisions: usize) -> f32 {
        self.sample(divisions)
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .sum()
    }
}

/// Control point offset sideways along the normal of the endpoint plane
pub fn arc_control_point(start: Vec3, end: Vec3, arc_factor: f32) -> Vec3 {
    let mid = start.lerp(end, 0.5);
    let chord = start.distance(end);
    let normal = start
        .cross(end)
        .try_normalized(DEGENERATE_EPSILON)
        .unwrap_or_else(|| start.any_perpendicular());
    mid + normal * (chord * arc_factor)
}

/// Control point lifted radially above the chord midpoint
pub fn lifted_control_point(start: Vec3, end: Vec3, height_factor: f32) -> Vec3 {
    let mid = start.lerp(end, 0.5);
    let chord = start.distance(end);
    let direction = mid
        .try_normalized(DEGENERATE_EPSILON)
        .unwrap_or_else(|| start.any_perpendicular());
    direction * (start.length() + chord * height_factor)
}

/// Sampled polyline for a route, `ARC_SEGMENTS + 1` points long
pub fn route_arc(start: Vec3, end: Vec3, style: ArcStyle) -> Vec<Vec3> {
    QuadraticBezier::for_route(start, end, style).sample(ARC_SEGMENTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{lat_lon_to_vec3, GeoPoint, SphereConvention};

    fn surface(lat: f64, lon: f64) -> Vec3 {
        lat_lon_to_vec3(GeoPoint::new(lat, lon).unwrap(), 2.0, 0.0, SphereConvention::Polar)
    }

    fn styles() -> [ArcStyle; 2] {
        [
            ArcStyle::Normal { arc_factor: DEFAULT_ARC_FACTOR },
            ArcStyle::Lifted { height_factor: DEFAULT_LIFT_FACTOR },
        ]
    }

    #[test]
    fn test_arc_has_fixed_resolution_and_endpoints() {
        let a = surface(39.9042, 116.4074);
        let b = surface(40.7128, -74.006);
        for style in styles() {
            let points = route_arc(a, b, style);
            assert_eq!(points.len(), ARC_SEGMENTS + 1);
            assert_eq!(points[0], a);
            assert!(points[ARC_SEGMENTS].distance(b) < 1e-5);
        }
    }

    #[test]
    fn test_lifted_arc_rises_above_surface() {
        let a = surface(51.5074, -0.1278);
        let b = surface(52.52, 13.405);
        let points = route_arc(a, b, ArcStyle::default());
        let peak = points.iter().map(|p| p.length()).fold(0.0f32, f32::max);
        assert!(peak > 2.0);
    }

    #[test]
    fn test_normal_control_point_is_offset_from_midpoint() {
        let a = surface(0.0, 0.0);
        let b = surface(0.0, 90.0);
        let control = arc_control_point(a, b, 0.3);
        let mid = a.lerp(b, 0.5);
        let expected = a.distance(b) * 0.3;
        assert!((control.distance(mid) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_antipodal_points_produce_no_nan() {
        let a = surface(0.0, 0.0);
        let b = surface(0.0, 180.0);
        for style in styles() {
            let points = route_arc(a, b, style);
            assert!(points.iter().all(|p| p.is_finite()), "{style:?} produced NaN");
        }
    }

    #[test]
    fn test_coincident_points_produce_no_nan() {
        let a = surface(48.8566, 2.3522);
        for style in styles() {
            let points = route_arc(a, a, style);
            assert!(points.iter().all(|p| p.is_finite()));
        }
        // Zero chord means zero offset
        assert!(arc_control_point(a, a, 0.3).distance(a) < 1e-5);
    }

    #[test]
    fn test_sample_minimum_divisions() {
        let curve = QuadraticBezier::new(Vec3::ZERO, Vec3::Y, Vec3::X);
        assert_eq!(curve.sample(0).len(), 2);
        assert!(curve.approximate_length(10) > 1.0);
    }
}
