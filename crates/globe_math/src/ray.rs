//! Rays and ray/sphere intersection

use crate::Vec3;

/// A ray with a unit-length direction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    /// Create a ray, normalizing the direction
    ///
    /// Returns `None` for a zero or non-finite direction.
    pub fn new(origin: Vec3, dir: Vec3) -> Option<Self> {
        let dir = dir.try_normalized(1e-12)?;
        Some(Self { origin, dir })
    }

    /// Point at distance `t` along the ray
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Distance along `ray` to the first intersection with a sphere
///
/// Returns the nearest non-negative `t`. A ray starting inside the sphere
/// reports the exit point.
pub fn ray_sphere_intersection(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t0 = -b - sqrt_disc;
    let t1 = -b + sqrt_disc;
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_direction_rejected() {
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_hit_from_outside() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z).unwrap();
        let t = ray_sphere_intersection(&ray, Vec3::ZERO, 2.0).unwrap();
        assert!((t - 3.0).abs() < 1e-5);
        assert!((ray.at(t).z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_miss() {
        let ray = Ray::new(Vec3::new(0.0, 3.0, 5.0), -Vec3::Z).unwrap();
        assert!(ray_sphere_intersection(&ray, Vec3::ZERO, 2.0).is_none());
    }

    #[test]
    fn test_sphere_behind_ray() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z).unwrap();
        assert!(ray_sphere_intersection(&ray, Vec3::ZERO, 2.0).is_none());
    }

    #[test]
    fn test_inside_reports_exit() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X).unwrap();
        let t = ray_sphere_intersection(&ray, Vec3::ZERO, 2.0).unwrap();
        assert!((t - 2.0).abs() < 1e-5);
    }
}
