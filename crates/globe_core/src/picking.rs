//! Ray picking against scene objects
//!
//! Each visible, pickable object is treated as its bounding sphere.
//!
//! Ordering contract:
//! - The closest hit along the ray wins.
//! - Hits at the same distance go to the object inserted first.

use globe_math::{ray_sphere_intersection, Ray, Vec3};

use crate::world::{ObjectKey, SceneObject, World};

/// Result of a successful pick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickHit {
    pub key: ObjectKey,
    /// Distance along the ray to the hit
    pub distance: f32,
    /// World-space hit point on the bounding sphere
    pub point: Vec3,
}

/// Nearest pickable object hit by `ray`
pub fn pick_ray(world: &World, ray: &Ray) -> Option<PickHit> {
    pick_ray_filtered(world, ray, |_| true)
}

/// Nearest hit among objects accepted by `filter`
pub fn pick_ray_filtered<F>(world: &World, ray: &Ray, mut filter: F) -> Option<PickHit>
where
    F: FnMut(&SceneObject) -> bool,
{
    let mut best: Option<(f32, ObjectKey)> = None;

    for (key, object) in world.iter() {
        if !object.visible || !object.pickable || !filter(object) {
            continue;
        }
        let (center, radius) = object.bounding_sphere();
        let Some(t) = ray_sphere_intersection(ray, center, radius) else {
            continue;
        };
        // Strict comparison keeps the earlier object on ties
        if best.map_or(true, |(bt, _)| t < bt) {
            best = Some((t, key));
        }
    }

    let (distance, key) = best?;
    Some(PickHit {
        key,
        distance,
        point: ray.at(distance),
    })
}

/// Every pickable object hit by `ray`, nearest first
pub fn pick_all(world: &World, ray: &Ray) -> Vec<PickHit> {
    let mut hits: Vec<PickHit> = world
        .iter()
        .filter(|(_, o)| o.visible && o.pickable)
        .filter_map(|(key, object)| {
            let (center, radius) = object.bounding_sphere();
            let t = ray_sphere_intersection(ray, center, radius)?;
            Some(PickHit { key, distance: t, point: ray.at(t) })
        })
        .collect();
    // Stable sort keeps insertion order among equal distances
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Screen picking wrapper
///
/// The caller supplies the screen->ray mapping via `make_ray`.
pub fn pick_screen<F>(world: &World, x_px: f32, y_px: f32, mut make_ray: F) -> Option<PickHit>
where
    F: FnMut(f32, f32) -> Option<Ray>,
{
    let ray = make_ray(x_px, y_px)?;
    pick_ray(world, &ray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ObjectKind, Transform};

    fn sphere(name: &str, position: Vec3, radius: f32) -> SceneObject {
        SceneObject::new(name, ObjectKind::Helper)
            .with_transform(Transform::at(position))
            .with_pick_radius(radius)
    }

    fn down_z() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 10.0), -Vec3::Z).unwrap()
    }

    #[test]
    fn test_empty_world_no_hit() {
        assert!(pick_ray(&World::new(), &down_z()).is_none());
    }

    #[test]
    fn test_nearest_hit_wins() {
        let mut world = World::new();
        let far = world.add(sphere("far", Vec3::new(0.0, 0.0, -5.0), 1.0));
        let near = world.add(sphere("near", Vec3::new(0.0, 0.0, 5.0), 1.0));
        let hit = pick_ray(&world, &down_z()).unwrap();
        assert_eq!(hit.key, near);
        assert!((hit.distance - 4.0).abs() < 1e-5);
        assert!((hit.point.z - 6.0).abs() < 1e-5);

        let all = pick_all(&world, &down_z());
        assert_eq!(all.iter().map(|h| h.key).collect::<Vec<_>>(), vec![near, far]);
    }

    #[test]
    fn test_tie_goes_to_first_inserted() {
        let mut world = World::new();
        let first = world.add(sphere("first", Vec3::ZERO, 1.0));
        world.add(sphere("second", Vec3::ZERO, 1.0));
        assert_eq!(pick_ray(&world, &down_z()).unwrap().key, first);
    }

    #[test]
    fn test_hidden_and_unpickable_ignored() {
        let mut world = World::new();
        let hidden = world.add(sphere("hidden", Vec3::new(0.0, 0.0, 5.0), 1.0));
        world.get_mut(hidden).unwrap().set_visible(false);
        world.add(SceneObject::new("plain", ObjectKind::Helper));
        let target = world.add(sphere("target", Vec3::ZERO, 1.0));
        assert_eq!(pick_ray(&world, &down_z()).unwrap().key, target);
    }

    #[test]
    fn test_filter_and_screen_wrapper() {
        let mut world = World::new();
        world.add(sphere("near", Vec3::new(0.0, 0.0, 5.0), 1.0));
        let far = world.add(sphere("far", Vec3::ZERO, 1.0));
        let hit = pick_ray_filtered(&world, &down_z(), |o| o.name == "far").unwrap();
        assert_eq!(hit.key, far);

        assert!(pick_screen(&world, 0.0, 0.0, |_, _| None).is_none());
        assert!(pick_screen(&world, 0.0, 0.0, |_, _| Some(down_z())).is_some());
    }
}
