//! Scene lifecycle through a RenderContext on the headless backend

use globe_core::{Color, Mesh, ObjectKind, SceneObject, Topology};
use globe_math::{lat_lon_to_vec3, route_arc, ArcStyle, Ease, GeoPoint, SphereConvention, Vec3};
use globe_render::geometry::uv_sphere;
use globe_render::{
    DataPoint, Feature, FlyLine, GlobeRotation, GpuBackend, HeadlessBackend, MarkerPulse,
    OverlayManager, OverlayMode, OverlaySettings, ParticleField, PerspectiveCamera, RenderContext,
    RouteFade,
};

const RADIUS: f32 = 2.0;
const DT: f32 = 1.0 / 60.0;

fn city(lat: f64, lon: f64) -> Vec3 {
    lat_lon_to_vec3(GeoPoint::new(lat, lon).unwrap(), RADIUS, 0.0, SphereConvention::Polar)
}

fn build_scene(ctx: &mut RenderContext<HeadlessBackend>) {
    let globe = ctx.spawn(
        Feature::Globe,
        SceneObject::new("globe", ObjectKind::Globe).with_mesh(uv_sphere(RADIUS, 32)),
    );
    ctx.add_effect(GlobeRotation::new(globe, 0.001));

    let beijing = city(39.9042, 116.4074);
    let new_york = city(40.7128, -74.006);
    for (id, position) in [("PEK", beijing), ("JFK", new_york)] {
        let marker = ctx.spawn(
            Feature::Markers,
            SceneObject::new(id, ObjectKind::CityMarker { city_id: id.into() })
                .with_mesh(uv_sphere(0.05, 8))
                .with_transform(globe_core::Transform::at(position)),
        );
        let ring = ctx.spawn(
            Feature::Markers,
            SceneObject::new(format!("{id}-ring"), ObjectKind::MarkerRing { city_id: id.into() })
                .with_mesh(uv_sphere(0.08, 8))
                .with_transform(globe_core::Transform::at(position)),
        );
        ctx.add_effect(MarkerPulse::new(marker, 1.0).with_ring(ring));
    }

    let arc = route_arc(beijing, new_york, ArcStyle::default());
    let route = ctx.spawn(
        Feature::Routes,
        SceneObject::new("PEK-JFK", ObjectKind::Route { route_id: "PEK-JFK".into() })
            .with_mesh(Mesh::from_positions(Topology::LineStrip, arc)),
    );
    ctx.add_effect(RouteFade::new(route));
    ctx.add_effect(FlyLine::new(route, 1.0));

    let particles = ParticleField::spawn(ctx.world_mut(), 200, 0.05, 7, Color::WHITE);
    ctx.add_effect(particles);
}

#[test]
fn test_frames_upload_and_animate() {
    let mut ctx = RenderContext::new(HeadlessBackend::new(), PerspectiveCamera::new());
    build_scene(&mut ctx);
    assert_eq!(ctx.scheduler().len(), 6);

    for _ in 0..30 {
        let summary = ctx.tick(DT);
        assert_eq!(summary.failed, 0);
        ctx.sync_gpu();
    }

    // globe, 2 markers, 2 rings, 1 route, particles
    assert_eq!(ctx.world().len(), 7);
    assert_eq!(ctx.backend().live_count(), 7);
    let stats = ctx.stats();
    assert_eq!(stats.draw_calls, 7);
    assert!(stats.memory_bytes > 0);
}

#[test]
fn test_reloading_routes_leaves_no_orphans() {
    let mut ctx = RenderContext::new(HeadlessBackend::new(), PerspectiveCamera::new());
    build_scene(&mut ctx);
    ctx.sync_gpu();
    let before = ctx.backend().live_count();

    ctx.dispose_feature(Feature::Routes);
    let arc = route_arc(city(51.5074, -0.1278), city(40.7128, -74.006), ArcStyle::default());
    ctx.spawn(
        Feature::Routes,
        SceneObject::new("LHR-JFK", ObjectKind::Route { route_id: "LHR-JFK".into() })
            .with_mesh(Mesh::from_positions(Topology::LineStrip, arc)),
    );
    ctx.sync_gpu();
    assert_eq!(ctx.backend().live_count(), before);

    // Effects still pointing at the old route fail but do not stop the frame
    let summary = ctx.tick(DT);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.updated, 4);
}

#[test]
fn test_overlay_switch_and_teardown() {
    let mut ctx = RenderContext::new(HeadlessBackend::new(), PerspectiveCamera::new());
    build_scene(&mut ctx);
    let settings = OverlaySettings {
        heatmap: globe_render::overlay::HeatmapSettings {
            size: 32,
            ..Default::default()
        },
        ..OverlaySettings::default()
    };
    let mut overlays = OverlayManager::new(settings);
    let points = vec![
        DataPoint::new(city(39.9042, 116.4074), 5.0)
            .with_timestamp(0.0)
            .with_category("air"),
        DataPoint::new(city(40.7128, -74.006), 2.0)
            .with_timestamp(2000.0)
            .with_category("sea"),
    ];

    {
        let parts = ctx.parts(Feature::Overlays);
        overlays.set_data(points, parts.world, parts.backend, parts.tracker);
        overlays.set_mode(Some(OverlayMode::Heatmap), parts.world, parts.backend, parts.tracker);
    }
    assert!(overlays.heatmap_texture().is_some());
    assert_eq!(ctx.stats().textures, 1);

    {
        let parts = ctx.parts(Feature::Overlays);
        overlays.set_mode(Some(OverlayMode::Category), parts.world, parts.backend, parts.tracker);
    }
    ctx.sync_gpu();
    assert_eq!(ctx.stats().textures, 0);
    assert!(ctx.world().find_by_name("category-air").is_some());
    assert!(ctx.world().find_by_name("heatmap").is_none());

    ctx.fly_to(Vec3::new(0.0, 0.0, 8.0), Vec3::ZERO, 1.0, Ease::Power2InOut);
    ctx.tick(DT);

    assert!(ctx.dispose_all() > 0);
    assert_eq!(ctx.backend().live_count(), 0);
    assert!(ctx.world().is_empty());
    assert!(ctx.scheduler().is_empty());
    assert_eq!(ctx.dispose_all(), 0);
}
