#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn cam(scale: f64, tx: f64, ty: f64) -> Camera {
    Camera { scale, translate: Point::new(tx, ty), ..Camera::default() }
}

// --- Point ---

#[test]
fn point_new() {
    let p = Point::new(3.0, 4.0);
    assert_eq!(p.x, 3.0);
    assert_eq!(p.y, 4.0);
}

#[test]
fn point_distance() {
    assert!(approx_eq(Point::new(0.0, 0.0).distance_to(Point::new(3.0, 4.0)), 5.0));
}

#[test]
fn point_serializes_as_xy_object() {
    let json = serde_json::to_value(Point::new(1.5, -2.0)).unwrap();
    assert_eq!(json, serde_json::json!({ "x": 1.5, "y": -2.0 }));
}

// --- Camera defaults ---

#[test]
fn camera_default_is_half_scale_at_origin() {
    let cam = Camera::default();
    assert_eq!(cam.scale, 0.5);
    assert_eq!(cam.translate, Point::new(0.0, 0.0));
}

#[test]
fn camera_with_limits_clamps_initial_scale() {
    let cam = Camera::with_limits(1.0, 2.0);
    assert_eq!(cam.scale, 1.0);
}

// --- screen_to_world / world_to_screen ---

#[test]
fn screen_to_world_with_pan_and_zoom() {
    let cam = cam(2.0, 20.0, 10.0);
    let world = cam.screen_to_world(Point::new(20.0, 10.0));
    assert!(point_approx_eq(world, Point::new(0.0, 0.0)));
}

#[test]
fn screen_to_world_origin() {
    let cam = cam(2.0, 50.0, 30.0);
    let world = cam.screen_to_world(Point::new(0.0, 0.0));
    assert!(approx_eq(world.x, -25.0));
    assert!(approx_eq(world.y, -15.0));
}

#[test]
fn world_to_screen_inverts_screen_to_world() {
    let cam = cam(1.7, -120.0, 44.0);
    let screen = Point::new(321.0, 55.5);
    let back = cam.world_to_screen(cam.screen_to_world(screen));
    assert!(point_approx_eq(back, screen));
}

#[test]
fn screen_dist_to_world_divides_by_scale() {
    assert!(approx_eq(cam(4.0, 0.0, 0.0).screen_dist_to_world(8.0), 2.0));
}

// --- pan ---

#[test]
fn pan_by_accumulates() {
    let mut cam = Camera::default();
    cam.pan_by(10.0, -5.0);
    cam.pan_by(2.5, 1.0);
    assert!(point_approx_eq(cam.translate, Point::new(12.5, -4.0)));
}

// --- zoom ---

#[test]
fn zoom_keeps_world_point_under_anchor() {
    let mut cam = cam(0.5, 37.0, -12.0);
    let anchor = Point::new(400.0, 300.0);
    let before = cam.screen_to_world(anchor);
    assert!(cam.zoom_at(anchor, 1.1));
    let after = cam.world_to_screen(before);
    assert!(point_approx_eq(after, anchor));
}

#[test]
fn zoom_anchor_holds_across_many_steps() {
    let mut cam = Camera::default();
    let anchor = Point::new(123.0, 456.0);
    let world = cam.screen_to_world(anchor);
    for _ in 0..7 {
        cam.zoom_at(anchor, 1.1);
    }
    for _ in 0..3 {
        cam.zoom_at(anchor, 1.0 / 1.1);
    }
    assert!(point_approx_eq(cam.world_to_screen(world), anchor));
}

#[test]
fn zoom_clamps_to_max() {
    let mut cam = Camera::default();
    for _ in 0..100 {
        cam.zoom_at(Point::new(0.0, 0.0), 1.1);
    }
    assert!(approx_eq(cam.scale, 3.0));
    assert!(!cam.zoom_at(Point::new(0.0, 0.0), 1.1));
}

#[test]
fn zoom_clamps_to_min() {
    let mut cam = Camera::default();
    for _ in 0..100 {
        cam.zoom_at(Point::new(10.0, 10.0), 1.0 / 1.1);
    }
    assert!(approx_eq(cam.scale, 0.225));
}

#[test]
fn transform_mirrors_camera() {
    let t = cam(1.25, 3.0, 4.0).transform();
    assert_eq!(t, Transform { scale: 1.25, tx: 3.0, ty: 4.0 });
}
