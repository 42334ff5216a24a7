#![allow(clippy::float_cmp)]

use super::*;
use crate::annotation::{Segment, Sketch, TextNote};
use crate::grid::MapConfig;
use crate::scene::Transform;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn full_scene() -> (Scene, Grid) {
    let grid = Grid::build(MapConfig::default());
    let mut scene = Scene::new();
    build_static(&mut scene, &grid, "assets/icons/");
    (scene, grid)
}

fn label(scene: &Scene) -> &Item {
    scene.find(LayerId::Label, Tag::HoverLabel).unwrap()
}

// =============================================================
// Renderer
// =============================================================

#[test]
fn request_frame_coalesces() {
    let mut r = Renderer::new();
    assert!(r.request_frame());
    assert!(!r.request_frame());
    assert!(!r.request_frame());
    assert!(r.take_frame());
    assert!(!r.take_frame());
    assert_eq!(r.frames_applied(), 1);
    assert!(r.request_frame());
}

#[test]
fn take_frame_without_request_is_noop() {
    let mut r = Renderer::new();
    assert!(!r.take_frame());
    assert!(!r.frame_pending());
    assert_eq!(r.frames_applied(), 0);
}

// =============================================================
// Static layers
// =============================================================

#[test]
fn build_static_creates_one_polygon_per_cell() {
    let (scene, grid) = full_scene();
    assert_eq!(scene.items(LayerId::Hex).len(), grid.len());
    assert!(matches!(scene.items(LayerId::Hex)[0].tag, Tag::Cell(k) if k == CellKey::new(0, 0)));
}

#[test]
fn build_static_places_every_building() {
    let (scene, _) = full_scene();
    let expected: usize = BuildingKind::ALL.iter().map(|k| k.placements().len()).sum();
    assert_eq!(scene.items(LayerId::Building).len(), expected);
}

#[test]
fn building_icons_reference_files_unembedded() {
    let (scene, grid) = full_scene();
    let Shape::Image { href, center, size } = &scene.items(LayerId::Building)[0].nodes[0].shape else {
        panic!("expected image");
    };
    assert_eq!(href, "assets/icons/city.png");
    assert_eq!(*size, 90.0);
    assert_eq!(*center, grid.get(CellKey::new(30, 50)).unwrap().center);
}

#[test]
fn small_grid_skips_out_of_bounds_buildings() {
    let grid = Grid::build(MapConfig { max_even: (10, 10), max_odd: (9, 11), ..MapConfig::default() });
    let mut scene = Scene::new();
    build_static(&mut scene, &grid, "");
    assert!(scene.items(LayerId::Building).is_empty());
}

#[test]
fn hover_label_starts_hidden() {
    let (scene, _) = full_scene();
    assert!(!label(&scene).visible);
}

#[test]
fn icon_href_joins_base() {
    assert_eq!(icon_href("https://cdn.test/icons/", "org.png"), "https://cdn.test/icons/org.png");
    assert_eq!(icon_href("", "org.png"), "org.png");
}

// =============================================================
// Transform
// =============================================================

#[test]
fn apply_transform_sets_every_layer() {
    let (mut scene, grid) = full_scene();
    let camera = Camera { scale: 2.0, translate: Point::new(5.0, 6.0), ..Camera::default() };
    apply_transform(&mut scene, &camera, &grid, None);
    for layer in scene.layers() {
        assert_eq!(layer.transform, Some(Transform::new(2.0, 5.0, 6.0)));
    }
}

#[test]
fn apply_transform_counter_scales_label() {
    let (mut scene, grid) = full_scene();
    let key = CellKey::new(4, 4);
    show_hover(&mut scene, &grid, key, 0.5);
    let camera = Camera { scale: 2.0, ..Camera::default() };
    apply_transform(&mut scene, &camera, &grid, Some(key));
    let t = label(&scene).transform.unwrap();
    assert_eq!(t.origin, grid.get(key).unwrap().center);
    assert!(approx_eq(t.scale, 0.5));
}

// =============================================================
// Hover
// =============================================================

#[test]
fn hover_plain_cell_outlines_one_hex() {
    let (mut scene, grid) = full_scene();
    let shown = show_hover(&mut scene, &grid, CellKey::new(10, 20), 1.0);
    assert_eq!(shown, Some(CellKey::new(10, 20)));
    assert_eq!(scene.items(LayerId::Highlight).len(), 1);
    let style = &scene.items(LayerId::Highlight)[0].nodes[0].style;
    assert_eq!(style.stroke.as_deref(), Some("#ef4444"));
    assert_eq!(style.stroke_width, Some(3.0));
}

#[test]
fn hover_main_city_outlines_group_and_labels_center() {
    let (mut scene, grid) = full_scene();
    let shown = show_hover(&mut scene, &grid, CellKey::new(29, 51), 1.0);
    assert_eq!(shown, Some(CellKey::new(30, 50)));
    assert_eq!(scene.items(LayerId::Highlight).len(), 7);
    let item = label(&scene);
    assert!(item.visible);
    let Shape::Rect { width, height, x, .. } = item.nodes[0].shape else {
        panic!("expected rect");
    };
    assert_eq!(width, 5.0 * 9.0 + 24.0);
    assert_eq!(height, 26.0);
    assert_eq!(x, -width / 2.0);
    let Shape::Text { content, .. } = &item.nodes[1].shape else {
        panic!("expected text");
    };
    assert_eq!(content, "30,50");
}

#[test]
fn clear_hover_hides_everything() {
    let (mut scene, grid) = full_scene();
    show_hover(&mut scene, &grid, CellKey::new(2, 2), 1.0);
    clear_hover(&mut scene);
    assert!(scene.items(LayerId::Highlight).is_empty());
    assert!(!label(&scene).visible);
}

// =============================================================
// Annotations
// =============================================================

fn seg(start: Point, end: Point, size: f64) -> Segment {
    Segment { id: 0, start, end, color: "#ef4444".into(), size }
}

#[test]
fn arrow_line_stops_short_of_head() {
    let nodes = annotation_nodes(&Annotation::Arrow(seg(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 12.0)));
    assert_eq!(nodes.len(), 2);
    let Shape::Line { to, .. } = nodes[0].shape else {
        panic!("expected line");
    };
    assert!(approx_eq(to.x, 100.0 - 36.0));
    let Shape::Polygon(head) = &nodes[1].shape else {
        panic!("expected polygon");
    };
    assert_eq!(head[0], Point::new(100.0, 0.0));
    assert!(approx_eq(head[1].x, 100.0 - 36.0 * (PI / 6.0).cos()));
    assert!(approx_eq(head[1].y, 36.0 * (PI / 6.0).sin()));
    assert!(approx_eq(head[2].y, -36.0 * (PI / 6.0).sin()));
}

#[test]
fn rectangle_normalizes_corners() {
    let nodes = annotation_nodes(&Annotation::Rectangle(seg(Point::new(50.0, 40.0), Point::new(10.0, 0.0), 8.0)));
    assert_eq!(nodes[0].shape, Shape::Rect { x: 10.0, y: 0.0, width: 40.0, height: 40.0 });
    assert_eq!(nodes[0].style.fill.as_deref(), Some("none"));
}

#[test]
fn text_sits_below_box() {
    let note = TextNote::new(Point::new(0.0, 0.0), Point::new(100.0, 50.0), "hello".into(), "#22c55e".into(), 12.0);
    let nodes = annotation_nodes(&Annotation::Text(note));
    let Shape::Text { at, text, content } = &nodes[1].shape else {
        panic!("expected text");
    };
    assert_eq!(content, "hello");
    assert_eq!(text.font_size, 24.0);
    assert_eq!(text.baseline, "hanging");
    assert_eq!(*at, Point::new(50.0, 50.0 + 12.0));
}

#[test]
fn sketch_is_round_stroked_path() {
    let nodes = annotation_nodes(&Annotation::Sketch(Sketch {
        id: 1,
        path: "M 0 0 L 10 10".into(),
        color: "#000000".into(),
        size: 8.0,
    }));
    assert_eq!(nodes[0].shape, Shape::Path("M 0 0 L 10 10".into()));
    assert!(nodes[0].style.round_joins);
}

#[test]
fn redraw_tags_items_with_ids_in_order() {
    let mut doc = AnnotationDoc::new();
    let a = doc.add_at(Annotation::Arrow(seg(Point::new(0.0, 0.0), Point::new(50.0, 0.0), 8.0)), 10);
    let b = doc.add_at(Annotation::Rectangle(seg(Point::new(0.0, 0.0), Point::new(50.0, 50.0), 8.0)), 20);
    let mut scene = Scene::new();
    set_temp(&mut scene, preview_nodes(Tool::Rectangle, Point::new(0.0, 0.0), Point::new(9.0, 9.0), "#000", 8.0));
    redraw_annotations(&mut scene, &doc);
    let tags: Vec<Tag> = scene.items(LayerId::Annotation).iter().map(|i| i.tag).collect();
    assert_eq!(tags, vec![Tag::Annotation(a), Tag::Annotation(b)]);
}

#[test]
fn set_temp_keeps_single_preview() {
    let mut scene = Scene::new();
    set_temp(&mut scene, preview_nodes(Tool::Arrow, Point::new(0.0, 0.0), Point::new(9.0, 0.0), "#000", 8.0));
    set_temp(&mut scene, preview_nodes(Tool::Text, Point::new(0.0, 0.0), Point::new(9.0, 9.0), "#000", 8.0));
    assert_eq!(scene.items(LayerId::Annotation).len(), 1);
    clear_temp(&mut scene);
    assert!(scene.items(LayerId::Annotation).is_empty());
}
