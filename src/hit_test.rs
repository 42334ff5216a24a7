use super::*;
use crate::annotation::{Annotation, AnnotationDoc, Segment, Sketch, TextNote};
use crate::grid::MapConfig;
use crate::marks::Mark;
use crate::render::redraw_annotations;
use crate::scene::{Item, Style};

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn seg(start: Point, end: Point) -> Segment {
    Segment { id: 0, start, end, color: "#ef4444".into(), size: 8.0 }
}

fn scene_with(annotations: Vec<Annotation>) -> (Scene, Vec<u64>) {
    let mut doc = AnnotationDoc::new();
    let ids = annotations.into_iter().enumerate().map(|(i, a)| doc.add_at(a, 100 + i as u64)).collect();
    let mut scene = Scene::new();
    redraw_annotations(&mut scene, &doc);
    (scene, ids)
}

// =============================================================
// Geometry helpers
// =============================================================

#[test]
fn distance_to_segment_projects_and_clamps() {
    assert!((distance_to_segment(p(5.0, 3.0), p(0.0, 0.0), p(10.0, 0.0)) - 3.0).abs() < 1e-9);
    assert!((distance_to_segment(p(13.0, 4.0), p(0.0, 0.0), p(10.0, 0.0)) - 5.0).abs() < 1e-9);
}

#[test]
fn distance_to_degenerate_segment() {
    assert!((distance_to_segment(p(3.0, 4.0), p(0.0, 0.0), p(0.0, 0.0)) - 5.0).abs() < 1e-9);
}

#[test]
fn point_in_polygon_square() {
    let square = [p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)];
    assert!(point_in_polygon(p(5.0, 5.0), &square));
    assert!(!point_in_polygon(p(15.0, 5.0), &square));
}

#[test]
fn parse_path_reads_move_and_line() {
    assert_eq!(parse_path("M 1 2 L 3.5 -4 L 5 6"), vec![p(1.0, 2.0), p(3.5, -4.0), p(5.0, 6.0)]);
    assert!(parse_path("").is_empty());
}

// =============================================================
// Annotations
// =============================================================

#[test]
fn arrow_hit_on_shaft() {
    let (scene, ids) = scene_with(vec![Annotation::Arrow(seg(p(0.0, 0.0), p(100.0, 0.0)))]);
    assert_eq!(annotation_at(&scene, p(30.0, 3.0), 0.0), Some(ids[0]));
    assert_eq!(annotation_at(&scene, p(30.0, 20.0), 0.0), None);
}

#[test]
fn arrow_hit_inside_head() {
    let (scene, ids) = scene_with(vec![Annotation::Arrow(seg(p(0.0, 0.0), p(100.0, 0.0)))]);
    assert_eq!(annotation_at(&scene, p(95.0, 1.0), 0.0), Some(ids[0]));
}

#[test]
fn rectangle_hit_on_stroke_only() {
    let (scene, ids) = scene_with(vec![Annotation::Rectangle(seg(p(0.0, 0.0), p(100.0, 100.0)))]);
    assert_eq!(annotation_at(&scene, p(100.0, 50.0), 0.0), Some(ids[0]));
    assert_eq!(annotation_at(&scene, p(50.0, 50.0), 0.0), None);
}

#[test]
fn slop_widens_hit() {
    let (scene, ids) = scene_with(vec![Annotation::Rectangle(seg(p(0.0, 0.0), p(100.0, 100.0)))]);
    assert_eq!(annotation_at(&scene, p(108.0, 50.0), 0.0), None);
    assert_eq!(annotation_at(&scene, p(108.0, 50.0), 5.0), Some(ids[0]));
}

#[test]
fn sketch_hit_along_path() {
    let (scene, ids) = scene_with(vec![Annotation::Sketch(Sketch {
        id: 0,
        path: "M 0 0 L 50 50 L 100 0".into(),
        color: "#000".into(),
        size: 8.0,
    })]);
    assert_eq!(annotation_at(&scene, p(75.0, 26.0), 0.0), Some(ids[0]));
    assert_eq!(annotation_at(&scene, p(50.0, 0.0), 0.0), None);
}

#[test]
fn text_hit_on_caption() {
    let note = TextNote::new(p(0.0, 0.0), p(100.0, 20.0), "caption".into(), "#000".into(), 12.0);
    let (scene, ids) = scene_with(vec![Annotation::Text(note)]);
    // Caption top sits at 20 + max(4, 12) = 32, font 24.
    assert_eq!(annotation_at(&scene, p(50.0, 40.0), 0.0), Some(ids[0]));
}

#[test]
fn topmost_annotation_wins() {
    let (scene, ids) = scene_with(vec![
        Annotation::Rectangle(seg(p(0.0, 0.0), p(100.0, 100.0))),
        Annotation::Arrow(seg(p(100.0, 100.0), p(100.0, 0.0))),
    ]);
    assert_eq!(annotation_at(&scene, p(100.0, 60.0), 0.0), Some(ids[1]));
}

#[test]
fn temp_preview_is_not_hit() {
    let mut scene = Scene::new();
    scene.push(
        LayerId::Annotation,
        Item::new(
            Tag::Temp,
            vec![Node::new(Shape::Line { from: p(0.0, 0.0), to: p(10.0, 0.0) }, Style::stroked("#000", 4.0))],
        ),
    );
    assert_eq!(annotation_at(&scene, p(5.0, 0.0), 0.0), None);
}

#[test]
fn images_are_never_hit() {
    let node = Node::new(
        Shape::Image { href: "x.png".into(), center: p(0.0, 0.0), size: 90.0 },
        Style::class("hex-icon"),
    );
    assert!(!node_hit(&node, p(0.0, 0.0), 10.0));
}

// =============================================================
// Marks
// =============================================================

#[test]
fn nearest_mark_within_radius() {
    let grid = Grid::build(MapConfig::default());
    let mut marks = MarkRegistry::new();
    marks.upsert(Mark::new(CellKey::new(2, 2), "#ef4444"));
    marks.upsert(Mark::new(CellKey::new(10, 10), "#ef4444"));
    let c = grid.get(CellKey::new(2, 2)).unwrap().center;
    assert_eq!(nearest_mark(&marks, &grid, p(c.x + 50.0, c.y), 80.0), Some(CellKey::new(2, 2)));
    assert_eq!(nearest_mark(&marks, &grid, p(c.x + 90.0, c.y), 80.0), None);
}

#[test]
fn nearest_mark_empty_registry() {
    let grid = Grid::build(MapConfig::default());
    assert_eq!(nearest_mark(&MarkRegistry::new(), &grid, p(0.0, 0.0), 80.0), None);
}
