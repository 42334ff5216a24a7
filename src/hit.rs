//! Hit-testing against scene items and marks.
//!
//! Stands in for the browser's element-from-point lookup. Only painted
//! geometry is hit: unfilled rectangles and polygons are hit on their stroke,
//! filled ones on their interior. Images are transparent to hits so building
//! icons never block the cell underneath.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Point;
use crate::grid::{CellKey, Grid};
use crate::marks::MarkRegistry;
use crate::scene::{LayerId, Node, Scene, Shape, Tag};

/// Rough advance of one monospace glyph, as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.6;

/// Id of the topmost committed annotation under `world`, within `slop` world
/// units of its painted geometry.
#[must_use]
pub fn annotation_at(scene: &Scene, world: Point, slop: f64) -> Option<u64> {
    scene.items(LayerId::Annotation).iter().rev().find_map(|item| match item.tag {
        Tag::Annotation(id) if item.visible && item.nodes.iter().any(|n| node_hit(n, world, slop)) => Some(id),
        _ => None,
    })
}

/// The mark whose cell center is closest to `world`, if strictly closer than
/// `max_dist`.
#[must_use]
pub fn nearest_mark(marks: &MarkRegistry, grid: &Grid, world: Point, max_dist: f64) -> Option<CellKey> {
    let mut best: Option<(CellKey, f64)> = None;
    for mark in marks.iter() {
        let Some(cell) = grid.get(mark.key()) else {
            continue;
        };
        let dist = world.distance_to(cell.center);
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((mark.key(), dist));
        }
    }
    match best {
        Some((key, dist)) if dist < max_dist => Some(key),
        _ => None,
    }
}

/// Whether `world` hits the painted part of `node`.
#[must_use]
pub fn node_hit(node: &Node, world: Point, slop: f64) -> bool {
    let half_stroke = node.style.stroke_width.unwrap_or(1.0) / 2.0;
    let filled = node.style.fill.as_deref().is_some_and(|f| f != "none");
    let tolerance = half_stroke + slop;
    match &node.shape {
        Shape::Line { from, to } => distance_to_segment(world, *from, *to) <= tolerance,
        Shape::Polygon(points) => {
            if filled && point_in_polygon(world, points) {
                return true;
            }
            edges(points, true).any(|(a, b)| distance_to_segment(world, a, b) <= tolerance)
        }
        Shape::Rect { x, y, width, height } => {
            let corners = [
                Point::new(*x, *y),
                Point::new(x + width, *y),
                Point::new(x + width, y + height),
                Point::new(*x, y + height),
            ];
            if filled && point_in_polygon(world, &corners) {
                return true;
            }
            edges(&corners, true).any(|(a, b)| distance_to_segment(world, a, b) <= tolerance)
        }
        Shape::Text { at, content, text } => {
            #[allow(clippy::cast_precision_loss)]
            let width = content.chars().count() as f64 * text.font_size * GLYPH_ADVANCE;
            let top = if text.baseline == "hanging" { at.y } else { at.y - text.font_size };
            world.x >= at.x - width / 2.0 - slop
                && world.x <= at.x + width / 2.0 + slop
                && world.y >= top - slop
                && world.y <= top + text.font_size + slop
        }
        Shape::Path(d) => {
            let points = parse_path(d);
            match points.as_slice() {
                [] => false,
                [only] => world.distance_to(*only) <= tolerance,
                _ => edges(&points, false).any(|(a, b)| distance_to_segment(world, a, b) <= tolerance),
            }
        }
        Shape::Image { .. } => false,
    }
}

/// Consecutive point pairs, optionally closing back to the first point.
fn edges(points: &[Point], closed: bool) -> impl Iterator<Item = (Point, Point)> + '_ {
    let open = points.windows(2).map(|w| (w[0], w[1]));
    let closing = match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 2 => Some((*last, *first)),
        _ => None,
    };
    open.chain(closing)
}

/// Distance from `p` to the segment `a`-`b`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq < 1e-12 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    p.distance_to(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Even-odd ray cast.
#[must_use]
pub fn point_in_polygon(p: Point, points: &[Point]) -> bool {
    let mut inside = false;
    let n = points.len();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + n - 1) % n];
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
    }
    inside
}

/// Vertices of an `M x y L x y ...` path. Unknown tokens are skipped.
#[must_use]
pub fn parse_path(d: &str) -> Vec<Point> {
    let mut points = Vec::new();
    let mut numbers = Vec::with_capacity(2);
    for token in d.split_whitespace() {
        if token == "M" || token == "L" {
            numbers.clear();
            continue;
        }
        let Ok(value) = token.parse::<f64>() else {
            numbers.clear();
            continue;
        };
        numbers.push(value);
        if numbers.len() == 2 {
            points.push(Point::new(numbers[0], numbers[1]));
            numbers.clear();
        }
    }
    points
}
