//! Rendering: builds and updates the retained scene.
//!
//! The grid, building icons and hover label are built once per editor by
//! [`build_static`]. Camera changes never touch those nodes; they only
//! request a frame, and [`apply_transform`] rewrites one matrix per layer when
//! the frame fires. The annotation layer is the only layer redrawn from
//! scratch, whenever the annotation list changes.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use crate::annotation::{Annotation, AnnotationDoc};
use crate::camera::{Camera, Point};
use crate::consts::{HIGHLIGHT_COLOR, HIGHLIGHT_WIDTH, LABEL_CHAR_WIDTH, LABEL_HEIGHT, LABEL_PADDING};
use crate::grid::{BuildingKind, CellKey, Grid, display_key, expand_group};
use crate::input::Tool;
use crate::scene::{Item, ItemTransform, LayerId, Node, Scene, Shape, Style, Tag, TextStyle};

/// Arrowhead half-angle in radians (30°).
const ARROW_ANGLE: f64 = PI / 6.0;

/// Font size of the hover label in screen pixels.
const LABEL_FONT_SIZE: f64 = 14.0;

/// Base stylesheet for the live editor scene. Export swaps in a themed one.
pub const EDITOR_STYLE: &str = ".hex-polygon { fill: #f4f4f5; stroke: #a1a1aa; stroke-width: 1.5; }\n\
.hex-mark { opacity: 1; }\n\
.hex-icon { opacity: 0.9; }\n\
.map-label-bg { fill: rgba(24, 24, 27, 0.85); }\n\
.map-label-text { fill: #ffffff; }\n";

// =============================================================
// Frame scheduling
// =============================================================

/// Coalesces transform updates to one application per animation frame.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    frame_pending: bool,
    frames_applied: u64,
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the transform dirty. Returns `true` only when no frame was
    /// pending, i.e. when the host must schedule one.
    pub fn request_frame(&mut self) -> bool {
        if self.frame_pending {
            return false;
        }
        self.frame_pending = true;
        true
    }

    /// Consume the pending frame. Returns `false` when nothing was requested.
    pub fn take_frame(&mut self) -> bool {
        if !self.frame_pending {
            return false;
        }
        self.frame_pending = false;
        self.frames_applied += 1;
        true
    }

    #[must_use]
    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// How many transform applications have run.
    #[must_use]
    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }
}

// =============================================================
// Static layers
// =============================================================

/// Populate the hex, building and label layers. Call once per scene.
pub fn build_static(scene: &mut Scene, grid: &Grid, icon_base: &str) {
    let config = grid.config();
    let hex = config.hex_points();
    for cell in grid.cells() {
        let points = hex.iter().map(|p| Point::new(cell.center.x + p.x, cell.center.y + p.y)).collect();
        scene.push(
            LayerId::Hex,
            Item::new(Tag::Cell(cell.key), vec![Node::new(Shape::Polygon(points), Style::class("hex-polygon"))]),
        );
    }

    let mut icon_count = 0_usize;
    for kind in BuildingKind::ALL {
        let href = icon_href(icon_base, kind.icon_file());
        let size = kind.icon_size(config.radius);
        for &(x, y) in kind.placements() {
            let Some(cell) = grid.get(CellKey::new(x, y)) else {
                continue;
            };
            scene.push(
                LayerId::Building,
                Item::new(
                    Tag::None,
                    vec![Node::new(
                        Shape::Image { href: href.clone(), center: cell.center, size },
                        Style::class("hex-icon"),
                    )],
                ),
            );
            icon_count += 1;
        }
    }

    let mut label = Item::new(Tag::HoverLabel, vec![label_background(0.0), label_text(String::new())]);
    label.visible = false;
    scene.push(LayerId::Label, label);

    tracing::debug!(cells = grid.len(), icons = icon_count, "static scene built");
}

/// Join an icon base (directory or URL prefix) and file name.
#[must_use]
pub fn icon_href(base: &str, file: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() { file.to_owned() } else { format!("{base}/{file}") }
}

fn label_background(width: f64) -> Node {
    Node::new(
        Shape::Rect { x: -width / 2.0, y: -LABEL_HEIGHT / 2.0, width, height: LABEL_HEIGHT },
        Style::class("map-label-bg"),
    )
}

fn label_text(content: String) -> Node {
    let text =
        TextStyle { font_size: LABEL_FONT_SIZE, font_family: "monospace", bold: true, anchor: "middle", baseline: "middle" };
    Node::new(Shape::Text { at: Point::new(0.0, 1.0), content, text }, Style::class("map-label-text"))
}

// =============================================================
// Per-frame transform
// =============================================================

/// Set the camera matrix on every layer and re-place the hover label so it
/// keeps a constant on-screen size.
pub fn apply_transform(scene: &mut Scene, camera: &Camera, grid: &Grid, last_hovered: Option<CellKey>) {
    let transform = camera.transform();
    for id in LayerId::ALL {
        scene.set_transform(id, Some(transform));
    }
    let Some(key) = last_hovered else {
        return;
    };
    let Some(cell) = grid.get(key) else {
        return;
    };
    if camera.scale <= 0.0 {
        return;
    }
    if let Some(label) = scene.find_mut(LayerId::Label, Tag::HoverLabel) {
        label.transform = Some(ItemTransform { origin: cell.center, scale: 1.0 / camera.scale });
    }
}

// =============================================================
// Hover
// =============================================================

/// Outline the hovered cell (or the whole main-city group) and show the
/// label. Returns the canonical key the label displays.
pub fn show_hover(scene: &mut Scene, grid: &Grid, key: CellKey, scale: f64) -> Option<CellKey> {
    scene.clear(LayerId::Highlight);
    let hex = grid.config().hex_points();
    for k in expand_group(key) {
        let Some(cell) = grid.get(k) else {
            continue;
        };
        let points = hex.iter().map(|p| Point::new(cell.center.x + p.x, cell.center.y + p.y)).collect();
        scene.push(
            LayerId::Highlight,
            Item::new(
                Tag::None,
                vec![Node::new(Shape::Polygon(points), Style::stroked(HIGHLIGHT_COLOR, HIGHLIGHT_WIDTH))],
            ),
        );
    }

    let shown = display_key(key);
    let cell = grid.get(shown)?;
    let content = shown.to_string();
    #[allow(clippy::cast_precision_loss)]
    let width = content.chars().count() as f64 * LABEL_CHAR_WIDTH + LABEL_PADDING;
    if let Some(label) = scene.find_mut(LayerId::Label, Tag::HoverLabel) {
        label.nodes = vec![label_background(width), label_text(content)];
        label.visible = true;
        if scale > 0.0 {
            label.transform = Some(ItemTransform { origin: cell.center, scale: 1.0 / scale });
        }
    }
    Some(shown)
}

/// Remove the highlight and hide the label.
pub fn clear_hover(scene: &mut Scene) {
    scene.clear(LayerId::Highlight);
    if let Some(label) = scene.find_mut(LayerId::Label, Tag::HoverLabel) {
        label.visible = false;
    }
}

// =============================================================
// Annotations
// =============================================================

/// Clear the annotation layer and draw every annotation in order.
pub fn redraw_annotations(scene: &mut Scene, doc: &AnnotationDoc) {
    scene.clear(LayerId::Annotation);
    for annotation in doc.items() {
        scene.push(LayerId::Annotation, Item::new(Tag::Annotation(annotation.id()), annotation_nodes(annotation)));
    }
}

/// Nodes drawn for one committed annotation.
#[must_use]
pub fn annotation_nodes(annotation: &Annotation) -> Vec<Node> {
    match annotation {
        Annotation::Arrow(seg) => arrow_nodes(seg.start, seg.end, &seg.color, seg.size),
        Annotation::Rectangle(seg) => vec![box_node(seg.start, seg.end, &seg.color, seg.size)],
        Annotation::Text(note) => {
            let font_size = note.size * 2.0;
            let height = (note.end.y - note.start.y).abs();
            let bottom = note.start.y.max(note.end.y);
            let left = note.start.x.min(note.end.x);
            let at = Point::new(left + (note.end.x - note.start.x).abs() / 2.0, bottom + (height * 0.2).max(font_size * 0.5));
            let text = TextStyle { font_size, font_family: "monospace", bold: true, anchor: "middle", baseline: "hanging" };
            vec![
                box_node(note.start, note.end, &note.color, note.size),
                Node::new(Shape::Text { at, content: note.text.clone(), text }, Style::filled(&note.color)),
            ]
        }
        Annotation::Sketch(sketch) => vec![sketch_node(&sketch.path, &sketch.color, sketch.size)],
    }
}

/// Nodes for the in-progress preview of a drawing tool.
#[must_use]
pub fn preview_nodes(tool: Tool, start: Point, end: Point, color: &str, size: f64) -> Vec<Node> {
    match tool {
        Tool::Arrow => arrow_nodes(start, end, color, size),
        Tool::Rectangle | Tool::Text => vec![box_node(start, end, color, size)],
        Tool::None | Tool::Sketch | Tool::Eraser => Vec::new(),
    }
}

/// Replace the single temporary preview item.
pub fn set_temp(scene: &mut Scene, nodes: Vec<Node>) {
    clear_temp(scene);
    scene.push(LayerId::Annotation, Item::new(Tag::Temp, nodes));
}

pub fn clear_temp(scene: &mut Scene) {
    scene.remove_where(LayerId::Annotation, |item| item.tag == Tag::Temp);
}

/// Head length for an arrow of stroke width `size`.
#[must_use]
pub fn arrow_head_size(size: f64) -> f64 {
    (size * 2.0).max(size * 3.0)
}

fn arrow_nodes(start: Point, end: Point, color: &str, size: f64) -> Vec<Node> {
    let angle = (end.y - start.y).atan2(end.x - start.x);
    let head = arrow_head_size(size);
    let line_end = Point::new(end.x - head * angle.cos(), end.y - head * angle.sin());
    let wing_a = Point::new(end.x - head * (angle - ARROW_ANGLE).cos(), end.y - head * (angle - ARROW_ANGLE).sin());
    let wing_b = Point::new(end.x - head * (angle + ARROW_ANGLE).cos(), end.y - head * (angle + ARROW_ANGLE).sin());
    vec![
        Node::new(
            Shape::Line { from: start, to: line_end },
            Style { stroke: Some(color.to_owned()), stroke_width: Some(size), ..Style::default() },
        ),
        Node::new(Shape::Polygon(vec![end, wing_a, wing_b]), Style::filled(color)),
    ]
}

fn box_node(start: Point, end: Point, color: &str, size: f64) -> Node {
    Node::new(
        Shape::Rect {
            x: start.x.min(end.x),
            y: start.y.min(end.y),
            width: (end.x - start.x).abs(),
            height: (end.y - start.y).abs(),
        },
        Style::stroked(color, size),
    )
}

/// Round-capped stroke for a sketch path.
#[must_use]
pub fn sketch_node(path: &str, color: &str, size: f64) -> Node {
    Node::new(Shape::Path(path.to_owned()), Style { round_joins: true, ..Style::stroked(color, size) })
}
