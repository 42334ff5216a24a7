//! Retained-mode layered scene.
//!
//! The editor keeps one [`Scene`] with six fixed layers, drawn bottom to top:
//! hex cells, marks, hover highlight, building icons, hover label, and
//! annotations. Each layer carries one affine [`Transform`]; the renderer
//! updates those transforms per frame and never rebuilds the static layers.
//! The scene serializes to SVG for export and for the CLI.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use crate::camera::Point;
use crate::grid::CellKey;

/// Uniform scale followed by a translation: `p * scale + (tx, ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform { scale: 1.0, tx: 0.0, ty: 0.0 };

    #[must_use]
    pub fn new(scale: f64, tx: f64, ty: f64) -> Self {
        Self { scale, tx, ty }
    }

    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.tx, p.y * self.scale + self.ty)
    }

    /// SVG `transform` attribute value.
    #[must_use]
    pub fn to_svg(&self) -> String {
        format!("matrix({},0,0,{},{},{})", self.scale, self.scale, self.tx, self.ty)
    }
}

/// The six scene layers, in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerId {
    Hex,
    Mark,
    Highlight,
    Building,
    Label,
    Annotation,
}

impl LayerId {
    pub const ALL: [LayerId; 6] =
        [Self::Hex, Self::Mark, Self::Highlight, Self::Building, Self::Label, Self::Annotation];

    /// Element id used when the layer is written as an SVG group.
    #[must_use]
    pub fn dom_id(self) -> &'static str {
        match self {
            Self::Hex => "hex-layer",
            Self::Mark => "mark-layer",
            Self::Highlight => "highlight-layer",
            Self::Building => "building-layer",
            Self::Label => "label-layer",
            Self::Annotation => "annotation-layer",
        }
    }
}

/// What an item belongs to. Hit-testing and incremental updates key off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    None,
    Cell(CellKey),
    Mark(CellKey),
    Annotation(u64),
    /// In-progress drawing preview.
    Temp,
    HoverLabel,
}

/// Font settings for a text node.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub font_family: &'static str,
    pub bold: bool,
    pub anchor: &'static str,
    pub baseline: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Polygon(Vec<Point>),
    Line { from: Point, to: Point },
    Rect { x: f64, y: f64, width: f64, height: f64 },
    Text { at: Point, content: String, text: TextStyle },
    /// SVG path data using only absolute `M` and `L` commands.
    Path(String),
    /// Square image centered on `center`.
    Image { href: String, center: Point, size: f64 },
}

/// Paint attributes. `None` leaves the attribute out so a stylesheet can
/// supply it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub class: Option<&'static str>,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
    pub round_joins: bool,
}

impl Style {
    #[must_use]
    pub fn class(class: &'static str) -> Self {
        Self { class: Some(class), ..Self::default() }
    }

    #[must_use]
    pub fn stroked(color: &str, width: f64) -> Self {
        Self {
            fill: Some("none".to_owned()),
            stroke: Some(color.to_owned()),
            stroke_width: Some(width),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn filled(color: &str) -> Self {
        Self { fill: Some(color.to_owned()), ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub shape: Shape,
    pub style: Style,
}

impl Node {
    #[must_use]
    pub fn new(shape: Shape, style: Style) -> Self {
        Self { shape, style }
    }
}

/// A group of nodes sharing one tag, written as a single SVG `<g>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub tag: Tag,
    pub transform: Option<ItemTransform>,
    pub visible: bool,
    pub nodes: Vec<Node>,
}

impl Item {
    #[must_use]
    pub fn new(tag: Tag, nodes: Vec<Node>) -> Self {
        Self { tag, transform: None, visible: true, nodes }
    }
}

/// Placement of an item inside its layer: translate to `origin`, then scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemTransform {
    pub origin: Point,
    pub scale: f64,
}

impl ItemTransform {
    #[must_use]
    pub fn to_svg(&self) -> String {
        format!("translate({}, {}) scale({})", self.origin.x, self.origin.y, self.scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub transform: Option<Transform>,
    pub items: Vec<Item>,
}

/// Outer `<svg>` attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SvgFrame {
    pub width: f64,
    pub height: f64,
    /// `min_x min_y width height`
    pub view_box: Option<[f64; 4]>,
    pub stylesheet: Option<String>,
}

/// The full layered scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    layers: Vec<Layer>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Six empty, untransformed layers.
    #[must_use]
    pub fn new() -> Self {
        let layers = LayerId::ALL.iter().map(|&id| Layer { id, transform: None, items: Vec::new() }).collect();
        Self { layers }
    }

    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Layers still present, in paint order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Items of `id`, or an empty slice when the layer was removed.
    #[must_use]
    pub fn items(&self, id: LayerId) -> &[Item] {
        match self.layer(id) {
            Some(layer) => &layer.items,
            None => &[],
        }
    }

    pub fn set_transform(&mut self, id: LayerId, transform: Option<Transform>) {
        if let Some(layer) = self.layer_mut(id) {
            layer.transform = transform;
        }
    }

    pub fn push(&mut self, id: LayerId, item: Item) {
        if let Some(layer) = self.layer_mut(id) {
            layer.items.push(item);
        }
    }

    pub fn clear(&mut self, id: LayerId) {
        if let Some(layer) = self.layer_mut(id) {
            layer.items.clear();
        }
    }

    /// Remove every item of `id` matching `pred`. Returns how many were removed.
    pub fn remove_where(&mut self, id: LayerId, pred: impl Fn(&Item) -> bool) -> usize {
        let Some(layer) = self.layer_mut(id) else {
            return 0;
        };
        let before = layer.items.len();
        layer.items.retain(|item| !pred(item));
        before - layer.items.len()
    }

    /// Drop a whole layer. Used by export for the hover layers.
    pub fn remove_layer(&mut self, id: LayerId) {
        self.layers.retain(|l| l.id != id);
    }

    pub fn find(&self, id: LayerId, tag: Tag) -> Option<&Item> {
        self.layer(id)?.items.iter().find(|item| item.tag == tag)
    }

    pub fn find_mut(&mut self, id: LayerId, tag: Tag) -> Option<&mut Item> {
        self.layer_mut(id)?.items.iter_mut().find(|item| item.tag == tag)
    }

    /// Serialize to a standalone SVG document.
    #[must_use]
    pub fn to_svg(&self, frame: &SvgFrame) -> String {
        let mut out = String::with_capacity(64 * 1024);
        out.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}""#,
            frame.width, frame.height
        ));
        if let Some([x, y, w, h]) = frame.view_box {
            out.push_str(&format!(r#" viewBox="{x} {y} {w} {h}""#));
        }
        out.push('>');
        if let Some(css) = &frame.stylesheet {
            out.push_str("<style>");
            out.push_str(&escape_xml(css));
            out.push_str("</style>");
        }
        for layer in &self.layers {
            write_layer(&mut out, layer);
        }
        out.push_str("</svg>");
        out
    }
}

fn write_layer(out: &mut String, layer: &Layer) {
    out.push_str(&format!(r#"<g id="{}""#, layer.id.dom_id()));
    if let Some(t) = layer.transform {
        out.push_str(&format!(r#" transform="{}""#, t.to_svg()));
    }
    out.push('>');
    for item in &layer.items {
        write_item(out, item);
    }
    out.push_str("</g>");
}

fn write_item(out: &mut String, item: &Item) {
    out.push_str("<g");
    match item.tag {
        Tag::None => {}
        Tag::Cell(key) => out.push_str(&format!(r#" class="hex-group" data-x="{}" data-y="{}""#, key.x, key.y)),
        Tag::Mark(key) => out.push_str(&format!(r#" data-mark="{key}""#)),
        Tag::Annotation(id) => out.push_str(&format!(r#" data-annotation-id="{id}""#)),
        Tag::Temp => out.push_str(r#" data-temp="true""#),
        Tag::HoverLabel => out.push_str(r#" id="hover-label""#),
    }
    if let Some(t) = item.transform {
        out.push_str(&format!(r#" transform="{}""#, t.to_svg()));
    }
    if !item.visible {
        out.push_str(r#" display="none""#);
    }
    out.push('>');
    for node in &item.nodes {
        write_node(out, node);
    }
    out.push_str("</g>");
}

fn write_style(out: &mut String, style: &Style) {
    if let Some(class) = style.class {
        out.push_str(&format!(r#" class="{class}""#));
    }
    if let Some(fill) = &style.fill {
        out.push_str(&format!(r#" fill="{}""#, escape_xml(fill)));
    }
    if let Some(stroke) = &style.stroke {
        out.push_str(&format!(r#" stroke="{}""#, escape_xml(stroke)));
    }
    if let Some(width) = style.stroke_width {
        out.push_str(&format!(r#" stroke-width="{width}""#));
    }
    if style.round_joins {
        out.push_str(r#" stroke-linecap="round" stroke-linejoin="round""#);
    }
}

fn write_node(out: &mut String, node: &Node) {
    match &node.shape {
        Shape::Polygon(points) => {
            out.push_str(&format!(r#"<polygon points="{}""#, points_attr(points)));
            write_style(out, &node.style);
            out.push_str("/>");
        }
        Shape::Line { from, to } => {
            out.push_str(&format!(r#"<line x1="{}" y1="{}" x2="{}" y2="{}""#, from.x, from.y, to.x, to.y));
            write_style(out, &node.style);
            out.push_str("/>");
        }
        Shape::Rect { x, y, width, height } => {
            out.push_str(&format!(r#"<rect x="{x}" y="{y}" width="{width}" height="{height}""#));
            write_style(out, &node.style);
            out.push_str("/>");
        }
        Shape::Text { at, content, text } => {
            out.push_str(&format!(
                r#"<text x="{}" y="{}" font-size="{}" font-family="{}" text-anchor="{}" dominant-baseline="{}""#,
                at.x, at.y, text.font_size, text.font_family, text.anchor, text.baseline
            ));
            if text.bold {
                out.push_str(r#" font-weight="bold""#);
            }
            write_style(out, &node.style);
            out.push('>');
            out.push_str(&escape_xml(content));
            out.push_str("</text>");
        }
        Shape::Path(d) => {
            out.push_str(&format!(r#"<path d="{}""#, escape_xml(d)));
            write_style(out, &node.style);
            out.push_str("/>");
        }
        Shape::Image { href, center, size } => {
            out.push_str(&format!(
                r#"<image href="{}" x="{}" y="{}" width="{size}" height="{size}""#,
                escape_xml(href),
                center.x - size / 2.0,
                center.y - size / 2.0
            ));
            write_style(out, &node.style);
            out.push_str("/>");
        }
    }
}

/// `x,y x,y ...` as used by the `points` attribute.
#[must_use]
pub fn points_attr(points: &[Point]) -> String {
    points.iter().map(|p| format!("{},{}", p.x, p.y)).collect::<Vec<_>>().join(" ")
}

/// Escape the five XML special characters.
#[must_use]
pub fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
