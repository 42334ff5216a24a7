//! High-resolution PNG export of the map.
//!
//! DESIGN
//! ======
//! Export works on a copy of the live scene with every layer transform
//! stripped, so the output is independent of the current pan/zoom. Hover
//! layers and any in-progress preview are dropped. Icons are fetched
//! concurrently and inlined as `data:` URIs; an icon that fails to load is
//! left out of the picture rather than failing the export.
//!
//! Rasterization is CPU-bound and runs on the blocking pool. The pipeline is
//! shared by reference across tasks, so the single-export-at-a-time rule is
//! an atomic flag held by an RAII guard: it is cleared on every exit path,
//! including errors.

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::annotation::now_ms;
use crate::consts::{
    WATERMARK_ANGLE_DEG, WATERMARK_FONT_SIZE, WATERMARK_OPACITY, WATERMARK_START_X, WATERMARK_STEP_X, WATERMARK_STEP_Y,
    WATERMARK_TEXT,
};
use crate::grid::MapConfig;
use crate::icons::{self, IconSource};
use crate::scene::{LayerId, Scene, Shape, SvgFrame, Tag, escape_xml};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Another export holds the pipeline.
    #[error("an export is already in progress")]
    Busy,

    /// The prepared SVG could not be parsed.
    #[error("svg parse failed: {0}")]
    Svg(#[from] usvg::Error),

    /// The pixel buffer could not be allocated.
    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    /// PNG encoding failed.
    #[error("png encode failed: {0}")]
    Encode(String),

    /// The blocking rasterize task panicked or was cancelled.
    #[error("rasterize task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Pixel multiplier over the logical canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    X1,
    #[default]
    X2,
    X4,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::X1, Quality::X2, Quality::X4];

    #[must_use]
    pub fn factor(self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }

    /// Accepts `1`, `2`, `4`, optionally suffixed with `x`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().trim_end_matches(['x', 'X']) {
            "1" => Some(Self::X1),
            "2" => Some(Self::X2),
            "4" => Some(Self::X4),
            _ => None,
        }
    }
}

/// Color scheme of the exported image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    #[must_use]
    pub fn background(self) -> tiny_skia::Color {
        match self {
            Self::Light => tiny_skia::Color::from_rgba8(0xff, 0xff, 0xff, 0xff),
            Self::Dark => tiny_skia::Color::from_rgba8(0x18, 0x18, 0x1b, 0xff),
        }
    }

    fn cell_fill(self) -> &'static str {
        match self {
            Self::Light => "#ffffff",
            Self::Dark => "rgba(24, 24, 27, 0.5)",
        }
    }

    fn cell_stroke(self) -> &'static str {
        match self {
            Self::Light => "#52525b",
            Self::Dark => "#71717a",
        }
    }

    fn watermark_fill(self) -> &'static str {
        match self {
            Self::Light => "#000000",
            Self::Dark => "#ffffff",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub quality: Quality,
    pub theme: Theme,
    /// Tiled watermark text. Empty disables the watermark.
    pub watermark: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { quality: Quality::default(), theme: Theme::default(), watermark: WATERMARK_TEXT.to_owned() }
    }
}

/// Canvas size in world units, before the quality multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalSize {
    pub width: u32,
    pub height: u32,
}

impl LogicalSize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn for_map(map: &MapConfig) -> Self {
        let (w, h) = map.extent();
        Self { width: w.ceil().max(0.0) as u32, height: h.ceil().max(0.0) as u32 }
    }

    #[must_use]
    pub fn scaled(self, quality: Quality) -> (u32, u32) {
        (self.width.saturating_mul(quality.factor()), self.height.saturating_mul(quality.factor()))
    }
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

// =============================================================================
// PIPELINE
// =============================================================================

pub struct ExportPipeline {
    icons: Arc<dyn IconSource>,
    fonts: Arc<usvg::fontdb::Database>,
    in_progress: AtomicBool,
}

impl ExportPipeline {
    /// Pipeline using the system fonts for label and watermark text.
    #[must_use]
    pub fn new(icons: Arc<dyn IconSource>) -> Self {
        let mut fonts = usvg::fontdb::Database::new();
        fonts.load_system_fonts();
        tracing::debug!(faces = fonts.len(), "font database loaded");
        Self::with_fonts(icons, Arc::new(fonts))
    }

    #[must_use]
    pub fn with_fonts(icons: Arc<dyn IconSource>, fonts: Arc<usvg::fontdb::Database>) -> Self {
        Self { icons, fonts, in_progress: AtomicBool::new(false) }
    }

    /// Whether an export is currently running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Render `scene` to PNG.
    ///
    /// # Errors
    ///
    /// [`ExportError::Busy`] when another export is running; otherwise any
    /// rasterization failure. Icon failures are not errors.
    pub async fn export(
        &self,
        scene: &Scene,
        map: &MapConfig,
        options: &ExportOptions,
    ) -> Result<ExportArtifact, ExportError> {
        let _guard = BusyGuard::acquire(&self.in_progress)?;
        let started = std::time::Instant::now();

        let svg = self.render_svg(scene, map, options.theme).await;
        let logical = LogicalSize::for_map(map);
        let fonts = Arc::clone(&self.fonts);
        let raster_options = options.clone();
        let joined = tokio::task::spawn_blocking(move || rasterize(&svg, fonts, logical, &raster_options)).await;
        let result = match joined {
            Ok(result) => result,
            Err(e) => Err(ExportError::from(e)),
        };
        let (width, height, png) = match result {
            Ok(raster) => raster,
            Err(e) => {
                tracing::error!(error = %e, quality = options.quality.factor(), "export failed");
                return Err(e);
            }
        };

        let file_name = file_name(options.quality, now_ms());
        tracing::info!(
            file = %file_name,
            width,
            height,
            bytes = png.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "map exported"
        );
        Ok(ExportArtifact { file_name, width, height, png })
    }

    /// The export-ready SVG: untransformed, hover layers removed, icons
    /// inlined, themed stylesheet.
    pub async fn render_svg(&self, scene: &Scene, map: &MapConfig, theme: Theme) -> String {
        let mut prepared = prepare_scene(scene);
        let hrefs = icon_hrefs(&prepared);
        let embedded = icons::embed_all(self.icons.as_ref(), &hrefs).await;
        inline_icons(&mut prepared, &embedded);

        let logical = LogicalSize::for_map(map);
        let (width, height) = (f64::from(logical.width), f64::from(logical.height));
        prepared.to_svg(&SvgFrame {
            width,
            height,
            view_box: Some([-map.padding, -map.padding, width, height]),
            stylesheet: Some(export_style(theme)),
        })
    }
}

/// Sets the in-progress flag for its lifetime.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ExportError> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(ExportError::Busy);
        }
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// =============================================================================
// SCENE PREPARATION
// =============================================================================

/// Copy of `scene` with transforms stripped and hover/preview content removed.
#[must_use]
pub fn prepare_scene(scene: &Scene) -> Scene {
    let mut prepared = scene.clone();
    for id in [LayerId::Hex, LayerId::Mark, LayerId::Building, LayerId::Annotation] {
        prepared.set_transform(id, None);
    }
    prepared.remove_layer(LayerId::Highlight);
    prepared.remove_layer(LayerId::Label);
    prepared.remove_where(LayerId::Annotation, |item| item.tag == Tag::Temp);
    prepared
}

/// Distinct image hrefs in paint order of first use.
#[must_use]
pub fn icon_hrefs(scene: &Scene) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut hrefs = Vec::new();
    for layer in scene.layers() {
        for node in layer.items.iter().flat_map(|item| &item.nodes) {
            if let Shape::Image { href, .. } = &node.shape {
                if seen.insert(href.as_str()) {
                    hrefs.push(href.clone());
                }
            }
        }
    }
    hrefs
}

/// Swap hrefs for data URIs; drop images whose icon did not load.
pub fn inline_icons(scene: &mut Scene, embedded: &HashMap<String, String>) {
    let mut dropped = 0_usize;
    for id in LayerId::ALL {
        let Some(layer) = scene.layer_mut(id) else {
            continue;
        };
        for item in &mut layer.items {
            item.nodes.retain_mut(|node| {
                let Shape::Image { href, .. } = &mut node.shape else {
                    return true;
                };
                match embedded.get(href.as_str()) {
                    Some(uri) => {
                        uri.clone_into(href);
                        true
                    }
                    None => {
                        dropped += 1;
                        false
                    }
                }
            });
        }
        layer.items.retain(|item| !item.nodes.is_empty());
    }
    if dropped > 0 {
        tracing::warn!(dropped, "images without icons left out of export");
    }
}

/// Stylesheet overriding cell, mark and icon looks for `theme`.
#[must_use]
pub fn export_style(theme: Theme) -> String {
    format!(
        ".hex-polygon {{ fill: {}; stroke: {}; stroke-width: 2.5; }}\n.hex-mark {{ opacity: 0.5; }}\n.hex-icon {{ opacity: 1; }}\n",
        theme.cell_fill(),
        theme.cell_stroke()
    )
}

/// `stronghold-map-<q>x-<timestamp>.png`
#[must_use]
pub fn file_name(quality: Quality, timestamp_ms: u64) -> String {
    format!("stronghold-map-{}x-{timestamp_ms}.png", quality.factor())
}

// =============================================================================
// RASTERIZE
// =============================================================================

/// Diagonal tiled watermark over a `size` canvas, in logical units.
#[must_use]
pub fn watermark_svg(size: LogicalSize, text: &str, theme: Theme) -> String {
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    let mut out = format!(r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#);
    let content = escape_xml(text);
    let mut y = 0.0;
    let mut row = 0_u32;
    while y < h {
        let offset = if row % 2 == 1 { WATERMARK_STEP_X / 2.0 } else { 0.0 };
        let mut x = WATERMARK_START_X;
        while x < w {
            out.push_str(&format!(
                r#"<text x="0" y="0" font-size="{WATERMARK_FONT_SIZE}" font-weight="bold" font-family="sans-serif" text-anchor="middle" dominant-baseline="middle" fill="{}" fill-opacity="{WATERMARK_OPACITY}" transform="translate({}, {y}) rotate({WATERMARK_ANGLE_DEG})">{content}</text>"#,
                theme.watermark_fill(),
                x + offset,
            ));
            x += WATERMARK_STEP_X;
        }
        y += WATERMARK_STEP_Y;
        row += 1;
    }
    out.push_str("</svg>");
    out
}

#[allow(clippy::cast_precision_loss)]
fn rasterize(
    svg: &str,
    fonts: Arc<usvg::fontdb::Database>,
    logical: LogicalSize,
    options: &ExportOptions,
) -> Result<(u32, u32, Vec<u8>), ExportError> {
    let (width, height) = logical.scaled(options.quality);
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or(ExportError::Canvas { width, height })?;
    pixmap.fill(options.theme.background());

    let mut opt = usvg::Options::default();
    opt.fontdb = fonts;
    let scale = options.quality.factor() as f32;
    let transform = tiny_skia::Transform::from_scale(scale, scale);

    let tree = usvg::Tree::from_str(svg, &opt)?;
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    if !options.watermark.is_empty() {
        let watermark = usvg::Tree::from_str(&watermark_svg(logical, &options.watermark, options.theme), &opt)?;
        resvg::render(&watermark, transform, &mut pixmap.as_mut());
    }

    let png = pixmap.encode_png().map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok((width, height, png))
}
