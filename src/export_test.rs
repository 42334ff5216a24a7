use std::sync::atomic::AtomicUsize;

use tokio::sync::Semaphore;

use super::*;
use crate::engine::EngineCore;
use crate::grid::CellKey;
use crate::icons::IconError;
use crate::scene::{Item, Node, Style};
use crate::store::MemoryStore;

fn tiny_map() -> MapConfig {
    MapConfig { radius: 10.0, max_even: (10, 10), max_odd: (9, 11), ..MapConfig::default() }
}

fn tiny_core() -> EngineCore {
    EngineCore::new(tiny_map(), "icons", Box::new(MemoryStore::new()))
}

fn png_bytes() -> Vec<u8> {
    tiny_skia::Pixmap::new(2, 2).unwrap().encode_png().unwrap()
}

fn png_dimensions(png: &[u8]) -> (u32, u32) {
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    let width = u32::from_be_bytes(png[16..20].try_into().unwrap());
    let height = u32::from_be_bytes(png[20..24].try_into().unwrap());
    (width, height)
}

fn icon_item(href: &str) -> Item {
    Item::new(
        Tag::None,
        vec![Node::new(
            Shape::Image { href: href.to_owned(), center: crate::camera::Point::new(0.0, 0.0), size: 10.0 },
            Style::class("hex-icon"),
        )],
    )
}

/// Serves a valid PNG for `ok-*` hrefs, fails everything else.
struct StubIcons {
    calls: AtomicUsize,
}

impl StubIcons {
    fn new() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0) })
    }
}

#[async_trait::async_trait]
impl IconSource for StubIcons {
    async fn fetch(&self, href: &str) -> Result<Vec<u8>, IconError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if href.starts_with("ok-") {
            Ok(png_bytes())
        } else {
            Err(IconError::Status { href: href.to_owned(), status: 404 })
        }
    }
}

/// Blocks every fetch until the gate is closed.
struct GatedIcons {
    gate: Semaphore,
}

#[async_trait::async_trait]
impl IconSource for GatedIcons {
    async fn fetch(&self, _href: &str) -> Result<Vec<u8>, IconError> {
        let _released = self.gate.acquire().await;
        Ok(png_bytes())
    }
}

fn pipeline(icons: Arc<dyn IconSource>) -> ExportPipeline {
    ExportPipeline::with_fonts(icons, Arc::new(usvg::fontdb::Database::new()))
}

// =============================================================
// Options
// =============================================================

#[test]
fn quality_parses_factor_with_optional_suffix() {
    assert_eq!(Quality::parse("1"), Some(Quality::X1));
    assert_eq!(Quality::parse("2x"), Some(Quality::X2));
    assert_eq!(Quality::parse(" 4X "), Some(Quality::X4));
    assert_eq!(Quality::parse("3"), None);
    assert_eq!(Quality::default(), Quality::X2);
    assert_eq!(Quality::ALL.map(Quality::factor), [1, 2, 4]);
}

#[test]
fn theme_parses_case_insensitively() {
    assert_eq!(Theme::parse("Dark"), Some(Theme::Dark));
    assert_eq!(Theme::parse("light"), Some(Theme::Light));
    assert_eq!(Theme::parse("sepia"), None);
    assert_eq!(Theme::default(), Theme::Light);
}

#[test]
fn logical_size_rounds_extent_up() {
    let size = LogicalSize::for_map(&tiny_map());
    assert_eq!(size, LogicalSize { width: 210, height: 130 });
    assert_eq!(size.scaled(Quality::X4), (840, 520));
}

#[test]
fn default_map_logical_size() {
    let size = LogicalSize::for_map(&MapConfig::default());
    assert_eq!(size.width, 3840);
    assert_eq!(size.height, 3638);
}

#[test]
fn file_name_carries_quality_and_timestamp() {
    assert_eq!(file_name(Quality::X4, 1_700_000_000_000), "stronghold-map-4x-1700000000000.png");
}

#[test]
fn export_style_follows_theme() {
    let light = export_style(Theme::Light);
    assert!(light.contains("fill: #ffffff; stroke: #52525b; stroke-width: 2.5;"));
    assert!(light.contains(".hex-mark { opacity: 0.5; }"));
    assert!(light.contains(".hex-icon { opacity: 1; }"));
    let dark = export_style(Theme::Dark);
    assert!(dark.contains("fill: rgba(24, 24, 27, 0.5); stroke: #71717a;"));
}

// =============================================================
// Scene preparation
// =============================================================

#[test]
fn prepare_strips_transforms_and_hover_layers() {
    let mut core = tiny_core();
    core.scene.push(LayerId::Annotation, Item::new(Tag::Temp, Vec::new()));
    core.scene.push(LayerId::Annotation, Item::new(Tag::Annotation(1), Vec::new()));

    let prepared = prepare_scene(&core.scene);
    for id in [LayerId::Hex, LayerId::Mark, LayerId::Building, LayerId::Annotation] {
        assert!(prepared.layer(id).unwrap().transform.is_none());
    }
    assert!(prepared.layer(LayerId::Highlight).is_none());
    assert!(prepared.layer(LayerId::Label).is_none());
    let tags: Vec<Tag> = prepared.items(LayerId::Annotation).iter().map(|item| item.tag).collect();
    assert_eq!(tags, vec![Tag::Annotation(1)]);

    // The live scene keeps its camera transform.
    assert!(core.scene.layer(LayerId::Hex).unwrap().transform.is_some());
}

#[test]
fn icon_hrefs_are_distinct_in_first_use_order() {
    let mut scene = Scene::new();
    scene.push(LayerId::Building, icon_item("b.png"));
    scene.push(LayerId::Building, icon_item("a.png"));
    scene.push(LayerId::Building, icon_item("b.png"));
    assert_eq!(icon_hrefs(&scene), vec!["b.png".to_owned(), "a.png".to_owned()]);
}

#[test]
fn inline_icons_drops_images_without_data() {
    let mut scene = Scene::new();
    scene.push(LayerId::Building, icon_item("ok.png"));
    scene.push(LayerId::Building, icon_item("gone.png"));
    let embedded = HashMap::from([("ok.png".to_owned(), "data:image/png;base64,AQID".to_owned())]);

    inline_icons(&mut scene, &embedded);

    let items = scene.items(LayerId::Building);
    assert_eq!(items.len(), 1);
    assert!(matches!(&items[0].nodes[0].shape, Shape::Image { href, .. } if href == "data:image/png;base64,AQID"));
}

#[test]
fn watermark_tiles_staggered_rows() {
    let svg = watermark_svg(LogicalSize { width: 500, height: 300 }, "noswork", Theme::Dark);
    // Rows at y = 0 and 200; columns at -200, 100, 400, odd rows shifted by 150.
    assert_eq!(svg.matches("<text").count(), 6);
    assert!(svg.contains("translate(-200, 0) rotate(-30)"));
    assert!(svg.contains("translate(400, 0) rotate(-30)"));
    assert!(svg.contains("translate(-50, 200) rotate(-30)"));
    assert!(svg.contains("translate(550, 200) rotate(-30)"));
    assert!(!svg.contains("translate(-300,"));
    assert!(svg.contains(r##"fill="#ffffff" fill-opacity="0.07""##));
}

#[test]
fn watermark_text_is_escaped() {
    let svg = watermark_svg(LogicalSize { width: 10, height: 10 }, "a<b", Theme::Light);
    assert!(svg.contains("a&lt;b"));
}

// =============================================================
// Pipeline
// =============================================================

#[tokio::test]
async fn render_svg_inlines_icons_and_skips_failures() {
    let icons = StubIcons::new();
    let export = pipeline(icons.clone());
    let mut core = tiny_core();
    core.scene.push(LayerId::Building, icon_item("ok-city.png"));
    core.scene.push(LayerId::Building, icon_item("missing.png"));

    let svg = export.render_svg(&core.scene, &tiny_map(), Theme::Light).await;
    assert!(svg.contains("data:image/png;base64,"));
    assert!(!svg.contains("missing.png"));
    assert!(svg.contains(r#"viewBox="-100 -100 210 130""#));
    assert!(icons.calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn export_at_double_quality_produces_scaled_png() {
    let export = pipeline(StubIcons::new());
    let mut core = tiny_core();
    assert!(core.create_mark(CellKey::new(2, 2), "#22c55e"));
    core.scene.push(LayerId::Building, icon_item("missing.png"));

    let artifact = export.export(&core.scene, &tiny_map(), &ExportOptions::default()).await.unwrap();
    assert_eq!((artifact.width, artifact.height), (420, 260));
    assert_eq!(png_dimensions(&artifact.png), (420, 260));
    assert!(artifact.file_name.starts_with("stronghold-map-2x-"));
    assert!(artifact.file_name.ends_with(".png"));
    assert!(!export.is_busy());
}

#[tokio::test]
async fn failed_export_clears_busy_flag() {
    let export = pipeline(StubIcons::new());
    let core = tiny_core();
    let degenerate = MapConfig { radius: 0.0, ..tiny_map() };

    assert!(export.export(&core.scene, &degenerate, &ExportOptions::default()).await.is_err());
    assert!(!export.is_busy());

    let options = ExportOptions { quality: Quality::X1, theme: Theme::Dark, watermark: String::new() };
    let artifact = export.export(&core.scene, &tiny_map(), &options).await.unwrap();
    assert_eq!((artifact.width, artifact.height), (210, 130));
}

#[tokio::test]
async fn concurrent_export_is_rejected_while_busy() {
    let icons = Arc::new(GatedIcons { gate: Semaphore::new(0) });
    let export = Arc::new(pipeline(icons.clone()));
    let mut core = tiny_core();
    core.scene.push(LayerId::Building, icon_item("ok-city.png"));
    let scene = core.scene.clone();

    let first = tokio::spawn({
        let export = Arc::clone(&export);
        async move { export.export(&scene, &tiny_map(), &ExportOptions::default()).await }
    });
    while !export.is_busy() {
        tokio::task::yield_now().await;
    }

    let second = export.export(&core.scene, &tiny_map(), &ExportOptions::default()).await;
    assert!(matches!(second, Err(ExportError::Busy)));

    icons.gate.close();
    let artifact = first.await.unwrap().unwrap();
    assert_eq!(artifact.width, 420);
    assert!(!export.is_busy());
}
