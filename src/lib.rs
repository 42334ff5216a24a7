//! Hexagonal stronghold map editor.
//!
//! The crate owns everything behind the map widget: the hex grid and its
//! pixel geometry, persistent cell marks, freeform annotations, pan/zoom
//! input handling, share links, and high-resolution PNG export. A host wires
//! raw pointer, wheel and key events into [`engine::EngineCore`] and carries
//! out the returned [`engine::Action`]s. The bundled binary is such a host
//! for batch work: exporting, and encoding or decoding share links.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Event handlers, [`engine::EngineCore`] and the mountable [`engine::Editor`] |
//! | [`state`] | Owned per-editor state: grid, camera, marks |
//! | [`grid`] | Cell addressing, centers, bounds and the main-city group |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`input`] | Pointer, key and tool types and the gesture state machine |
//! | [`marks`] | Mark registry and mark overlays |
//! | [`annotation`] | Arrows, rectangles, text and sketches with undo |
//! | [`scene`] | Layered retained-mode scene and SVG serialization |
//! | [`render`] | Builds and updates scene layers from editor state |
//! | [`hit`] | Hit-testing annotations and marks |
//! | [`color`] | Hex color parsing and normalization |
//! | [`share`] | Share-token codec and share URLs |
//! | [`store`] | Injected key-value persistence |
//! | [`icons`] | Icon fetching for export |
//! | [`export`] | PNG export pipeline |
//! | [`config`] | Environment configuration |
//! | [`consts`] | Shared numeric constants (grid size, zoom limits, thresholds) |

pub mod annotation;
pub mod camera;
pub mod color;
pub mod config;
pub mod consts;
pub mod engine;
pub mod export;
pub mod grid;
pub mod hit;
pub mod icons;
pub mod input;
pub mod marks;
pub mod render;
pub mod scene;
pub mod share;
pub mod state;
pub mod store;
