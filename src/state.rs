//! Per-editor map state.
//!
//! DESIGN
//! ======
//! `MapState` is the single mutable context shared by the gesture router and
//! the renderer: camera, pointer tracking, the cell lookup and the mark
//! registry. Each mounted editor owns exactly one; nothing here is global, so
//! two editors never observe each other's pointers or marks.

use std::collections::HashMap;

use crate::camera::{Camera, Point};
use crate::grid::{CellKey, Grid, MapConfig};
use crate::input::PointerId;
use crate::marks::MarkRegistry;

// =============================================================================
// MAP STATE
// =============================================================================

#[derive(Debug, Clone)]
pub struct MapState {
    pub camera: Camera,
    /// Pointers currently down, by host id, at their last surface position.
    pub pointers: HashMap<PointerId, Point>,
    /// Set once a pan moves past the drag threshold; cleared when the last
    /// pointer lifts.
    pub dragging: bool,
    /// Surface position of the pointer-down that started the current pan.
    pub start_pointer: Point,
    /// Surface position of the previous pan event.
    pub last_pointer: Point,
    pub grid: Grid,
    pub marks: MarkRegistry,
    /// Canonical key under the hover label, if shown.
    pub last_hovered: Option<CellKey>,
}

impl MapState {
    #[must_use]
    pub fn new(config: MapConfig) -> Self {
        Self {
            camera: Camera::with_limits(config.min_scale, config.max_scale),
            pointers: HashMap::new(),
            dragging: false,
            start_pointer: Point::default(),
            last_pointer: Point::default(),
            grid: Grid::build(config),
            marks: MarkRegistry::new(),
            last_hovered: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MapConfig {
        self.grid.config()
    }

    #[must_use]
    pub fn any_pointer_down(&self) -> bool {
        !self.pointers.is_empty()
    }
}
