//! Hex grid geometry: cell addressing, bounds, pixel centers and the fixed map
//! content (main-city group and building placements).
//!
//! Cells use a brick-offset layout over flat-topped hexagons. A cell `(x, y)`
//! exists only when `x + y` is even; its center sits at
//! `(x * 1.5r, y * sqrt(3)r / 2)`. Everything here is pure except [`Grid`],
//! which is built once per editor and read-only afterwards.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::consts::{
    EXPORT_EXTENT_MARGIN, EXPORT_PADDING, HEX_RADIUS, MAX_EVEN, MAX_ODD, MAX_SCALE, MIN_SCALE,
};

/// Composite key of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub x: i32,
    pub y: i32,
}

impl CellKey {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Geometry and zoom limits of one map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    /// Hex circumradius in world units.
    pub radius: f64,
    /// Inclusive upper bound for even-`x` cells (lower bound is `(0, 0)`).
    pub max_even: (i32, i32),
    /// Inclusive upper bound for odd-`x` cells (lower bound is `(1, 1)`).
    pub max_odd: (i32, i32),
    pub min_scale: f64,
    pub max_scale: f64,
    /// Export view box offset in world units.
    pub padding: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            radius: HEX_RADIUS,
            max_even: MAX_EVEN,
            max_odd: MAX_ODD,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            padding: EXPORT_PADDING,
        }
    }
}

impl MapConfig {
    /// Horizontal distance between adjacent columns.
    #[must_use]
    pub fn dx(&self) -> f64 {
        1.5 * self.radius
    }

    /// Vertical distance between two cells of the same column (hex height).
    #[must_use]
    pub fn dy(&self) -> f64 {
        3f64.sqrt() * self.radius
    }

    /// Whether `(x, y)` addresses a cell of this map.
    #[must_use]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        if (x ^ y) & 1 != 0 {
            return false;
        }
        if x & 1 == 0 {
            (0..=self.max_even.0).contains(&x) && (0..=self.max_even.1).contains(&y)
        } else {
            (1..=self.max_odd.0).contains(&x) && (1..=self.max_odd.1).contains(&y)
        }
    }

    /// Pixel center of `(x, y)`. Does not check bounds.
    #[must_use]
    pub fn compute_center(&self, x: i32, y: i32) -> Point {
        Point { x: f64::from(x) * self.dx(), y: f64::from(y) * (self.dy() / 2.0) }
    }

    /// Vertices of a hexagon centered on the origin, clockwise from the right.
    #[must_use]
    pub fn hex_points(&self) -> [Point; 6] {
        let r = self.radius;
        let half_r = r / 2.0;
        let half_h = self.dy() / 2.0;
        [
            Point::new(r, 0.0),
            Point::new(half_r, half_h),
            Point::new(-half_r, half_h),
            Point::new(-r, 0.0),
            Point::new(-half_r, -half_h),
            Point::new(half_r, -half_h),
        ]
    }

    /// Whether a point given relative to a cell center lies inside that hexagon.
    #[must_use]
    pub fn hex_contains(&self, offset: Point) -> bool {
        let dx = offset.x.abs();
        let dy = offset.y.abs();
        let half_h = self.dy() / 2.0;
        dy <= half_h && 3f64.sqrt() * dx + dy <= 3f64.sqrt() * self.radius
    }

    /// Logical export extent in world units, before padding is subtracted from
    /// the origin.
    #[must_use]
    pub fn extent(&self) -> (f64, f64) {
        let w = (f64::from(self.max_even.0) + EXPORT_EXTENT_MARGIN) * self.dx();
        let h = (f64::from(self.max_odd.1) + EXPORT_EXTENT_MARGIN) * (self.dy() / 2.0);
        (w, h)
    }
}

/// Whether `(x, y)` is a cell of the default map.
#[must_use]
pub fn in_bounds(x: i32, y: i32) -> bool {
    MapConfig::default().in_bounds(x, y)
}

/// Pixel center of `(x, y)` on the default map.
#[must_use]
pub fn compute_center(x: i32, y: i32) -> Point {
    MapConfig::default().compute_center(x, y)
}

// =============================================================
// Main city
// =============================================================

/// Canonical cell of the main-city group; used for its label.
pub const MAIN_CITY_CENTER: CellKey = CellKey::new(30, 50);

/// The seven cells that behave as a single location.
pub const MAIN_CITY_CELLS: [CellKey; 7] = [
    CellKey::new(29, 49),
    CellKey::new(29, 51),
    CellKey::new(30, 48),
    CellKey::new(30, 50),
    CellKey::new(30, 52),
    CellKey::new(31, 49),
    CellKey::new(31, 51),
];

#[must_use]
pub fn is_main_city(key: CellKey) -> bool {
    MAIN_CITY_CELLS.contains(&key)
}

/// Every key a mark or hover on `key` applies to.
#[must_use]
pub fn expand_group(key: CellKey) -> Vec<CellKey> {
    if is_main_city(key) { MAIN_CITY_CELLS.to_vec() } else { vec![key] }
}

/// The key shown in the hover label for `key`.
#[must_use]
pub fn display_key(key: CellKey) -> CellKey {
    if is_main_city(key) { MAIN_CITY_CENTER } else { key }
}

// =============================================================
// Buildings
// =============================================================

/// Kind of fixed building drawn over the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildingKind {
    MainCity,
    Building,
    House,
    Hospital,
    Fortress,
    Organization,
    Block,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 7] = [
        Self::MainCity,
        Self::Building,
        Self::House,
        Self::Hospital,
        Self::Fortress,
        Self::Organization,
        Self::Block,
    ];

    /// Icon file name, relative to the icon base.
    #[must_use]
    pub fn icon_file(self) -> &'static str {
        match self {
            Self::MainCity => "city.png",
            Self::Building => "building.png",
            Self::House => "house.png",
            Self::Hospital => "hospital.png",
            Self::Fortress => "fortress.png",
            Self::Organization => "org.png",
            Self::Block => "block.png",
        }
    }

    /// Icon edge length in world units for a map of circumradius `radius`.
    #[must_use]
    pub fn icon_size(self, radius: f64) -> f64 {
        match self {
            Self::MainCity => radius * 2.25,
            Self::Block => radius * 1.25,
            _ => radius * 1.5,
        }
    }

    /// Fixed placements of this building kind.
    #[must_use]
    pub fn placements(self) -> &'static [(i32, i32)] {
        match self {
            Self::MainCity => &[(30, 50)],
            Self::Building => &[(26, 60), (34, 60), (37, 45), (30, 36), (23, 45)],
            Self::House => &[
                (18, 74), (12, 56), (12, 44), (12, 32), (18, 26),
                (24, 20), (36, 20), (42, 26), (48, 32), (48, 44),
                (48, 56), (42, 74), (36, 80), (30, 86), (24, 80),
            ],
            Self::Hospital => &[
                (23, 79), (12, 58), (18, 38), (23, 21), (41, 25),
                (42, 38), (43, 73), (30, 74), (35, 61), (28, 48), (30, 34),
            ],
            Self::Fortress => &[(41, 39), (19, 39), (30, 72)],
            Self::Organization => &[
                (33, 99), (13, 85), (7, 67), (4, 58), (7, 21),
                (14, 14), (21, 7), (27, 7), (39, 7), (46, 14),
                (53, 21), (56, 44), (53, 67), (50, 76), (47, 85), (40, 92),
            ],
            Self::Block => &[
                (31, 71), (32, 70), (33, 69), (34, 68), (35, 67), (36, 66), (37, 65), (38, 64),
                (39, 63), (40, 62), (41, 61), (41, 59), (41, 57), (41, 55), (41, 53), (41, 51),
                (41, 49), (41, 47), (41, 45), (41, 43), (41, 41), (40, 38), (39, 37), (38, 36),
                (37, 35), (36, 34), (35, 33), (34, 32), (33, 31), (32, 30), (31, 29), (30, 28),
                (20, 38), (21, 37), (22, 36), (23, 35), (24, 34), (25, 33), (26, 32), (27, 31),
                (28, 30), (29, 29), (19, 41), (19, 43), (19, 45), (19, 47), (19, 49), (19, 51),
                (19, 53), (19, 55), (19, 57), (19, 59), (19, 61), (20, 62), (21, 63), (22, 64),
                (23, 65), (24, 66), (25, 67), (26, 68), (27, 69), (28, 70), (29, 71),
            ],
        }
    }
}

// =============================================================
// Grid
// =============================================================

/// One generated cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub key: CellKey,
    pub center: Point,
}

/// Immutable lookup of every cell on the map, built once.
#[derive(Debug, Clone)]
pub struct Grid {
    config: MapConfig,
    cells: HashMap<CellKey, Cell>,
    order: Vec<CellKey>,
}

impl Grid {
    /// Enumerate every valid cell row by row. Even rows start at `x = 0`, odd
    /// rows at `x = 1`, stepping by two.
    #[must_use]
    pub fn build(config: MapConfig) -> Self {
        let mut cells = HashMap::new();
        let mut order = Vec::new();
        for y in 0..=config.max_odd.1.max(config.max_even.1) {
            let (start_x, max_x) = if y % 2 == 0 { (0, config.max_even.0) } else { (1, config.max_odd.0) };
            for x in (start_x..=max_x).step_by(2) {
                if !config.in_bounds(x, y) {
                    continue;
                }
                let key = CellKey::new(x, y);
                cells.insert(key, Cell { key, center: config.compute_center(x, y) });
                order.push(key);
            }
        }
        Self { config, cells, order }
    }

    #[must_use]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    #[must_use]
    pub fn get(&self, key: CellKey) -> Option<&Cell> {
        self.cells.get(&key)
    }

    #[must_use]
    pub fn contains(&self, key: CellKey) -> bool {
        self.cells.contains_key(&key)
    }

    /// Cells in generation order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.order.iter().filter_map(|key| self.cells.get(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The cell whose hexagon contains `world`, if any.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn cell_at(&self, world: Point) -> Option<CellKey> {
        let col = (world.x / self.config.dx()).round();
        let row = (world.y / (self.config.dy() / 2.0)).round();
        let max_col = f64::from(self.config.max_even.0.max(self.config.max_odd.0));
        let max_row = f64::from(self.config.max_even.1.max(self.config.max_odd.1));
        // Also rejects NaN from a zero radius.
        if !(-1.0..=max_col + 1.0).contains(&col) || !(-2.0..=max_row + 2.0).contains(&row) {
            return None;
        }

        let (col, row) = (col as i64, row as i64);
        for x in col - 1..=col + 1 {
            for y in row - 2..=row + 2 {
                let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
                    continue;
                };
                let key = CellKey::new(x, y);
                let Some(cell) = self.cells.get(&key) else {
                    continue;
                };
                let offset = Point::new(world.x - cell.center.x, world.y - cell.center.y);
                if self.config.hex_contains(offset) {
                    return Some(key);
                }
            }
        }
        None
    }
}
