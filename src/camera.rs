#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_SCALE, MAX_SCALE, MIN_SCALE};
use crate::scene::Transform;

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Camera state for pan/zoom over the hex map.
///
/// `translate` is in surface pixels, `scale` is the zoom factor. A world point
/// `w` lands on screen at `w * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub scale: f64,
    pub translate: Point,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { scale: DEFAULT_SCALE, translate: Point::default(), min_scale: MIN_SCALE, max_scale: MAX_SCALE }
    }
}

impl Camera {
    /// A camera at the default zoom with the given scale limits.
    #[must_use]
    pub fn with_limits(min_scale: f64, max_scale: f64) -> Self {
        Self { scale: DEFAULT_SCALE.clamp(min_scale, max_scale), min_scale, max_scale, ..Self::default() }
    }

    /// Convert a screen-space point (surface pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point { x: (screen.x - self.translate.x) / self.scale, y: (screen.y - self.translate.y) / self.scale }
    }

    /// Convert a world-space point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point { x: world.x * self.scale + self.translate.x, y: world.y * self.scale + self.translate.y }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.scale
    }

    /// Move the view by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.translate.x += dx;
        self.translate.y += dy;
    }

    /// Multiply the zoom by `factor`, clamped to the scale limits, keeping the
    /// world point under `anchor` on the same screen pixel.
    ///
    /// Returns `false` when the clamped scale did not change.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> bool {
        let target = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        if (target - self.scale).abs() < f64::EPSILON {
            return false;
        }
        let world = self.screen_to_world(anchor);
        self.scale = target;
        self.translate.x = anchor.x - world.x * self.scale;
        self.translate.y = anchor.y - world.y * self.scale;
        true
    }

    /// The affine transform applied to every world-space layer.
    #[must_use]
    pub fn transform(&self) -> Transform {
        Transform { scale: self.scale, tx: self.translate.x, ty: self.translate.y }
    }
}
