//! Marked-cell registry and mark overlay construction.
//!
//! A mark colors exactly one cell; re-marking a cell replaces its color. The
//! registry keeps insertion order so the persisted list and the overlay paint
//! order stay stable across recolors.

#[cfg(test)]
#[path = "marks_test.rs"]
mod marks_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::color::hex_to_rgba;
use crate::consts::{MARK_FILL_ALPHA, MARK_STROKE_ALPHA};
use crate::grid::{CellKey, MapConfig};
use crate::scene::{Item, Node, Shape, Style, Tag};

/// Persisted and shared form of a mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub x: i32,
    pub y: i32,
    pub color: String,
}

impl Mark {
    #[must_use]
    pub fn new(key: CellKey, color: impl Into<String>) -> Self {
        Self { x: key.x, y: key.y, color: color.into() }
    }

    #[must_use]
    pub fn key(&self) -> CellKey {
        CellKey::new(self.x, self.y)
    }
}

/// Outcome of [`MarkRegistry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Recolored,
}

/// At most one mark per cell, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MarkRegistry {
    order: Vec<CellKey>,
    marks: HashMap<CellKey, Mark>,
}

impl MarkRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `mark`, or replace the color of the mark already on its cell.
    pub fn upsert(&mut self, mark: Mark) -> Upsert {
        let key = mark.key();
        match self.marks.insert(key, mark) {
            Some(_) => Upsert::Recolored,
            None => {
                self.order.push(key);
                Upsert::Inserted
            }
        }
    }

    pub fn remove(&mut self, key: CellKey) -> Option<Mark> {
        let removed = self.marks.remove(&key)?;
        self.order.retain(|k| *k != key);
        Some(removed)
    }

    #[must_use]
    pub fn get(&self, key: CellKey) -> Option<&Mark> {
        self.marks.get(&key)
    }

    #[must_use]
    pub fn contains(&self, key: CellKey) -> bool {
        self.marks.contains_key(&key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Marks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.order.iter().filter_map(|key| self.marks.get(key))
    }

    /// Flat list suitable for persistence and sharing.
    #[must_use]
    pub fn to_list(&self) -> Vec<Mark> {
        self.iter().cloned().collect()
    }

    /// Remove everything, returning the keys that were marked.
    pub fn clear(&mut self) -> Vec<CellKey> {
        self.marks.clear();
        std::mem::take(&mut self.order)
    }
}

/// Fill and stroke colors of a mark overlay.
#[must_use]
pub fn mark_style(color: &str) -> Style {
    Style {
        class: Some("hex-mark"),
        fill: Some(hex_to_rgba(color, MARK_FILL_ALPHA)),
        stroke: Some(hex_to_rgba(color, MARK_STROKE_ALPHA)),
        ..Style::default()
    }
}

/// Overlay item covering the hexagon of `key`.
#[must_use]
pub fn mark_item(config: &MapConfig, key: CellKey, color: &str) -> Item {
    let center = config.compute_center(key.x, key.y);
    let points = config.hex_points().iter().map(|p| Point::new(center.x + p.x, center.y + p.y)).collect();
    Item::new(Tag::Mark(key), vec![Node::new(Shape::Polygon(points), mark_style(color))])
}
