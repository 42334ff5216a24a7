//! Annotation model and the undoable annotation list.
//!
//! Annotations are free-floating vector shapes in world space. The list is
//! snapshot-versioned: every mutation pushes the prior list onto a history
//! stack, and undo pops it back. Share-token loads replace the list and reset
//! the history.

#[cfg(test)]
#[path = "annotation_test.rs"]
mod annotation_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::consts::MAX_ID_LEAD_MS;

/// Arrow or rectangle geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub id: u64,
    pub start: Point,
    pub end: Point,
    pub color: String,
    pub size: f64,
}

/// Boxed text note. `x`/`y` hold the anchor: box center and box bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNote {
    #[serde(default)]
    pub id: u64,
    pub start: Point,
    pub end: Point,
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub color: String,
    pub size: f64,
}

impl TextNote {
    /// Build a note for the box spanned by `start` and `end`.
    #[must_use]
    pub fn new(start: Point, end: Point, text: String, color: String, size: f64) -> Self {
        let (x, y) = text_anchor(start, end);
        Self { id: 0, start, end, x, y, text, color, size }
    }
}

/// `(center_x, bottom_y)` of the box spanned by two corners.
#[must_use]
pub fn text_anchor(start: Point, end: Point) -> (f64, f64) {
    ((start.x + end.x) / 2.0, start.y.max(end.y))
}

/// Freehand stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sketch {
    #[serde(default)]
    pub id: u64,
    #[serde(rename = "pathData")]
    pub path: String,
    pub color: String,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    Arrow(Segment),
    Rectangle(Segment),
    Text(TextNote),
    Sketch(Sketch),
}

impl Annotation {
    #[must_use]
    pub fn id(&self) -> u64 {
        match self {
            Self::Arrow(s) | Self::Rectangle(s) => s.id,
            Self::Text(t) => t.id,
            Self::Sketch(s) => s.id,
        }
    }

    fn set_id(&mut self, id: u64) {
        match self {
            Self::Arrow(s) | Self::Rectangle(s) => s.id = id,
            Self::Text(t) => t.id = id,
            Self::Sketch(s) => s.id = id,
        }
    }

    #[must_use]
    pub fn color(&self) -> &str {
        match self {
            Self::Arrow(s) | Self::Rectangle(s) => &s.color,
            Self::Text(t) => &t.color,
            Self::Sketch(s) => &s.color,
        }
    }

    #[must_use]
    pub fn size(&self) -> f64 {
        match self {
            Self::Arrow(s) | Self::Rectangle(s) => s.size,
            Self::Text(t) => t.size,
            Self::Sketch(s) => s.size,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Arrow(_) => "arrow",
            Self::Rectangle(_) => "rectangle",
            Self::Text(_) => "text",
            Self::Sketch(_) => "sketch",
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    u64::try_from(nanos / 1_000_000).unwrap_or(0)
}

/// Ordered annotation list with snapshot undo.
#[derive(Debug, Clone, Default)]
pub struct AnnotationDoc {
    items: Vec<Annotation>,
    history: Vec<Vec<Annotation>>,
    last_id: u64,
}

impl AnnotationDoc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotations in paint order (later on top).
    #[must_use]
    pub fn items(&self) -> &[Annotation] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id() == id)
    }

    /// Append `annotation` with a fresh id derived from the current time.
    pub fn add(&mut self, annotation: Annotation) -> u64 {
        self.add_at(annotation, now_ms())
    }

    /// Append with an id of at least `now`, strictly above every id issued so far.
    pub fn add_at(&mut self, mut annotation: Annotation, now: u64) -> u64 {
        let id = self.next_id(now);
        annotation.set_id(id);
        self.history.push(self.items.clone());
        self.items.push(annotation);
        tracing::debug!(id, "annotation added");
        id
    }

    /// Restore the previous snapshot. Returns `false` when there is none.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.items = previous;
                true
            }
            None => false,
        }
    }

    /// Empty the list. Undoable.
    pub fn clear_all(&mut self) {
        self.history.push(std::mem::take(&mut self.items));
    }

    /// Remove one annotation by id. Undoable; returns `false` when `id` is
    /// unknown, leaving the history untouched.
    pub fn remove(&mut self, id: u64) -> bool {
        if !self.items.iter().any(|a| a.id() == id) {
            return false;
        }
        self.history.push(self.items.clone());
        self.items.retain(|a| a.id() != id);
        true
    }

    /// Replace the whole list and drop the history. Entries without a usable
    /// id (zero, repeated, or further in the future than a day) are given
    /// fresh ones.
    pub fn replace_all(&mut self, items: Vec<Annotation>) {
        self.replace_all_at(items, now_ms());
    }

    /// [`AnnotationDoc::replace_all`] with an explicit clock.
    pub fn replace_all_at(&mut self, items: Vec<Annotation>, now: u64) {
        self.history.clear();
        let ceiling = now.saturating_add(MAX_ID_LEAD_MS);
        let plausible = |id: u64| id != 0 && id <= ceiling;
        let highest = items.iter().map(Annotation::id).filter(|&id| plausible(id)).max().unwrap_or(0);
        self.last_id = self.last_id.min(ceiling).max(highest);

        let mut seen = std::collections::HashSet::new();
        let mut accepted = Vec::with_capacity(items.len());
        let mut renumbered = 0_usize;
        for mut annotation in items {
            if !plausible(annotation.id()) || !seen.insert(annotation.id()) {
                self.last_id = self.last_id.saturating_add(1);
                annotation.set_id(self.last_id);
                seen.insert(self.last_id);
                renumbered += 1;
            }
            accepted.push(annotation);
        }
        if renumbered > 0 {
            tracing::debug!(renumbered, "annotation ids reassigned");
        }
        self.items = accepted;
    }

    fn next_id(&mut self, now: u64) -> u64 {
        self.last_id = now.max(self.last_id.saturating_add(1));
        self.last_id
    }
}
