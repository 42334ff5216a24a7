//! Input model: tools, mark modes, modifier keys, mouse buttons, and the
//! gesture state machine.
//!
//! `Tool`, `MarkMode` and `Modifiers` capture the user's intent at the time of
//! a pointer event. `InputState` is the active gesture tracked between
//! pointer-down and pointer-up, carrying everything needed to update the
//! preview on move and commit (or discard) on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::consts::{DEFAULT_ANNOTATION_SIZE, DEFAULT_COLOR};

/// Which annotation tool is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// No annotation tool: taps mark cells, drags pan (default).
    #[default]
    None,
    Arrow,
    Rectangle,
    /// Drag a box, then type its caption.
    Text,
    /// Freehand stroke.
    Sketch,
    /// Tap an annotation to delete it.
    Eraser,
}

impl Tool {
    /// Whether pointer-down with this tool starts drawing instead of panning.
    #[must_use]
    pub fn is_drawing(self) -> bool {
        matches!(self, Self::Arrow | Self::Rectangle | Self::Text | Self::Sketch)
    }

    /// Whether this tool drags out a two-point shape.
    #[must_use]
    pub fn is_two_point(self) -> bool {
        matches!(self, Self::Arrow | Self::Rectangle | Self::Text)
    }
}

/// What a tap on a cell does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkMode {
    #[default]
    Add,
    Remove,
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command key.
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    Middle,
    /// Right mouse button.
    Secondary,
}

/// Host pointer identifier.
pub type PointerId = i32;

/// Which surface element a pointer event was dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// The map surface.
    #[default]
    Surface,
    /// The inline text-entry overlay. The map ignores these.
    TextEntry,
}

/// A keyboard key as reported by the host (e.g. `"Escape"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Vertical scroll in pixels (positive = down).
    pub dy: f64,
}

/// A text box awaiting its caption.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraft {
    pub start: Point,
    pub end: Point,
    pub color: String,
    pub size: f64,
    /// Surface position of the entry field.
    pub entry_at: Point,
}

/// Editor controls visible to the host toolbar.
#[derive(Debug, Clone)]
pub struct UiState {
    pub tool: Tool,
    pub mark_mode: MarkMode,
    pub mark_color: String,
    pub annotation_color: String,
    pub annotation_size: f64,
    /// Open text entry, if any.
    pub text_entry: Option<TextDraft>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tool: Tool::None,
            mark_mode: MarkMode::Add,
            mark_color: DEFAULT_COLOR.to_owned(),
            annotation_color: DEFAULT_COLOR.to_owned(),
            annotation_size: DEFAULT_ANNOTATION_SIZE,
            text_entry: None,
        }
    }
}

/// Internal state for the gesture state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Dragging the map, or a tap (mark or erase) that has not moved yet.
    Panning { pointer: PointerId, button: Button },
    /// Dragging out an arrow, rectangle or text box.
    DrawingShape { pointer: PointerId, tool: Tool, start: Point, end: Point, color: String, size: f64 },
    /// Drawing a freehand stroke.
    Sketching { pointer: PointerId, path: String, color: String, size: f64 },
}

impl InputState {
    /// The pointer that owns the current gesture.
    #[must_use]
    pub fn pointer(&self) -> Option<PointerId> {
        match self {
            Self::Idle => None,
            Self::Panning { pointer, .. }
            | Self::DrawingShape { pointer, .. }
            | Self::Sketching { pointer, .. } => Some(*pointer),
        }
    }

    fn pointer_mut(&mut self) -> Option<&mut PointerId> {
        match self {
            Self::Idle => None,
            Self::Panning { pointer, .. }
            | Self::DrawingShape { pointer, .. }
            | Self::Sketching { pointer, .. } => Some(pointer),
        }
    }

    /// Attribute the gesture to a different pointer id.
    pub fn rebind(&mut self, id: PointerId) {
        if let Some(pointer) = self.pointer_mut() {
            *pointer = id;
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
