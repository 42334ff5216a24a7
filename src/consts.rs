//! Shared numeric constants for the editor.

// ── Grid ────────────────────────────────────────────────────────

/// Hex circumradius in world units.
pub const HEX_RADIUS: f64 = 40.0;

/// Largest `(x, y)` for cells with an even `x`.
pub const MAX_EVEN: (i32, i32) = (60, 100);

/// Largest `(x, y)` for cells with an odd `x`. Odd cells start at `(1, 1)`.
pub const MAX_ODD: (i32, i32) = (59, 101);

// ── Camera ──────────────────────────────────────────────────────

/// Initial zoom when an editor is mounted.
pub const DEFAULT_SCALE: f64 = 0.5;

pub const MIN_SCALE: f64 = 0.225;
pub const MAX_SCALE: f64 = 3.0;

/// Multiplicative zoom per wheel notch.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;

// ── Gestures ────────────────────────────────────────────────────

/// Screen movement (either axis) after which a pan counts as a drag.
pub const DRAG_THRESHOLD_PX: f64 = 2.0;

/// Pointer travel after which a right-click is treated as the end of a pan.
pub const CONTEXT_MENU_SLOP_PX: f64 = 10.0;

/// Arrow, rectangle and text boxes must be strictly longer than this.
pub const MIN_SHAPE_EXTENT: f64 = 5.0;

/// Sketch path strings must be strictly longer than this.
pub const MIN_SKETCH_PATH_LEN: usize = 10;

/// Extra screen-space hit slop for the eraser.
pub const ERASER_SLOP_PX: f64 = 4.0;

/// Minimum screen offset between a text box and its entry field.
pub const TEXT_ENTRY_MIN_SPACING_PX: f64 = 20.0;

// ── Marks ───────────────────────────────────────────────────────

pub const MARK_FILL_ALPHA: f64 = 0.32;
pub const MARK_STROKE_ALPHA: f64 = 0.94;

/// Returned by color normalization for malformed input.
pub const FALLBACK_COLOR: &str = "#ff6961";

/// Initial mark and annotation color.
pub const DEFAULT_COLOR: &str = "#ef4444";

pub const PALETTE: [&str; 6] = ["#ef4444", "#f97316", "#eab308", "#22c55e", "#3b82f6", "#a855f7"];

// ── Annotations ─────────────────────────────────────────────────

pub const SIZE_OPTIONS: [f64; 5] = [8.0, 12.0, 24.0, 48.0, 96.0];
pub const DEFAULT_ANNOTATION_SIZE: f64 = 12.0;

/// Shared annotation ids further ahead of the clock than this are reassigned.
pub const MAX_ID_LEAD_MS: u64 = 86_400_000;

// ── Hover ───────────────────────────────────────────────────────

pub const HIGHLIGHT_COLOR: &str = "#ef4444";
pub const HIGHLIGHT_WIDTH: f64 = 3.0;
pub const LABEL_HEIGHT: f64 = 26.0;
pub const LABEL_CHAR_WIDTH: f64 = 9.0;
pub const LABEL_PADDING: f64 = 24.0;

// ── Persistence / sharing ───────────────────────────────────────

pub const MARKS_STORAGE_KEY: &str = "stronghold-marks";
pub const SHARE_QUERY_PARAM: &str = "map";
pub const SHARE_TOKEN_PREFIX: &str = "s:1:";

// ── Export ──────────────────────────────────────────────────────

/// Offset of the export view box origin, in world units.
pub const EXPORT_PADDING: f64 = 100.0;

/// Cells added to the largest coordinate when sizing the export canvas.
pub const EXPORT_EXTENT_MARGIN: f64 = 4.0;

pub const WATERMARK_TEXT: &str = "noswork";
/// x of the first watermark column.
pub const WATERMARK_START_X: f64 = -200.0;
pub const WATERMARK_STEP_X: f64 = 300.0;
pub const WATERMARK_STEP_Y: f64 = 200.0;
pub const WATERMARK_ANGLE_DEG: f64 = -30.0;
pub const WATERMARK_OPACITY: f64 = 0.07;
pub const WATERMARK_FONT_SIZE: f64 = 32.0;
