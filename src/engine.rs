//! Editor engine: gesture routing plus the mark, annotation and share
//! operations behind it.
//!
//! `EngineCore` holds everything one mounted editor needs and never touches a
//! host surface. Handlers mutate state synchronously and return a list of
//! [`Action`]s; the host repaints, schedules animation frames, and shows or
//! hides the text-entry overlay in response. `Editor` adds the mount/close
//! lifecycle on top.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use crate::annotation::{Annotation, AnnotationDoc, Segment, Sketch, TextNote};
use crate::camera::Point;
use crate::color::normalize_hex_color;
use crate::config::EditorConfig;
use crate::consts::{
    CONTEXT_MENU_SLOP_PX, DRAG_THRESHOLD_PX, ERASER_SLOP_PX, MARKS_STORAGE_KEY, MIN_SHAPE_EXTENT, MIN_SKETCH_PATH_LEN,
    PALETTE, SIZE_OPTIONS, TEXT_ENTRY_MIN_SPACING_PX, WHEEL_ZOOM_FACTOR,
};
use crate::grid::{CellKey, MapConfig, display_key, expand_group};
use crate::hit;
use crate::input::{Button, InputState, Key, MarkMode, Modifiers, PointerId, Target, TextDraft, Tool, UiState, WheelDelta};
use crate::marks::{Mark, Upsert, mark_item, mark_style};
use crate::render::{self, Renderer};
use crate::scene::{LayerId, Scene, Tag};
use crate::share::{self, ShareError, ShareState};
use crate::state::MapState;
use crate::store::{KeyValueStore, load_json, save_json};

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The scene changed and should be repainted.
    RenderNeeded,
    /// Schedule one animation frame, then call
    /// [`EngineCore::on_animation_frame`].
    RequestFrame,
    /// Suppress the host's default handling (page scroll, context menu).
    PreventDefault,
    /// Show the text-entry field at this surface position.
    OpenTextEntry { x: f64, y: f64 },
    CloseTextEntry,
    MarksChanged,
    AnnotationsChanged,
}

/// Core engine state for one editor.
pub struct EngineCore {
    pub state: MapState,
    pub scene: Scene,
    pub annotations: AnnotationDoc,
    pub ui: UiState,
    pub input: InputState,
    pub renderer: Renderer,
    store: Box<dyn KeyValueStore>,
}

impl EngineCore {
    /// Build the grid and static scene. Marks are not loaded until
    /// [`EngineCore::load`].
    #[must_use]
    pub fn new(config: MapConfig, icon_base: &str, store: Box<dyn KeyValueStore>) -> Self {
        let state = MapState::new(config);
        let mut scene = Scene::new();
        render::build_static(&mut scene, &state.grid, icon_base);
        render::apply_transform(&mut scene, &state.camera, &state.grid, None);
        Self {
            state,
            scene,
            annotations: AnnotationDoc::new(),
            ui: UiState::default(),
            input: InputState::default(),
            renderer: Renderer::new(),
            store,
        }
    }

    // --- Marks ---

    /// Mark `key` with `color`, or recolor its existing mark. Returns `false`
    /// for cells outside the grid.
    pub fn create_mark(&mut self, key: CellKey, color: &str) -> bool {
        if !self.state.grid.contains(key) {
            return false;
        }
        let color = normalize_hex_color(color);
        match self.state.marks.upsert(Mark::new(key, color.clone())) {
            Upsert::Inserted => {
                self.scene.push(LayerId::Mark, mark_item(self.state.config(), key, &color));
            }
            Upsert::Recolored => {
                if let Some(item) = self.scene.find_mut(LayerId::Mark, Tag::Mark(key)) {
                    for node in &mut item.nodes {
                        node.style = mark_style(&color);
                    }
                }
            }
        }
        true
    }

    /// Remove the mark on `key`. Returns `false` when there was none.
    pub fn remove_mark(&mut self, key: CellKey) -> bool {
        if self.state.marks.remove(key).is_none() {
            return false;
        }
        self.scene.remove_where(LayerId::Mark, |item| item.tag == Tag::Mark(key));
        true
    }

    /// Persist the mark list. Failures are logged; in-memory marks are kept.
    pub fn save_marks(&mut self) {
        let marks = self.state.marks.to_list();
        if let Err(e) = save_json(self.store.as_mut(), MARKS_STORAGE_KEY, &marks) {
            tracing::warn!(error = %e, count = marks.len(), "failed to save marks");
        }
    }

    /// Remove every mark and persist the empty list.
    pub fn clear_marks(&mut self) -> Vec<Action> {
        let removed = self.state.marks.clear();
        self.scene.clear(LayerId::Mark);
        self.save_marks();
        tracing::info!(count = removed.len(), "marks cleared");
        vec![Action::MarksChanged, Action::RenderNeeded]
    }

    /// Marks in insertion order.
    #[must_use]
    pub fn marks(&self) -> Vec<Mark> {
        self.state.marks.to_list()
    }

    /// Seed marks and annotations at mount. A decodable share token wins and
    /// overwrites the stored marks; otherwise marks come from storage.
    pub fn load(&mut self, token: Option<&str>) {
        if let Some(shared) = token.and_then(share::decode) {
            let accepted = shared.marks.iter().filter(|m| self.create_mark(m.key(), &m.color)).count();
            self.save_marks();
            if !shared.annotations.is_empty() {
                self.annotations.replace_all(shared.annotations);
                render::redraw_annotations(&mut self.scene, &self.annotations);
            }
            tracing::info!(
                marks = accepted,
                dropped = shared.marks.len() - accepted,
                annotations = self.annotations.len(),
                "loaded shared map"
            );
            return;
        }

        let Some(values) = load_json::<Vec<serde_json::Value>>(self.store.as_ref(), MARKS_STORAGE_KEY) else {
            return;
        };
        let stored = share::marks_from_values(values);
        let accepted = stored.iter().filter(|m| self.create_mark(m.key(), &m.color)).count();
        tracing::info!(marks = accepted, "loaded stored marks");
    }

    fn apply_tap(&mut self, key: CellKey) -> Vec<Action> {
        let mode = self.ui.mark_mode;
        let color = self.ui.mark_color.clone();
        let mut changed = false;
        for k in expand_group(key) {
            changed |= match mode {
                MarkMode::Add => self.create_mark(k, &color),
                MarkMode::Remove => self.remove_mark(k),
            };
        }
        if !changed {
            return Vec::new();
        }
        self.save_marks();
        vec![Action::MarksChanged, Action::RenderNeeded]
    }

    fn remove_group(&mut self, key: CellKey) -> Vec<Action> {
        let mut removed = false;
        for k in expand_group(key) {
            removed |= self.remove_mark(k);
        }
        if !removed {
            return Vec::new();
        }
        self.save_marks();
        vec![Action::MarksChanged, Action::RenderNeeded]
    }

    // --- Annotations ---

    fn commit(&mut self, annotation: Annotation) -> Vec<Action> {
        let kind = annotation.kind();
        let id = self.annotations.add(annotation);
        render::redraw_annotations(&mut self.scene, &self.annotations);
        tracing::debug!(id, kind, "annotation committed");
        vec![Action::AnnotationsChanged, Action::RenderNeeded]
    }

    /// Restore the annotation list before the last mutation.
    pub fn undo(&mut self) -> Vec<Action> {
        if !self.annotations.undo() {
            return Vec::new();
        }
        render::redraw_annotations(&mut self.scene, &self.annotations);
        vec![Action::AnnotationsChanged, Action::RenderNeeded]
    }

    /// Remove every annotation. Undoable.
    pub fn clear_annotations(&mut self) -> Vec<Action> {
        if self.annotations.is_empty() {
            return Vec::new();
        }
        self.annotations.clear_all();
        render::redraw_annotations(&mut self.scene, &self.annotations);
        vec![Action::AnnotationsChanged, Action::RenderNeeded]
    }

    // --- Tool / text ---

    /// Switch tools. Leaving the text tool abandons any pending caption, and
    /// an unfinished drawing gesture is dropped.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.ui.tool == Tool::Text && tool != Tool::Text && self.ui.text_entry.take().is_some() {
            actions.push(Action::CloseTextEntry);
        }
        if matches!(self.input, InputState::DrawingShape { .. } | InputState::Sketching { .. }) {
            self.input = InputState::Idle;
        }
        render::clear_temp(&mut self.scene);
        self.ui.tool = tool;
        if tool != Tool::None {
            actions.extend(self.clear_hover_ui());
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn set_mark_mode(&mut self, mode: MarkMode) {
        self.ui.mark_mode = mode;
    }

    pub fn set_mark_color(&mut self, color: &str) {
        self.ui.mark_color = normalize_hex_color(color);
    }

    pub fn set_annotation_color(&mut self, color: &str) {
        self.ui.annotation_color = normalize_hex_color(color);
    }

    /// Set the stroke scale for new annotations. Non-positive sizes are
    /// ignored.
    pub fn set_annotation_size(&mut self, size: f64) {
        if size.is_finite() && size > 0.0 {
            self.ui.annotation_size = size;
        }
    }

    /// Commit the pending text box with `text`. Blank text abandons it.
    pub fn confirm_text(&mut self, text: &str) -> Vec<Action> {
        let Some(draft) = self.ui.text_entry.take() else {
            return Vec::new();
        };
        let text = text.trim();
        if text.is_empty() {
            render::clear_temp(&mut self.scene);
            return vec![Action::CloseTextEntry, Action::RenderNeeded];
        }
        let note = TextNote::new(draft.start, draft.end, text.to_owned(), draft.color, draft.size);
        let mut actions = vec![Action::CloseTextEntry];
        actions.extend(self.commit(Annotation::Text(note)));
        actions
    }

    /// Abandon the pending text box (Escape or blur).
    pub fn cancel_text(&mut self) -> Vec<Action> {
        if self.ui.text_entry.take().is_none() {
            return Vec::new();
        }
        render::clear_temp(&mut self.scene);
        vec![Action::CloseTextEntry, Action::RenderNeeded]
    }

    // --- Sharing ---

    #[must_use]
    pub fn share_state(&self) -> ShareState {
        ShareState { marks: self.state.marks.to_list(), annotations: self.annotations.items().to_vec() }
    }

    /// Encode the current marks and annotations.
    ///
    /// # Errors
    ///
    /// Propagates [`ShareError`] from the codec.
    pub fn share_token(&self) -> Result<String, ShareError> {
        share::encode(&self.share_state())
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, id: PointerId, screen: Point, button: Button, target: Target) -> Vec<Action> {
        if target == Target::TextEntry {
            return Vec::new();
        }
        if self.ui.text_entry.is_some() {
            return self.cancel_text();
        }

        self.state.pointers.insert(id, screen);
        if self.state.pointers.len() > 1 || !self.input.is_idle() {
            return Vec::new();
        }

        let world = self.state.camera.screen_to_world(screen);
        let tool = self.ui.tool;
        let mut actions = self.clear_hover_ui();
        match (tool, button) {
            (Tool::Arrow | Tool::Rectangle | Tool::Text, Button::Primary) => {
                self.input = InputState::DrawingShape {
                    pointer: id,
                    tool,
                    start: world,
                    end: world,
                    color: self.ui.annotation_color.clone(),
                    size: self.ui.annotation_size,
                };
            }
            (Tool::Sketch, Button::Primary) => {
                let path = format!("M {} {}", world.x, world.y);
                let color = self.ui.annotation_color.clone();
                let size = self.ui.annotation_size;
                render::set_temp(&mut self.scene, vec![render::sketch_node(&path, &color, size)]);
                self.input = InputState::Sketching { pointer: id, path, color, size };
                actions.push(Action::RenderNeeded);
            }
            _ => {
                self.state.start_pointer = screen;
                self.state.last_pointer = screen;
                self.state.dragging = false;
                self.input = InputState::Panning { pointer: id, button };
            }
        }
        actions
    }

    pub fn on_pointer_move(&mut self, id: PointerId, screen: Point) -> Vec<Action> {
        self.adopt_pointer(id);
        if let Some(known) = self.state.pointers.get_mut(&id) {
            *known = screen;
        }

        if self.input.is_idle() {
            return self.hover(screen);
        }
        if self.input.pointer() != Some(id) {
            return Vec::new();
        }

        let world = self.state.camera.screen_to_world(screen);
        match &mut self.input {
            InputState::DrawingShape { tool, start, end, color, size, .. } => {
                *end = world;
                render::set_temp(&mut self.scene, render::preview_nodes(*tool, *start, *end, color, *size));
                vec![Action::RenderNeeded]
            }
            InputState::Sketching { path, color, size, .. } => {
                path.push_str(&format!(" L {} {}", world.x, world.y));
                render::set_temp(&mut self.scene, vec![render::sketch_node(path, color, *size)]);
                vec![Action::RenderNeeded]
            }
            InputState::Panning { .. } => {
                let last = self.state.last_pointer;
                self.state.camera.pan_by(screen.x - last.x, screen.y - last.y);
                self.state.last_pointer = screen;
                let start = self.state.start_pointer;
                if (screen.x - start.x).abs() > DRAG_THRESHOLD_PX || (screen.y - start.y).abs() > DRAG_THRESHOLD_PX {
                    self.state.dragging = true;
                }
                self.request_frame()
            }
            InputState::Idle => Vec::new(),
        }
    }

    pub fn on_pointer_up(&mut self, id: PointerId, screen: Point) -> Vec<Action> {
        self.adopt_pointer(id);
        self.state.pointers.remove(&id);

        let actions = if self.input.pointer() == Some(id) {
            let world = self.state.camera.screen_to_world(screen);
            match std::mem::take(&mut self.input) {
                InputState::DrawingShape { tool, start, color, size, .. } => {
                    self.finish_shape(tool, start, world, color, size)
                }
                InputState::Sketching { path, color, size, .. } => self.finish_sketch(path, color, size),
                InputState::Panning { button: Button::Primary, .. } if !self.state.dragging => self.tap(world),
                InputState::Panning { .. } | InputState::Idle => Vec::new(),
            }
        } else {
            Vec::new()
        };

        if self.state.pointers.is_empty() {
            self.state.dragging = false;
        }
        actions
    }

    /// Lost pointer: finish the gesture at the last known position.
    pub fn on_pointer_cancel(&mut self, id: PointerId) -> Vec<Action> {
        self.adopt_pointer(id);
        let at = self.state.pointers.get(&id).copied().unwrap_or(self.state.last_pointer);
        self.on_pointer_up(id, at)
    }

    /// Right-click removes marks regardless of mark mode.
    pub fn on_context_menu(&mut self, screen: Point) -> Vec<Action> {
        let mut actions = vec![Action::PreventDefault];
        if self.ui.tool.is_drawing() || self.state.start_pointer.distance_to(screen) > CONTEXT_MENU_SLOP_PX {
            return actions;
        }

        let world = self.state.camera.screen_to_world(screen);
        let covered = hit::annotation_at(&self.scene, world, 0.0).is_some();
        let direct = if covered { None } else { self.state.grid.cell_at(world) };
        let target = direct.or_else(|| {
            let radius = self.state.config().radius * 2.0;
            hit::nearest_mark(&self.state.marks, &self.state.grid, world, radius)
        });
        if let Some(key) = target {
            actions.extend(self.remove_group(key));
        }
        actions
    }

    /// Zoom by one notch about the cursor.
    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta) -> Vec<Action> {
        let mut actions = vec![Action::PreventDefault];
        if delta.dy == 0.0 {
            return actions;
        }
        let factor = if delta.dy < 0.0 { WHEEL_ZOOM_FACTOR } else { 1.0 / WHEEL_ZOOM_FACTOR };
        if self.state.camera.zoom_at(screen, factor) {
            actions.extend(self.request_frame());
        }
        actions
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        match key.0.as_str() {
            "Escape" if self.ui.text_entry.is_some() => self.cancel_text(),
            "Escape" if matches!(self.input, InputState::DrawingShape { .. } | InputState::Sketching { .. }) => {
                self.input = InputState::Idle;
                render::clear_temp(&mut self.scene);
                vec![Action::RenderNeeded]
            }
            "z" | "Z" if (modifiers.ctrl || modifiers.meta) && !modifiers.shift && self.ui.text_entry.is_none() => {
                self.undo()
            }
            _ => Vec::new(),
        }
    }

    /// Apply the pending transform, if any.
    pub fn on_animation_frame(&mut self) -> Vec<Action> {
        if !self.renderer.take_frame() {
            return Vec::new();
        }
        render::apply_transform(&mut self.scene, &self.state.camera, &self.state.grid, self.state.last_hovered);
        vec![Action::RenderNeeded]
    }

    // --- Gesture helpers ---

    /// Attribute an untracked pointer id to the gesture when the gesture's
    /// pointer is the only one down.
    fn adopt_pointer(&mut self, id: PointerId) {
        if self.state.pointers.contains_key(&id) {
            return;
        }
        let Some(owner) = self.input.pointer() else {
            return;
        };
        if self.state.pointers.len() != 1 {
            return;
        }
        let Some(at) = self.state.pointers.remove(&owner) else {
            return;
        };
        self.state.pointers.insert(id, at);
        self.input.rebind(id);
        tracing::debug!(from = owner, to = id, "pointer id reassigned");
    }

    fn request_frame(&mut self) -> Vec<Action> {
        if self.renderer.request_frame() { vec![Action::RequestFrame] } else { Vec::new() }
    }

    fn finish_shape(&mut self, tool: Tool, start: Point, end: Point, color: String, size: f64) -> Vec<Action> {
        if start.distance_to(end) <= MIN_SHAPE_EXTENT {
            render::clear_temp(&mut self.scene);
            return vec![Action::RenderNeeded];
        }
        match tool {
            Tool::Arrow => self.commit(Annotation::Arrow(Segment { id: 0, start, end, color, size })),
            Tool::Rectangle => self.commit(Annotation::Rectangle(Segment { id: 0, start, end, color, size })),
            Tool::Text => {
                render::set_temp(&mut self.scene, render::preview_nodes(tool, start, end, &color, size));
                let entry_at = self.text_entry_position(start, end, size);
                self.ui.text_entry = Some(TextDraft { start, end, color, size, entry_at });
                vec![Action::OpenTextEntry { x: entry_at.x, y: entry_at.y }, Action::RenderNeeded]
            }
            Tool::None | Tool::Sketch | Tool::Eraser => {
                render::clear_temp(&mut self.scene);
                vec![Action::RenderNeeded]
            }
        }
    }

    fn finish_sketch(&mut self, path: String, color: String, size: f64) -> Vec<Action> {
        if path.len() <= MIN_SKETCH_PATH_LEN {
            render::clear_temp(&mut self.scene);
            return vec![Action::RenderNeeded];
        }
        self.commit(Annotation::Sketch(Sketch { id: 0, path, color, size }))
    }

    /// Surface position of the caption field: centered under the box, with
    /// spacing that grows with the box and the text size.
    fn text_entry_position(&self, start: Point, end: Point, size: f64) -> Point {
        let camera = &self.state.camera;
        let s = camera.scale;
        let center_x = (start.x + end.x) / 2.0;
        let bottom = start.y.max(end.y);
        let box_height = (end.y - start.y).abs();
        let spacing = (box_height * s * 0.2).max(size * s * 0.5).max(TEXT_ENTRY_MIN_SPACING_PX);
        Point::new(center_x * s + camera.translate.x, bottom * s + camera.translate.y + spacing)
    }

    /// A primary click that never became a drag.
    fn tap(&mut self, world: Point) -> Vec<Action> {
        match self.ui.tool {
            Tool::Eraser => {
                let slop = self.state.camera.screen_dist_to_world(ERASER_SLOP_PX);
                let Some(id) = hit::annotation_at(&self.scene, world, slop) else {
                    return Vec::new();
                };
                if !self.annotations.remove(id) {
                    return Vec::new();
                }
                render::redraw_annotations(&mut self.scene, &self.annotations);
                tracing::debug!(id, "annotation erased");
                vec![Action::AnnotationsChanged, Action::RenderNeeded]
            }
            Tool::None => {
                if hit::annotation_at(&self.scene, world, 0.0).is_some() {
                    return Vec::new();
                }
                match self.state.grid.cell_at(world) {
                    Some(key) => self.apply_tap(key),
                    None => Vec::new(),
                }
            }
            Tool::Arrow | Tool::Rectangle | Tool::Text | Tool::Sketch => Vec::new(),
        }
    }

    // --- Hover ---

    fn hover(&mut self, screen: Point) -> Vec<Action> {
        if self.ui.tool != Tool::None || self.state.any_pointer_down() || self.state.dragging {
            return self.clear_hover_ui();
        }
        let world = self.state.camera.screen_to_world(screen);
        if hit::annotation_at(&self.scene, world, 0.0).is_some() {
            return self.clear_hover_ui();
        }
        let Some(key) = self.state.grid.cell_at(world) else {
            return self.clear_hover_ui();
        };
        if self.state.last_hovered == Some(display_key(key)) {
            return Vec::new();
        }
        self.state.last_hovered = render::show_hover(&mut self.scene, &self.state.grid, key, self.state.camera.scale);
        vec![Action::RenderNeeded]
    }

    fn clear_hover_ui(&mut self) -> Vec<Action> {
        if self.state.last_hovered.take().is_none() {
            return Vec::new();
        }
        render::clear_hover(&mut self.scene);
        vec![Action::RenderNeeded]
    }
}

// =============================================================================
// EDITOR
// =============================================================================

/// Display language of the host. Only affects editor status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En,
    Zh,
}

impl Lang {
    /// Parse a BCP-47-ish tag such as `"zh-CN"`. Unknown tags are English.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("zh") { Self::Zh } else { Self::En }
    }

    #[must_use]
    pub fn share_copied(self) -> &'static str {
        match self {
            Self::En => "Share link ready",
            Self::Zh => "分享链接已生成",
        }
    }

    #[must_use]
    pub fn share_failed(self) -> &'static str {
        match self {
            Self::En => "Failed to generate share link",
            Self::Zh => "生成分享链接失败",
        }
    }
}

/// What the host hands the editor at mount.
pub struct EditorProps {
    pub lang: Lang,
    pub on_close: Box<dyn FnMut() + Send>,
}

/// A mounted editor surface.
pub struct Editor {
    pub core: EngineCore,
    props: EditorProps,
    share_message: Option<&'static str>,
}

impl Editor {
    /// Build the scene and seed state from the `map` parameter of `query`,
    /// falling back to `store`.
    #[must_use]
    pub fn mount(config: &EditorConfig, props: EditorProps, store: Box<dyn KeyValueStore>, query: &str) -> Self {
        let mut core = EngineCore::new(config.map, &config.icon_dir, store);
        let token = share::token_from_query(query);
        core.load(token.as_deref());
        tracing::info!(cells = core.state.grid.len(), marks = core.state.marks.len(), shared = token.is_some(), "editor mounted");
        Self { core, props, share_message: None }
    }

    #[must_use]
    pub fn lang(&self) -> Lang {
        self.props.lang
    }

    /// Swatches offered for mark and annotation colors.
    #[must_use]
    pub fn palette() -> &'static [&'static str] {
        &PALETTE
    }

    /// Annotation size presets, smallest first.
    #[must_use]
    pub fn size_options() -> &'static [f64] {
        &SIZE_OPTIONS
    }

    /// Ask the host to dismiss the editor.
    pub fn close(&mut self) {
        (self.props.on_close)();
    }

    /// Share URL for the current state on top of `base`. The outcome is also
    /// reflected in [`Editor::share_message`].
    ///
    /// # Errors
    ///
    /// Propagates [`ShareError`] from the codec.
    pub fn share_link(&mut self, base: &str) -> Result<String, ShareError> {
        match self.core.share_token() {
            Ok(token) => {
                self.share_message = Some(self.props.lang.share_copied());
                Ok(share::share_url(base, &token))
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to generate share link");
                self.share_message = Some(self.props.lang.share_failed());
                Err(e)
            }
        }
    }

    /// Status text from the last share attempt.
    #[must_use]
    pub fn share_message(&self) -> Option<&'static str> {
        self.share_message
    }
}
