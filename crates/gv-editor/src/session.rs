//! Editor session: the context plus the tools and views that act on it.
//!
//! `EditorSession` is what a front end drives. Pointer events go to the
//! brush, AOI edits go through the command stack, and the two derived views
//! refresh lazily from a context snapshot.

use crate::commands::{AoiMutation, CommandStack};
use crate::config::EditorConfig;
use crate::context::{SessionContext, ViewKind};
use crate::error::{EditorError, Result};
use crate::input::InputEvent;
use crate::tools::{BrushSelection, BrushTool};
use crate::views::{AttentionMapView, GraphScene, TransitionGraphView, ViewStatus};
use gv_core::{AoiId, Dataset, DensityGrid, ImageId, ImageSize, PointRef};

pub struct EditorSession {
    ctx: SessionContext,
    commands: CommandStack,
    brush: BrushTool,
    graph: TransitionGraphView,
    attention: AttentionMapView,
}

impl EditorSession {
    pub fn new(dataset: Dataset, config: EditorConfig) -> Self {
        let mut ctx = SessionContext::new(dataset);
        let graph = TransitionGraphView::new(&mut ctx, config.layout);
        let attention = AttentionMapView::new(&mut ctx, config.density);
        Self {
            brush: BrushTool::new(&config, ctx.image_size()),
            commands: CommandStack::new(config.undo_depth),
            ctx,
            graph,
            attention,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Mutable access for property setters (users, color).
    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.ctx
    }

    pub fn load_dataset(&mut self, dataset: Dataset) {
        self.ctx.load_dataset(dataset);
        self.commands.clear();
        self.brush.clear();
        self.brush.start();
    }

    /// Switch to another image. Undo history belongs to the previous image
    /// and is dropped.
    pub fn select_image(&mut self, image: Option<ImageId>) -> Result<()> {
        let previous = self.ctx.image();
        self.ctx.set_image(image)?;
        if previous != image {
            self.commands.clear();
            self.brush.clear();
            self.brush.start();
        }
        Ok(())
    }

    pub fn set_image_size(&mut self, size: ImageSize) {
        self.ctx.set_image_size(size);
        self.brush.set_image_size(size);
    }

    // ─── Brush ───────────────────────────────────────────────────────────

    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        self.brush.handle(event)
    }

    pub fn brush(&self) -> &BrushTool {
        &self.brush
    }

    pub fn brush_selection(&self) -> Option<BrushSelection> {
        self.brush.selection()
    }

    pub fn start_brush(&mut self) {
        self.brush.start();
    }

    pub fn clear_brush(&mut self) {
        self.brush.clear();
    }

    /// Points of the current image inside the brush.
    pub fn selected_points(&self) -> Result<Vec<PointRef>> {
        Ok(match self.ctx.snapshot().image_data()? {
            Some(image) => self.brush.selected_points(image),
            None => Vec::new(),
        })
    }

    /// Points of the current image that belong to at least one AOI.
    pub fn points_under_aois(&self) -> Vec<PointRef> {
        let Some(registry) = self.ctx.current_registry() else {
            return Vec::new();
        };
        let Some(image) = self.ctx.dataset().image(registry.image) else {
            return Vec::new();
        };
        image
            .points()
            .map(|(r, _)| r)
            .filter(|&r| !registry.aois_containing(r).is_empty())
            .collect()
    }

    // ─── AOI edits ───────────────────────────────────────────────────────

    /// Turn the brush selection into an AOI. `Ok(None)` when the selection
    /// is missing or too small.
    pub fn add_aoi(&mut self) -> Result<Option<AoiId>> {
        if self.ctx.image().is_none() {
            return Err(EditorError::NoImage);
        }
        let Some(mutation) = self.brush.confirm() else {
            return Ok(None);
        };
        self.commands.execute(&mut self.ctx, mutation, "add AOI")
    }

    pub fn delete_aoi(&mut self, id: AoiId) -> Result<()> {
        self.commands
            .execute(&mut self.ctx, AoiMutation::Delete { id }, "delete AOI")
            .map(|_| ())
    }

    /// Delete the topmost AOI under `(x, y)`, if any.
    pub fn delete_aoi_at(&mut self, x: f32, y: f32) -> Result<Option<AoiId>> {
        let Some(id) = self.ctx.aoi_at(x, y) else {
            return Ok(None);
        };
        self.delete_aoi(id)?;
        Ok(Some(id))
    }

    pub fn clear_aois(&mut self) -> Result<()> {
        self.commands
            .execute(&mut self.ctx, AoiMutation::ClearAll, "clear AOIs")
            .map(|_| ())
    }

    pub fn undo(&mut self) -> Result<Option<String>> {
        self.commands.undo(&mut self.ctx)
    }

    pub fn redo(&mut self) -> Result<Option<String>> {
        self.commands.redo(&mut self.ctx)
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    // ─── Views ───────────────────────────────────────────────────────────

    pub fn refresh_transition_graph(&mut self) -> &ViewStatus {
        let snapshot = self.ctx.snapshot();
        self.graph.refresh(&snapshot)
    }

    pub fn transition_graph(&self) -> Option<&GraphScene> {
        self.graph.instance().output()
    }

    pub fn tick_layout(&mut self) -> bool {
        self.graph.tick()
    }

    pub fn pin_node(&mut self, index: usize, x: f32, y: f32) {
        if let Some(scene) = self.graph.instance_mut().output_mut() {
            scene.layout.pin(index, x, y);
        }
    }

    pub fn unpin_node(&mut self, index: usize) {
        if let Some(scene) = self.graph.instance_mut().output_mut() {
            scene.layout.unpin(index);
        }
    }

    pub fn refresh_attention_map(&mut self) -> &ViewStatus {
        let snapshot = self.ctx.snapshot();
        self.attention.refresh(&snapshot)
    }

    pub fn attention_map(&self) -> Option<&DensityGrid> {
        self.attention.instance().output()
    }

    /// Dismiss the error shown by `view`.
    pub fn acknowledge(&mut self, view: ViewKind) -> Option<String> {
        match view {
            ViewKind::TransitionGraph => self.graph.instance_mut().acknowledge(),
            ViewKind::AttentionMap => self.attention.instance_mut().acknowledge(),
            ViewKind::Editor => None,
        }
    }
}
