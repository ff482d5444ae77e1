//! Brush tool for drawing AOIs on the editor canvas.
//!
//! A drag produces a normalized `BrushSelection`, clamped to the image
//! extent grown by `brush_margin` on every side. Points inside the
//! selection are highlighted; once the selection is strictly larger than
//! `min_aoi_size` in both directions the editor offers "Add AOI", and
//! `confirm()` turns it into an `AoiMutation::Create`.

use crate::commands::AoiMutation;
use crate::config::EditorConfig;
use crate::input::{InputEvent, PointerButton};
use gv_core::{ImageData, ImageSize, PointRef, Region, Result};
use serde::Serialize;

/// Normalized brush rectangle: `x0 <= x1`, `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BrushSelection {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BrushSelection {
    /// Normalize a drag from its anchor and the current pointer position.
    pub fn from_drag(ax: f32, ay: f32, bx: f32, by: f32) -> Self {
        Self {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Inclusive on every edge, like AOI membership.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn to_region(&self) -> Result<Region> {
        Region::new(self.x0, self.y0, self.x1, self.y1)
    }
}

/// The area the brush may cover.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BrushBounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl BrushBounds {
    /// Bounds for `size` grown by `margin`. A bad size falls back to the
    /// default and a negative or non-finite margin counts as zero, so
    /// `min <= max` always holds for `clamp`.
    fn around(size: ImageSize, margin: f32) -> Self {
        let size = size.sanitized();
        let margin = if margin.is_finite() {
            margin.max(0.0)
        } else {
            0.0
        };
        Self {
            min_x: -margin,
            min_y: -margin,
            max_x: size.width + margin,
            max_y: size.height + margin,
        }
    }

    fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x.clamp(self.min_x, self.max_x),
            y.clamp(self.min_y, self.max_y),
        )
    }
}

pub struct BrushTool {
    enabled: bool,
    /// Pointer-down position while a drag is in progress.
    anchor: Option<(f32, f32)>,
    selection: Option<BrushSelection>,
    bounds: BrushBounds,
    margin: f32,
    min_aoi_size: f32,
}

impl BrushTool {
    pub fn new(config: &EditorConfig, size: ImageSize) -> Self {
        Self {
            enabled: true,
            anchor: None,
            selection: None,
            bounds: BrushBounds::around(size, config.brush_margin),
            margin: config.brush_margin,
            min_aoi_size: config.min_aoi_size,
        }
    }

    /// Re-derive the clamp area once the image's natural size is known.
    pub fn set_image_size(&mut self, size: ImageSize) {
        self.bounds = BrushBounds::around(size, self.margin);
        if let Some(sel) = self.selection {
            let (x0, y0) = self.bounds.clamp(sel.x0, sel.y0);
            let (x1, y1) = self.bounds.clamp(sel.x1, sel.y1);
            self.selection = Some(BrushSelection::from_drag(x0, y0, x1, y1));
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable the brush again after `clear()`.
    pub fn start(&mut self) {
        self.enabled = true;
    }

    /// Remove the current selection and disable the brush.
    pub fn clear(&mut self) {
        self.enabled = false;
        self.anchor = None;
        self.selection = None;
    }

    pub fn selection(&self) -> Option<BrushSelection> {
        self.selection
    }

    /// Whether "Add AOI" should be offered.
    pub fn can_add_aoi(&self) -> bool {
        self.selection.is_some_and(|s| {
            s.width() > self.min_aoi_size && s.height() > self.min_aoi_size
        })
    }

    /// Handle one pointer event. Returns `true` when the selection changed.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        if !self.enabled {
            return false;
        }
        match *event {
            InputEvent::PointerDown { x, y, button } => {
                if button != PointerButton::Primary {
                    return false;
                }
                let (x, y) = self.bounds.clamp(x, y);
                self.anchor = Some((x, y));
                self.selection = None;
                true
            }
            InputEvent::PointerMove { x, y } => self.drag_to(x, y),
            InputEvent::PointerUp { x, y } => {
                let changed = self.drag_to(x, y);
                self.anchor = None;
                changed
            }
        }
    }

    fn drag_to(&mut self, x: f32, y: f32) -> bool {
        let Some((ax, ay)) = self.anchor else {
            return false;
        };
        let (x, y) = self.bounds.clamp(x, y);
        let next = BrushSelection::from_drag(ax, ay, x, y);
        if self.selection == Some(next) {
            return false;
        }
        self.selection = Some(next);
        true
    }

    /// Points of `image` inside the current selection.
    pub fn selected_points(&self, image: &ImageData) -> Vec<PointRef> {
        let Some(sel) = self.selection else {
            return Vec::new();
        };
        image
            .points()
            .filter(|(_, p)| sel.contains(p.x, p.y))
            .map(|(r, _)| r)
            .collect()
    }

    /// Turn the selection into a create mutation and reset the brush.
    /// `None` when the selection is too small.
    pub fn confirm(&mut self) -> Option<AoiMutation> {
        if !self.can_add_aoi() {
            log::debug!("brush selection too small for an AOI");
            return None;
        }
        let region = self.selection.take()?.to_region().ok()?;
        self.anchor = None;
        Some(AoiMutation::Create { region })
    }
}
