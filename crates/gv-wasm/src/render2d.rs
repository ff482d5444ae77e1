//! Canvas2D overlays for the AOI editor and the transition graph.
//!
//! The stimulus image itself is an `<img>` behind the canvas; these
//! functions only draw what sits on top of it, in image pixel space scaled
//! by `scale`.

use gv_core::{Aoi, Color, ImageData, PointRef, TransitionGraph};
use gv_editor::tools::BrushSelection;
use std::collections::HashSet;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

const POINT_RADIUS: f64 = 3.0;
const NODE_RADIUS: f64 = 12.0;

/// Colors used by the overlays.
pub struct OverlayTheme {
    pub point: &'static str,
    pub point_under_aoi: &'static str,
    pub point_selected: &'static str,
    pub brush: &'static str,
    pub link: &'static str,
    pub label: &'static str,
}

impl Default for OverlayTheme {
    fn default() -> Self {
        Self {
            point: "rgba(60, 60, 67, 0.55)",
            point_under_aoi: "#ff7f0e",
            point_selected: "#d62728",
            brush: "#1C1C1E",
            link: "rgba(60, 60, 67, 0.6)",
            label: "#1C1C1E",
        }
    }
}

fn css(color: Color) -> String {
    let to8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgba({}, {}, {}, {})",
        to8(color.r),
        to8(color.g),
        to8(color.b),
        color.a
    )
}

fn dashed(ctx: &CanvasRenderingContext2d, on: f64, off: f64) {
    let _ = ctx.set_line_dash(&js_sys::Array::of2(
        &JsValue::from_f64(on),
        &JsValue::from_f64(off),
    ));
}

/// Draw scanpath points, AOI rectangles, and the brush.
#[allow(clippy::too_many_arguments)]
pub fn render_editor(
    ctx: &CanvasRenderingContext2d,
    canvas_width: f64,
    canvas_height: f64,
    scale: f64,
    image: Option<&ImageData>,
    aois: &[Aoi],
    brush: Option<BrushSelection>,
    selected: &[PointRef],
    theme: &OverlayTheme,
) {
    ctx.clear_rect(0.0, 0.0, canvas_width, canvas_height);
    ctx.save();
    let _ = ctx.scale(scale, scale);

    if let Some(image) = image {
        let selected: HashSet<PointRef> = selected.iter().copied().collect();
        for (point_ref, p) in image.points() {
            let fill = if selected.contains(&point_ref) {
                theme.point_selected
            } else if aois.iter().any(|a| a.has_member(point_ref)) {
                theme.point_under_aoi
            } else {
                theme.point
            };
            ctx.set_fill_style_str(fill);
            ctx.begin_path();
            let _ = ctx.arc(
                p.x as f64,
                p.y as f64,
                POINT_RADIUS / scale,
                0.0,
                std::f64::consts::TAU,
            );
            ctx.fill();
        }
    }

    ctx.set_line_width(2.0 / scale);
    ctx.set_font(&format!("{}px system-ui, sans-serif", (12.0 / scale).round()));
    ctx.set_text_baseline("top");
    for (i, aoi) in aois.iter().enumerate() {
        let r = aoi.region;
        let color = css(Color::palette(i));
        ctx.set_stroke_style_str(&color);
        ctx.stroke_rect(
            r.left as f64,
            r.top as f64,
            r.width() as f64,
            r.height() as f64,
        );
        ctx.set_fill_style_str(&color);
        let _ = ctx.fill_text(&aoi.label(), r.left as f64 + 4.0, r.top as f64 + 4.0);
    }

    if let Some(b) = brush {
        ctx.set_stroke_style_str(theme.brush);
        ctx.set_line_width(1.0 / scale);
        dashed(ctx, 4.0 / scale, 4.0 / scale);
        ctx.stroke_rect(
            b.x0 as f64,
            b.y0 as f64,
            b.width() as f64,
            b.height() as f64,
        );
    }

    ctx.restore();
}

/// Draw the transition graph centered on the canvas.
pub fn render_graph(
    ctx: &CanvasRenderingContext2d,
    canvas_width: f64,
    canvas_height: f64,
    graph: &TransitionGraph,
    positions: &[(f32, f32)],
    theme: &OverlayTheme,
) {
    ctx.clear_rect(0.0, 0.0, canvas_width, canvas_height);
    ctx.save();
    let _ = ctx.translate(canvas_width / 2.0, canvas_height / 2.0);

    ctx.set_stroke_style_str(theme.link);
    for edge in &graph.edges {
        let (Some(&(sx, sy)), Some(&(tx, ty))) = (
            positions.get(edge.source_index),
            positions.get(edge.target_index),
        ) else {
            continue;
        };
        let (sx, sy, tx, ty) = (sx as f64, sy as f64, tx as f64, ty as f64);
        let len = ((tx - sx).powi(2) + (ty - sy).powi(2)).sqrt();
        if len <= NODE_RADIUS {
            continue;
        }
        // Stop at the target's rim so the arrowhead stays visible.
        let (ux, uy) = ((tx - sx) / len, (ty - sy) / len);
        let (ex, ey) = (tx - ux * NODE_RADIUS, ty - uy * NODE_RADIUS);
        ctx.set_line_width(graph.edge_width(edge.source_index, edge.target_index) as f64);
        ctx.begin_path();
        ctx.move_to(sx, sy);
        ctx.line_to(ex, ey);
        ctx.stroke();

        let head = 6.0;
        ctx.begin_path();
        ctx.move_to(ex, ey);
        ctx.line_to(ex - ux * head - uy * head / 2.0, ey - uy * head + ux * head / 2.0);
        ctx.line_to(ex - ux * head + uy * head / 2.0, ey - uy * head - ux * head / 2.0);
        ctx.close_path();
        ctx.set_fill_style_str(theme.link);
        ctx.fill();
    }

    ctx.set_font("11px system-ui, sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    for (node, &(x, y)) in graph.nodes.iter().zip(positions) {
        let (x, y) = (x as f64, y as f64);
        ctx.set_fill_style_str(&css(node.color));
        ctx.begin_path();
        let _ = ctx.arc(x, y, NODE_RADIUS, 0.0, std::f64::consts::TAU);
        ctx.fill();
        ctx.set_fill_style_str(theme.label);
        let _ = ctx.fill_text(&node.label, x, y + NODE_RADIUS + 8.0);
    }

    ctx.restore();
}
