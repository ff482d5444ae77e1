//! WASM bridge for GazeViz: exposes the AOI editor and derived views to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. Methods that can fail return
//! a JSON envelope: `{"ok":true,...}` or `{"ok":false,"error":"..."}`.

mod render2d;

use gv_core::{AoiId, Color, Dataset, ImageId, ImageSize, PersonId, UserFilter};
use gv_editor::input::{InputEvent, PointerButton};
use gv_editor::views::ViewStatus;
use gv_editor::{EditorConfig, EditorSession, ViewKind};
use render2d::{OverlayTheme, render_editor, render_graph};
use serde_json::{Value, json};
use std::fmt::Display;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The browser-facing session controller.
///
/// Holds the editor session and overlay theme. All interaction from the
/// page goes through this struct.
#[wasm_bindgen]
pub struct GazeSession {
    session: EditorSession,
    theme: OverlayTheme,
}

#[wasm_bindgen]
impl GazeSession {
    /// Create an empty session. `config_json` may override any field of the
    /// editor configuration; invalid JSON falls back to the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Self {
        // Set up panic hook for better error messages in console
        console_error_panic_hook_setup();

        let config = match config_json.as_deref() {
            Some(text) => serde_json::from_str(text).unwrap_or_else(|e| {
                log::warn!("ignoring invalid editor config: {e}");
                EditorConfig::default()
            }),
            None => EditorConfig::default(),
        };
        Self {
            session: EditorSession::new(Dataset::new(), config),
            theme: OverlayTheme::default(),
        }
    }

    // ─── Dataset & properties ────────────────────────────────────────────

    /// Load a tab-separated fixation export. Returns
    /// `{"ok":true,"images":[...],"persons":[...]}`.
    pub fn load_fixations(&mut self, text: &str) -> String {
        match gv_core::parse_fixation_table(text) {
            Ok(dataset) => {
                self.session.load_dataset(dataset);
                ok(json!({
                    "images": self.session.context().dataset().images(),
                    "persons": self.session.context().dataset().persons(),
                }))
            }
            Err(e) => error(e),
        }
    }

    /// Image names as a JSON array.
    pub fn images(&self) -> String {
        json!(self.session.context().dataset().images()).to_string()
    }

    /// Person names as a JSON array.
    pub fn persons(&self) -> String {
        json!(self.session.context().dataset().persons()).to_string()
    }

    /// Select an image by name; an empty name deselects.
    pub fn set_image(&mut self, name: &str) -> String {
        let image = (!name.is_empty()).then(|| ImageId::intern(name));
        match self.session.select_image(image) {
            Ok(()) => ok(json!({})),
            Err(e) => error(e),
        }
    }

    /// Report the natural size of the loaded `<img>`.
    pub fn set_image_size(&mut self, width: f32, height: f32) {
        self.session.set_image_size(ImageSize { width, height });
    }

    /// Replace the users filter with the given person names.
    pub fn set_users(&mut self, names: Vec<String>) {
        let users: UserFilter = names.iter().map(|n| PersonId::intern(n)).collect();
        self.session.context_mut().set_users(users);
    }

    pub fn enable_all_users(&mut self) {
        let all = UserFilter::all(self.session.context().dataset());
        self.session.context_mut().set_users(all);
    }

    pub fn toggle_user(&mut self, name: &str, included: bool) {
        self.session
            .context_mut()
            .toggle_user(PersonId::intern(name), included);
    }

    /// Current users filter as a sorted JSON array.
    pub fn users(&self) -> String {
        json!(self.session.context().users().sorted()).to_string()
    }

    /// Set the attention-map color from 0–255 channels and a 0–1 alpha.
    pub fn set_color(&mut self, r: u8, g: u8, b: u8, a: f32) {
        self.session
            .context_mut()
            .set_color(Color::from_rgba8(r, g, b, a));
    }

    /// Set the attention-map color from `#RRGGBB[AA]`. Returns `false` on bad input.
    pub fn set_color_hex(&mut self, hex: &str) -> bool {
        match Color::from_hex(hex) {
            Some(color) => {
                self.session.context_mut().set_color(color);
                true
            }
            None => false,
        }
    }

    pub fn color(&self) -> String {
        self.session.context().color().to_hex()
    }

    // ─── Brush ───────────────────────────────────────────────────────────

    /// Pointer events in image pixel coordinates. Return `true` when the
    /// brush changed and the editor needs a redraw.
    pub fn handle_pointer_down(&mut self, x: f32, y: f32, button: i16) -> bool {
        self.session.handle_input(&InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
        })
    }

    pub fn handle_pointer_move(&mut self, x: f32, y: f32) -> bool {
        self.session
            .handle_input(&InputEvent::PointerMove { x, y })
    }

    pub fn handle_pointer_up(&mut self, x: f32, y: f32) -> bool {
        self.session.handle_input(&InputEvent::PointerUp { x, y })
    }

    pub fn brush_start(&mut self) {
        self.session.start_brush();
    }

    pub fn brush_clear(&mut self) {
        self.session.clear_brush();
    }

    /// Whether the "Add AOI" action should be offered.
    pub fn can_add_aoi(&self) -> bool {
        self.session.brush().can_add_aoi()
    }

    /// `{"ok":true,"selection":{x0,y0,x1,y1}|null,"points":[...]}`.
    pub fn brush_json(&self) -> String {
        match self.session.selected_points() {
            Ok(points) => ok(json!({
                "selection": self.session.brush_selection(),
                "points": points,
            })),
            Err(e) => error(e),
        }
    }

    // ─── AOI edits ───────────────────────────────────────────────────────

    /// Create an AOI from the brush. `{"ok":true,"id":3}`, with a null id
    /// when the brush was too small.
    pub fn add_aoi(&mut self) -> String {
        match self.session.add_aoi() {
            Ok(id) => ok(json!({ "id": id })),
            Err(e) => error(e),
        }
    }

    pub fn delete_aoi(&mut self, id: u32) -> String {
        match self.session.delete_aoi(AoiId(id)) {
            Ok(()) => ok(json!({ "id": id })),
            Err(e) => error(e),
        }
    }

    /// Delete the topmost AOI under the pointer.
    pub fn delete_aoi_at(&mut self, x: f32, y: f32) -> String {
        match self.session.delete_aoi_at(x, y) {
            Ok(id) => ok(json!({ "id": id })),
            Err(e) => error(e),
        }
    }

    pub fn clear_aois(&mut self) -> String {
        match self.session.clear_aois() {
            Ok(()) => ok(json!({})),
            Err(e) => error(e),
        }
    }

    /// `{"ok":true,"undone":"delete AOI"}`, with null when nothing to undo.
    pub fn undo(&mut self) -> String {
        match self.session.undo() {
            Ok(desc) => ok(json!({ "undone": desc })),
            Err(e) => error(e),
        }
    }

    pub fn redo(&mut self) -> String {
        match self.session.redo() {
            Ok(desc) => ok(json!({ "redone": desc })),
            Err(e) => error(e),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    /// AOIs of the current image as a JSON array.
    pub fn list_aois(&self) -> String {
        let aois: Vec<Value> = self
            .session
            .context()
            .list_aois()
            .iter()
            .enumerate()
            .map(|(i, a)| {
                json!({
                    "id": a.id,
                    "key": a.id.key(),
                    "label": a.label(),
                    "left": a.region.left,
                    "top": a.region.top,
                    "right": a.region.right,
                    "bottom": a.region.bottom,
                    "color": Color::palette(i).to_hex(),
                    "points": a.members().collect::<Vec<_>>(),
                })
            })
            .collect();
        Value::Array(aois).to_string()
    }

    /// Points belonging to at least one AOI, as a JSON array.
    pub fn points_under_aois(&self) -> String {
        json!(self.session.points_under_aois()).to_string()
    }

    // ─── Derived views ───────────────────────────────────────────────────

    /// Re-derive the transition graph if needed and return it:
    /// `{"ok":true,"status":"rendered","nodes":[...],"links":[...],"matrix":[...]}`,
    /// `{"ok":true,"status":"no_aois"}`, or an error envelope. An error is
    /// reported once and then acknowledged.
    pub fn transition_graph(&mut self) -> String {
        match self.session.refresh_transition_graph().clone() {
            ViewStatus::Rendered => match self.session.transition_graph() {
                Some(scene) => {
                    let positions = scene.layout.positions();
                    let nodes: Vec<Value> = scene
                        .graph
                        .nodes
                        .iter()
                        .zip(&positions)
                        .map(|(n, &(x, y))| {
                            json!({
                                "id": n.id.key(),
                                "label": n.label,
                                "color": n.color.to_hex(),
                                "x": x,
                                "y": y,
                            })
                        })
                        .collect();
                    let links: Vec<Value> = scene
                        .graph
                        .edges
                        .iter()
                        .map(|e| {
                            json!({
                                "source": e.source.key(),
                                "target": e.target.key(),
                                "weight": e.weight,
                                "width": scene.graph.edge_width(e.source_index, e.target_index),
                            })
                        })
                        .collect();
                    ok(json!({
                        "status": "rendered",
                        "nodes": nodes,
                        "links": links,
                        "matrix": scene.graph.matrix,
                    }))
                }
                None => ok(json!({ "status": "idle" })),
            },
            ViewStatus::NoAois => ok(json!({ "status": "no_aois" })),
            ViewStatus::Error(message) => {
                self.session.acknowledge(ViewKind::TransitionGraph);
                error(message)
            }
            ViewStatus::Idle | ViewStatus::Loading { .. } => ok(json!({ "status": "idle" })),
        }
    }

    /// Advance the graph layout one tick. `false` once it has settled.
    pub fn tick_layout(&mut self) -> bool {
        self.session.tick_layout()
    }

    /// Node positions as `[[x,y],...]`.
    pub fn layout_positions(&self) -> String {
        let positions = self
            .session
            .transition_graph()
            .map(|scene| scene.layout.positions())
            .unwrap_or_default();
        json!(positions).to_string()
    }

    pub fn pin_node(&mut self, index: usize, x: f32, y: f32) {
        self.session.pin_node(index, x, y);
    }

    pub fn unpin_node(&mut self, index: usize) {
        self.session.unpin_node(index);
    }

    /// Re-derive the attention map if needed and return its density grid.
    pub fn attention_map(&mut self) -> String {
        match self.session.refresh_attention_map().clone() {
            ViewStatus::Rendered => match self.session.attention_map() {
                Some(grid) => ok(json!({
                    "status": "rendered",
                    "columns": grid.columns,
                    "rows": grid.rows,
                    "cellSize": grid.cell_size,
                    "max": grid.max,
                    "values": grid.values,
                    "color": self.session.context().color().to_hex(),
                })),
                None => ok(json!({ "status": "idle" })),
            },
            ViewStatus::Error(message) => {
                self.session.acknowledge(ViewKind::AttentionMap);
                error(message)
            }
            _ => ok(json!({ "status": "idle" })),
        }
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Draw the editor overlay: points, AOIs, and the brush.
    pub fn render_editor(&self, ctx: &CanvasRenderingContext2d, width: f64, height: f64, scale: f64) {
        let snapshot = self.session.context().snapshot();
        let image = snapshot.image_data().ok().flatten();
        let selected = self.session.selected_points().unwrap_or_default();
        render_editor(
            ctx,
            width,
            height,
            scale,
            image,
            snapshot.aois,
            self.session.brush_selection(),
            &selected,
            &self.theme,
        );
    }

    /// Draw the transition graph at its current layout positions.
    pub fn render_graph(&self, ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
        if let Some(scene) = self.session.transition_graph() {
            render_graph(
                ctx,
                width,
                height,
                &scene.graph,
                &scene.layout.positions(),
                &self.theme,
            );
        }
    }
}

// ─── JSON envelopes ──────────────────────────────────────────────────────

fn ok(body: Value) -> String {
    let mut envelope = json!({ "ok": true });
    if let (Value::Object(out), Value::Object(fields)) = (&mut envelope, body) {
        out.extend(fields);
    }
    envelope.to_string()
}

fn error(e: impl Display) -> String {
    json!({ "ok": false, "error": e.to_string() }).to_string()
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("GazeViz WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no session needed) ────────────────────────────

/// URL of a stimulus image: `<base>/images/<image>`.
#[wasm_bindgen]
pub fn image_url(base: &str, image: &str) -> String {
    format!("{}/images/{}", base.trim_end_matches('/'), image)
}

/// Check a fixation export without loading it.
/// Returns `{"ok":true,"images":n,"points":n}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_fixations(text: &str) -> String {
    match gv_core::parse_fixation_table(text) {
        Ok(dataset) => {
            let points: usize = dataset
                .images()
                .iter()
                .filter_map(|&i| dataset.image(i))
                .map(|d| d.point_count())
                .sum();
            ok(json!({ "images": dataset.images().len(), "points": points }))
        }
        Err(e) => error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE: &str = "Timestamp\tStimuliName\tMappedFixationPointX\tMappedFixationPointY\tuser\n\
                         0\tbridge.jpg\t50\t50\tP\n\
                         1\tbridge.jpg\t250\t250\tP\n\
                         2\tbridge.jpg\t50\t50\tP\n";

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    fn loaded() -> GazeSession {
        let mut gs = GazeSession::new(None);
        assert_eq!(parse(&gs.load_fixations(TABLE))["ok"], true);
        assert_eq!(parse(&gs.set_image("bridge.jpg"))["ok"], true);
        gs
    }

    fn draw(gs: &mut GazeSession, x0: f32, y0: f32, x1: f32, y1: f32) -> Value {
        gs.handle_pointer_down(x0, y0, 0);
        gs.handle_pointer_move(x1, y1);
        gs.handle_pointer_up(x1, y1);
        parse(&gs.add_aoi())
    }

    #[test]
    fn image_url_convention() {
        assert_eq!(image_url("/data/set1/", "a b.jpg"), "/data/set1/images/a b.jpg");
        assert_eq!(image_url("", "x.jpg"), "/images/x.jpg");
    }

    #[test]
    fn validate_reports_errors_as_envelope() {
        let v = parse(&validate_fixations("nope\n"));
        assert_eq!(v["ok"], false);
        assert!(v["error"].as_str().unwrap().contains("missing column"));
        let v = parse(&validate_fixations(TABLE));
        assert_eq!(v, json!({ "ok": true, "images": 1, "points": 3 }));
    }

    #[test]
    fn config_json_overrides_defaults() {
        let mut gs = GazeSession::new(Some(r#"{"min_aoi_size": 10.0}"#.to_string()));
        gs.load_fixations(TABLE);
        gs.set_image("bridge.jpg");
        let v = draw(&mut gs, 0.0, 0.0, 20.0, 20.0);
        assert_eq!(v["id"], 1);
    }

    #[test]
    fn pointer_survives_bad_size_and_margin() {
        let mut gs = GazeSession::new(None);
        gs.set_image_size(f32::NAN, 300.0);
        assert!(gs.handle_pointer_down(10.0, 10.0, 0));

        let mut gs = GazeSession::new(Some(r#"{"brush_margin": -1000.0}"#.to_string()));
        assert!(gs.handle_pointer_down(10.0, 10.0, 0));
        assert!(gs.handle_pointer_move(-40.0, 80.0));
        assert_eq!(parse(&gs.brush_json())["selection"]["x0"], 0.0);
    }

    #[test]
    fn graph_round_trip_through_json() {
        let mut gs = loaded();
        assert_eq!(parse(&gs.transition_graph())["status"], "no_aois");

        assert_eq!(draw(&mut gs, 0.0, 0.0, 100.0, 100.0)["id"], 1);
        assert_eq!(draw(&mut gs, 200.0, 200.0, 300.0, 300.0)["id"], 2);

        let v = parse(&gs.transition_graph());
        assert_eq!(v["status"], "rendered");
        assert_eq!(v["matrix"], json!([[0, 1], [1, 0]]));
        assert_eq!(v["nodes"][0]["id"], "aoi1");
        assert_eq!(v["nodes"][1]["label"], "AOI2");
        assert_eq!(v["links"][0]["source"], "aoi1");
        assert_eq!(v["links"][0]["width"], 3.5);
    }

    #[test]
    fn small_brush_returns_null_id() {
        let mut gs = loaded();
        assert!(!gs.can_add_aoi());
        let v = draw(&mut gs, 0.0, 0.0, 30.0, 30.0);
        assert_eq!(v, json!({ "ok": true, "id": null }));
    }

    #[test]
    fn delete_and_undo_via_bridge() {
        let mut gs = loaded();
        draw(&mut gs, 0.0, 0.0, 100.0, 100.0);
        assert_eq!(parse(&gs.delete_aoi_at(10.0, 10.0))["id"], 1);
        assert_eq!(parse(&gs.list_aois()), json!([]));
        assert_eq!(parse(&gs.undo())["undone"], "delete AOI");
        let aois = parse(&gs.list_aois());
        assert_eq!(aois[0]["key"], "aoi1");
        assert_eq!(aois[0]["color"], "#1F77B4");
        assert_eq!(aois[0]["points"].as_array().unwrap().len(), 2);

        let v = parse(&gs.delete_aoi(7));
        assert_eq!(v["ok"], false);
    }

    #[test]
    fn unknown_image_is_an_error_envelope() {
        let mut gs = loaded();
        let v = parse(&gs.set_image("elsewhere.jpg"));
        assert_eq!(v["ok"], false);
        assert_eq!(parse(&gs.set_image(""))["ok"], true);
        assert_eq!(parse(&gs.attention_map())["status"], "idle");
    }

    #[test]
    fn attention_map_carries_color() {
        let mut gs = loaded();
        assert!(gs.set_color_hex("#00FF00"));
        assert!(!gs.set_color_hex("green"));
        let v = parse(&gs.attention_map());
        assert_eq!(v["status"], "rendered");
        assert_eq!(v["color"], "#00FF00");
        assert!(v["max"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn user_toggles() {
        let mut gs = loaded();
        assert_eq!(parse(&gs.users()), json!(["P"]));
        gs.toggle_user("P", false);
        assert_eq!(parse(&gs.users()), json!([]));
        gs.enable_all_users();
        assert_eq!(parse(&gs.users()), json!(["P"]));
    }
}
