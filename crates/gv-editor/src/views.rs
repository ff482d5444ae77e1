//! View instances and their derivation state.
//!
//! A view re-derives its output from a `Snapshot` whenever a property it
//! listens to changes. Each derivation is tagged with a generation; a newer
//! `begin()` supersedes any derivation still in flight, and a result that
//! arrives for a superseded generation is dropped (last write wins).
//!
//! Failures never touch the context. They move the view to
//! `ViewStatus::Error`, which stays visible until `acknowledge()`.

use crate::context::{PropertyKey, SessionContext, Snapshot, ViewKind};
use crate::error::Result;
use gv_core::{
    DensityConfig, DensityGrid, ForceLayout, LayoutConfig, TransitionGraph, TransitionOutcome,
    attention_density, attention_points, build_transition_matrix,
};
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ViewStatus {
    /// Nothing to show (no image selected, or an error was acknowledged).
    Idle,
    Loading { generation: u64 },
    Rendered,
    /// The image has no AOIs; the view shows a prompt instead of a graph.
    NoAois,
    Error(String),
}

/// What a derivation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Derived<T> {
    Ready(T),
    NoAois,
    /// No image selected.
    Nothing,
}

/// Handle for one derivation, returned by `begin()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "pass the ticket to `finish` to publish the result"]
pub struct BuildTicket {
    generation: u64,
}

impl BuildTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct ViewInstance<T> {
    kind: ViewKind,
    status: ViewStatus,
    generation: u64,
    output: Option<T>,
    /// Set by context listeners, cleared by `begin()`.
    dirty: Rc<Cell<bool>>,
}

impl<T> ViewInstance<T> {
    /// A fresh view; dirty so the first refresh derives.
    pub fn new(kind: ViewKind) -> Self {
        Self {
            kind,
            status: ViewStatus::Idle,
            generation: 0,
            output: None,
            dirty: Rc::new(Cell::new(true)),
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    /// Subscribe to `keys`; any change marks the view dirty.
    pub fn attach(&self, ctx: &mut SessionContext, keys: &[PropertyKey]) {
        for &key in keys {
            let dirty = Rc::clone(&self.dirty);
            ctx.set_listener(self.kind, key, move |_, _| dirty.set(true));
        }
    }

    /// Unsubscribe, as when the view is removed from the page.
    pub fn detach(&self, ctx: &mut SessionContext) {
        ctx.remove_listeners(self.kind);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn output(&self) -> Option<&T> {
        self.output.as_ref()
    }

    pub fn output_mut(&mut self) -> Option<&mut T> {
        self.output.as_mut()
    }

    /// Start a derivation, superseding any in flight.
    pub fn begin(&mut self) -> BuildTicket {
        self.generation += 1;
        self.dirty.set(false);
        self.status = ViewStatus::Loading {
            generation: self.generation,
        };
        BuildTicket {
            generation: self.generation,
        }
    }

    /// Publish a derivation result. Returns `false` and discards the result
    /// when `ticket` has been superseded.
    pub fn finish(&mut self, ticket: BuildTicket, result: Result<Derived<T>>) -> bool {
        if ticket.generation != self.generation {
            log::debug!(
                "{:?}: dropping stale generation {} (current {})",
                self.kind,
                ticket.generation,
                self.generation
            );
            return false;
        }
        match result {
            Ok(Derived::Ready(output)) => {
                self.output = Some(output);
                self.status = ViewStatus::Rendered;
            }
            Ok(Derived::NoAois) => {
                self.output = None;
                self.status = ViewStatus::NoAois;
            }
            Ok(Derived::Nothing) => {
                self.output = None;
                self.status = ViewStatus::Idle;
            }
            Err(err) => {
                log::warn!("{:?}: derivation failed: {err}", self.kind);
                self.output = None;
                self.status = ViewStatus::Error(err.to_string());
            }
        }
        true
    }

    /// Dismiss a surfaced error. Returns the message that was shown.
    pub fn acknowledge(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.status, ViewStatus::Idle) {
            ViewStatus::Error(message) => Some(message),
            other => {
                self.status = other;
                None
            }
        }
    }
}

// ─── Transition graph ────────────────────────────────────────────────────

/// A built graph with its layout simulation.
#[derive(Debug, Clone)]
pub struct GraphScene {
    pub graph: TransitionGraph,
    pub layout: ForceLayout,
}

pub fn derive_transition_graph(snapshot: &Snapshot<'_>) -> Result<Derived<TransitionGraph>> {
    let Some(image) = snapshot.image_data()? else {
        return Ok(Derived::Nothing);
    };
    Ok(
        match build_transition_matrix(image, snapshot.aois, snapshot.users)? {
            TransitionOutcome::Graph(graph) => Derived::Ready(graph),
            TransitionOutcome::NoAois => Derived::NoAois,
        },
    )
}

pub struct TransitionGraphView {
    instance: ViewInstance<GraphScene>,
    layout: LayoutConfig,
}

impl TransitionGraphView {
    pub const KEYS: [PropertyKey; 4] = [
        PropertyKey::Dataset,
        PropertyKey::Image,
        PropertyKey::Users,
        PropertyKey::Aoi,
    ];

    pub fn new(ctx: &mut SessionContext, layout: LayoutConfig) -> Self {
        let instance = ViewInstance::new(ViewKind::TransitionGraph);
        instance.attach(ctx, &Self::KEYS);
        Self { instance, layout }
    }

    pub fn instance(&self) -> &ViewInstance<GraphScene> {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut ViewInstance<GraphScene> {
        &mut self.instance
    }

    /// Re-derive if dirty. The layout starts hot; drive it with `tick()`.
    pub fn refresh(&mut self, snapshot: &Snapshot<'_>) -> &ViewStatus {
        if self.instance.is_dirty() {
            let ticket = self.instance.begin();
            let layout = self.layout;
            let result = derive_transition_graph(snapshot).map(|derived| match derived {
                Derived::Ready(graph) => Derived::Ready(GraphScene {
                    layout: ForceLayout::for_graph(&graph, layout),
                    graph,
                }),
                Derived::NoAois => Derived::NoAois,
                Derived::Nothing => Derived::Nothing,
            });
            self.instance.finish(ticket, result);
        }
        self.instance.status()
    }

    /// Advance the layout one step. `false` once it has cooled.
    pub fn tick(&mut self) -> bool {
        self.instance
            .output_mut()
            .is_some_and(|scene| scene.layout.tick())
    }
}

// ─── Attention map ───────────────────────────────────────────────────────

pub fn derive_attention_map(
    snapshot: &Snapshot<'_>,
    config: DensityConfig,
) -> Result<Derived<DensityGrid>> {
    let Some(image) = snapshot.image_data()? else {
        return Ok(Derived::Nothing);
    };
    let points = attention_points(image, snapshot.aois, snapshot.users);
    Ok(Derived::Ready(attention_density(
        &points,
        snapshot.image_size,
        config,
    )))
}

pub struct AttentionMapView {
    instance: ViewInstance<DensityGrid>,
    config: DensityConfig,
}

impl AttentionMapView {
    pub const KEYS: [PropertyKey; 5] = [
        PropertyKey::Dataset,
        PropertyKey::Image,
        PropertyKey::Users,
        PropertyKey::Color,
        PropertyKey::Aoi,
    ];

    pub fn new(ctx: &mut SessionContext, config: DensityConfig) -> Self {
        let instance = ViewInstance::new(ViewKind::AttentionMap);
        instance.attach(ctx, &Self::KEYS);
        Self { instance, config }
    }

    pub fn instance(&self) -> &ViewInstance<DensityGrid> {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut ViewInstance<DensityGrid> {
        &mut self.instance
    }

    pub fn refresh(&mut self, snapshot: &Snapshot<'_>) -> &ViewStatus {
        if self.instance.is_dirty() {
            let ticket = self.instance.begin();
            let result = derive_attention_map(snapshot, self.config);
            self.instance.finish(ticket, result);
        }
        self.instance.status()
    }
}
