//! Force-directed layout for the transition graph.
//!
//! A small velocity-Verlet simulation with the forces the graph view uses:
//! link springs along edges, many-body repulsion between all nodes, and weak
//! x/y forces pulling everything toward the origin. The simulation advances
//! one `tick()` at a time so a caller can yield between ticks; `run()` drives
//! it until `alpha` cools below `alpha_min`.

use crate::transition::TransitionGraph;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Many-body strength; negative repels.
    pub charge: f32,
    pub link_distance: f32,
    /// Strength of the x/y centering forces.
    pub center_strength: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let alpha_min: f32 = 0.001;
        Self {
            charge: -1000.0,
            link_distance: 30.0,
            center_strength: 0.1,
            alpha_min,
            // Cools from 1.0 to alpha_min in 300 ticks.
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutNode {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Pinned position while the user drags the node.
    pub fixed: Option<(f32, f32)>,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    target: usize,
    strength: f32,
    bias: f32,
}

#[derive(Debug, Clone)]
pub struct ForceLayout {
    nodes: Vec<LayoutNode>,
    links: Vec<Link>,
    config: LayoutConfig,
    alpha: f32,
    alpha_target: f32,
}

impl ForceLayout {
    /// Lay out `graph`'s nodes; node `i` corresponds to dimension `i`.
    pub fn for_graph(graph: &TransitionGraph, config: LayoutConfig) -> Self {
        let pairs: Vec<(usize, usize)> = graph
            .edges
            .iter()
            .map(|e| (e.source_index, e.target_index))
            .collect();
        Self::new(graph.dimension(), &pairs, config)
    }

    pub fn new(node_count: usize, edges: &[(usize, usize)], config: LayoutConfig) -> Self {
        // Phyllotaxis spiral: deterministic, evenly spread starting points.
        let golden = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
        let nodes = (0..node_count)
            .map(|i| {
                let radius = 10.0 * (0.5 + i as f32).sqrt();
                let angle = i as f32 * golden;
                LayoutNode {
                    x: radius * angle.cos(),
                    y: radius * angle.sin(),
                    vx: 0.0,
                    vy: 0.0,
                    fixed: None,
                }
            })
            .collect();

        let mut degree = vec![0usize; node_count];
        let edges: Vec<(usize, usize)> = edges
            .iter()
            .copied()
            .filter(|&(s, t)| s < node_count && t < node_count)
            .collect();
        for &(s, t) in &edges {
            degree[s] += 1;
            degree[t] += 1;
        }
        let links = edges
            .iter()
            .map(|&(s, t)| {
                let (ds, dt) = (degree[s] as f32, degree[t] as f32);
                Link {
                    source: s,
                    target: t,
                    strength: 1.0 / ds.min(dt),
                    bias: ds / (ds + dt),
                }
            })
            .collect();

        Self {
            nodes,
            links,
            config,
            alpha: 1.0,
            alpha_target: 0.0,
        }
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn positions(&self) -> Vec<(f32, f32)> {
        self.nodes.iter().map(|n| (n.x, n.y)).collect()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        self.alpha >= self.config.alpha_min
    }

    /// Pin a node while it is dragged and reheat the simulation.
    pub fn pin(&mut self, index: usize, x: f32, y: f32) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.fixed = Some((x, y));
            self.alpha_target = 0.3;
            self.alpha = self.alpha.max(0.3);
        }
    }

    /// Release a dragged node and let the simulation cool down again.
    pub fn unpin(&mut self, index: usize) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.fixed = None;
        }
        self.alpha_target = 0.0;
    }

    /// Advance one step. Returns `true` while the simulation is still hot.
    pub fn tick(&mut self) -> bool {
        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        let alpha = self.alpha;

        self.apply_links(alpha);
        self.apply_charge(alpha);
        let k = self.config.center_strength * alpha;
        for node in &mut self.nodes {
            node.vx -= node.x * k;
            node.vy -= node.y * k;
        }

        let keep = 1.0 - self.config.velocity_decay;
        for node in &mut self.nodes {
            if let Some((fx, fy)) = node.fixed {
                node.x = fx;
                node.y = fy;
                node.vx = 0.0;
                node.vy = 0.0;
            } else {
                node.vx *= keep;
                node.vy *= keep;
                node.x += node.vx;
                node.y += node.vy;
            }
        }

        self.is_running()
    }

    /// Tick until cool. Returns the number of ticks taken.
    pub fn run(&mut self) -> usize {
        let mut ticks = 0;
        // A pinned node holds alpha at alpha_target; bound the loop.
        let limit = 10_000;
        while ticks < limit && self.tick() {
            ticks += 1;
        }
        ticks
    }

    fn apply_links(&mut self, alpha: f32) {
        for link in &self.links {
            let (s, t) = (self.nodes[link.source], self.nodes[link.target]);
            let mut dx = t.x + t.vx - s.x - s.vx;
            let mut dy = t.y + t.vy - s.y - s.vy;
            if dx == 0.0 && dy == 0.0 {
                dx = 1e-6;
            }
            let len = (dx * dx + dy * dy).sqrt();
            let f = (len - self.config.link_distance) / len * alpha * link.strength;
            dx *= f;
            dy *= f;
            let target = &mut self.nodes[link.target];
            target.vx -= dx * link.bias;
            target.vy -= dy * link.bias;
            let source = &mut self.nodes[link.source];
            source.vx += dx * (1.0 - link.bias);
            source.vy += dy * (1.0 - link.bias);
        }
    }

    fn apply_charge(&mut self, alpha: f32) {
        let n = self.nodes.len();
        let mut deltas = vec![(0.0f32, 0.0f32); n];
        for (i, delta) in deltas.iter_mut().enumerate() {
            let node = self.nodes[i];
            for (j, other) in self.nodes.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mut dx = other.x - node.x;
                let dy = other.y - node.y;
                if dx == 0.0 && dy == 0.0 {
                    dx = 1e-6 * (j as f32 - i as f32);
                }
                let mut l2 = dx * dx + dy * dy;
                // Soften very close pairs (distanceMin = 1).
                if l2 < 1.0 {
                    l2 = l2.sqrt();
                }
                let w = self.config.charge * alpha / l2;
                delta.0 += dx * w;
                delta.1 += dy * w;
            }
        }
        for (node, (dvx, dvy)) in self.nodes.iter_mut().zip(deltas) {
            node.vx += dvx;
            node.vy += dvy;
        }
    }
}
