//! Transition matrix and graph derivation.
//!
//! For every member point of AOI `i`, look up the chronologically next point
//! of the same scanpath; each AOI `k != i` that has that successor as a
//! member gets `matrix[i][k] += 1`. Overlapping AOIs therefore fan out: one
//! successor inside two AOIs counts once for each of them.
//!
//! The builder is a pure function over the image data, the AOI list, and the
//! users filter. It never mutates the registry, so a failed build cannot
//! corrupt AOI state.

use crate::aoi::Aoi;
use crate::error::{CoreError, Result};
use crate::id::AoiId;
use crate::model::{Color, ImageData, UserFilter};
use petgraph::graph::DiGraph;
use serde::Serialize;

/// Edge width for a zero-weight cell, and the fallback when no transition exists at all.
pub const MIN_EDGE_WIDTH: f32 = 0.5;
/// Extra width given to the heaviest edge on top of `MIN_EDGE_WIDTH`.
pub const EDGE_WIDTH_SPAN: f32 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: AoiId,
    pub label: String,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: AoiId,
    pub target: AoiId,
    /// Dimension indices of `source` and `target`.
    pub source_index: usize,
    pub target_index: usize,
    pub weight: u32,
}

/// The derived transition graph of one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub matrix: Vec<Vec<u32>>,
    /// `0.5 + 3 * w / max` per cell; `None` when every cell is zero.
    pub normalized: Option<Vec<Vec<f32>>>,
}

/// Result of a build: a graph, or the distinct "no AOIs drawn" condition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Graph(TransitionGraph),
    NoAois,
}

impl TransitionOutcome {
    pub fn graph(&self) -> Option<&TransitionGraph> {
        match self {
            TransitionOutcome::Graph(g) => Some(g),
            TransitionOutcome::NoAois => None,
        }
    }
}

impl TransitionGraph {
    pub fn dimension(&self) -> usize {
        self.nodes.len()
    }

    /// Largest cell value; 0 for a graph without transitions.
    pub fn max_weight(&self) -> u32 {
        self.matrix
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Stroke width for the edge `i -> j`, falling back to `MIN_EDGE_WIDTH`
    /// when the matrix has no transitions to normalize against.
    pub fn edge_width(&self, i: usize, j: usize) -> f32 {
        self.normalized
            .as_ref()
            .and_then(|n| n.get(i)?.get(j).copied())
            .unwrap_or(MIN_EDGE_WIDTH)
    }

    /// Weight between two AOIs by id.
    pub fn weight(&self, source: AoiId, target: AoiId) -> Option<u32> {
        let i = self.nodes.iter().position(|n| n.id == source)?;
        let j = self.nodes.iter().position(|n| n.id == target)?;
        Some(self.matrix[i][j])
    }

    /// Convert to a petgraph `DiGraph`, one node per AOI in dimension order.
    pub fn to_digraph(&self) -> DiGraph<AoiId, u32> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let indices: Vec<_> = self.nodes.iter().map(|n| graph.add_node(n.id)).collect();
        for e in &self.edges {
            graph.add_edge(indices[e.source_index], indices[e.target_index], e.weight);
        }
        graph
    }
}

/// Build the transition matrix for `aois` over `image`, counting only
/// persons in `users`.
pub fn build_transition_matrix(
    image: &ImageData,
    aois: &[Aoi],
    users: &UserFilter,
) -> Result<TransitionOutcome> {
    let n = aois.len();
    if n == 0 {
        log::debug!("transition graph for {}: no AOIs", image.image);
        return Ok(TransitionOutcome::NoAois);
    }

    let mut matrix = vec![vec![0u32; n]; n];

    for (i, source) in aois.iter().enumerate() {
        for member in source.members() {
            let (path, _) = image.resolve(member).ok_or_else(|| {
                CoreError::MatrixBuild(format!(
                    "{} references a point that is not in the scanpaths of {}",
                    source.id, image.image
                ))
            })?;
            if !users.contains(path.person) {
                continue;
            }

            let Some(next) = image.next_point(member) else {
                continue;
            };
            let (next_path, _) = image.resolve(next).ok_or_else(|| {
                CoreError::MatrixBuild(format!("successor of a point in {} dangles", source.id))
            })?;
            if !users.contains(next_path.person) {
                continue;
            }

            for (k, target) in aois.iter().enumerate() {
                if k != i && target.has_member(next) {
                    log::trace!("transition {} -> {}", source.id, target.id);
                    matrix[i][k] += 1;
                }
            }
        }
    }

    let nodes: Vec<GraphNode> = aois
        .iter()
        .enumerate()
        .map(|(i, a)| GraphNode {
            id: a.id,
            label: a.label(),
            color: Color::palette(i),
        })
        .collect();

    let mut edges = Vec::new();
    for (i, row) in matrix.iter().enumerate() {
        for (j, &weight) in row.iter().enumerate() {
            if weight != 0 {
                edges.push(GraphEdge {
                    source: aois[i].id,
                    target: aois[j].id,
                    source_index: i,
                    target_index: j,
                    weight,
                });
            }
        }
    }

    let max = matrix
        .iter()
        .flat_map(|row| row.iter().copied())
        .max()
        .unwrap_or(0);
    let normalized = (max > 0).then(|| {
        matrix
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&w| MIN_EDGE_WIDTH + EDGE_WIDTH_SPAN * w as f32 / max as f32)
                    .collect()
            })
            .collect()
    });

    log::debug!(
        "transition graph for {}: {} nodes, {} edges, max weight {}",
        image.image,
        n,
        edges.len(),
        max
    );

    Ok(TransitionOutcome::Graph(TransitionGraph {
        nodes,
        edges,
        matrix,
        normalized,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aoi::{AoiRegistry, Region};
    use crate::id::{ColorTag, ImageId, PersonId};
    use crate::model::{PathId, Point, PointRef};
    use crate::scanpath::ScanPath;

    fn image_with(points: Vec<Point>) -> ImageData {
        let path = ScanPath::new(PersonId::intern("P"), ColorTag::intern("color"), points)
            .unwrap();
        ImageData::new(ImageId::intern("transition.jpg"), vec![path])
    }

    fn registry(image: &ImageData, regions: &[(f32, f32, f32, f32)]) -> AoiRegistry {
        let mut reg = AoiRegistry::new(image.image);
        for &(l, t, r, b) in regions {
            reg.create(image, Region::new(l, t, r, b).unwrap()).unwrap();
        }
        reg
    }

    #[test]
    fn no_aois_is_a_distinct_outcome() {
        let image = image_with(vec![Point::new(1.0, 1.0, 0.0)]);
        let users: UserFilter = [PersonId::intern("P")].into_iter().collect();
        let outcome = build_transition_matrix(&image, &[], &users).unwrap();
        assert_eq!(outcome, TransitionOutcome::NoAois);
        assert!(outcome.graph().is_none());
    }

    #[test]
    fn dangling_member_is_a_build_error() {
        let image = image_with(vec![Point::new(1.0, 1.0, 0.0)]);
        let other = ImageData::new(
            image.image,
            vec![
                ScanPath::new(
                    PersonId::intern("P"),
                    ColorTag::intern("color"),
                    vec![Point::new(1.0, 1.0, 0.0), Point::new(2.0, 2.0, 1.0)],
                )
                .unwrap(),
            ],
        );
        // Membership computed against a richer image than the one we build on.
        let reg = registry(&other, &[(0.0, 0.0, 10.0, 10.0)]);
        assert!(reg.list()[0].has_member(PointRef::new(PathId(0), 1)));

        let users: UserFilter = [PersonId::intern("P")].into_iter().collect();
        let err = build_transition_matrix(&image, reg.list(), &users).unwrap_err();
        assert!(matches!(err, CoreError::MatrixBuild(_)));
    }

    #[test]
    fn edge_width_falls_back_without_transitions() {
        let image = image_with(vec![Point::new(1.0, 1.0, 0.0)]);
        let reg = registry(&image, &[(0.0, 0.0, 10.0, 10.0), (20.0, 20.0, 30.0, 30.0)]);
        let users: UserFilter = [PersonId::intern("P")].into_iter().collect();
        let outcome = build_transition_matrix(&image, reg.list(), &users).unwrap();
        let graph = outcome.graph().unwrap();
        assert!(graph.normalized.is_none());
        assert_eq!(graph.edge_width(0, 1), MIN_EDGE_WIDTH);
        assert_eq!(graph.max_weight(), 0);
    }

    #[test]
    fn heaviest_edge_gets_full_width() {
        // A -> B twice, B -> A once.
        let image = image_with(vec![
            Point::new(5.0, 5.0, 0.0),
            Point::new(25.0, 25.0, 1.0),
            Point::new(5.0, 5.0, 2.0),
            Point::new(25.0, 25.0, 3.0),
        ]);
        let reg = registry(&image, &[(0.0, 0.0, 10.0, 10.0), (20.0, 20.0, 30.0, 30.0)]);
        let users: UserFilter = [PersonId::intern("P")].into_iter().collect();
        let outcome = build_transition_matrix(&image, reg.list(), &users).unwrap();
        let graph = outcome.graph().unwrap();
        assert_eq!(graph.matrix, vec![vec![0, 2], vec![1, 0]]);
        assert_eq!(graph.edge_width(0, 1), 3.5);
        assert_eq!(graph.edge_width(1, 0), 2.0);
        assert_eq!(graph.edge_width(0, 0), 0.5);
    }

    #[test]
    fn digraph_mirrors_edges() {
        let image = image_with(vec![Point::new(5.0, 5.0, 0.0), Point::new(25.0, 25.0, 1.0)]);
        let reg = registry(&image, &[(0.0, 0.0, 10.0, 10.0), (20.0, 20.0, 30.0, 30.0)]);
        let users: UserFilter = [PersonId::intern("P")].into_iter().collect();
        let outcome = build_transition_matrix(&image, reg.list(), &users).unwrap();
        let g = outcome.graph().unwrap().to_digraph();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        let e = g.edge_indices().next().unwrap();
        let (a, b) = g.edge_endpoints(e).unwrap();
        assert_eq!((g[a], g[b], g[e]), (AoiId(1), AoiId(2), 1));
    }
}
