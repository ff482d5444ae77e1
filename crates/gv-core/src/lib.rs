pub mod aoi;
pub mod density;
pub mod error;
pub mod id;
pub mod layout;
pub mod model;
pub mod parser;
pub mod scanpath;
pub mod transition;

pub use aoi::{Aoi, AoiRegistry, AoiStore, Region};
pub use density::{DensityConfig, DensityGrid, attention_density, attention_points};
pub use error::{CoreError, Result};
pub use id::{AoiId, ColorTag, ImageId, PersonId};
pub use layout::{ForceLayout, LayoutConfig};
pub use model::*;
pub use parser::parse_fixation_table;
pub use scanpath::ScanPath;
pub use transition::{
    GraphEdge, GraphNode, TransitionGraph, TransitionOutcome, build_transition_matrix,
};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::{DiGraph, NodeIndex};
