//! Editor configuration. Every field has a default, so a partial JSON
//! object is enough to override a single setting.

use gv_core::{DensityConfig, LayoutConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// A brush must be strictly wider and taller than this to become an AOI.
    pub min_aoi_size: f32,
    /// How far the brush may extend past the image edges, in pixels.
    pub brush_margin: f32,
    /// Maximum undo depth.
    pub undo_depth: usize,
    pub density: DensityConfig,
    pub layout: LayoutConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_aoi_size: 50.0,
            brush_margin: 100.0,
            undo_depth: 100,
            density: DensityConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_editor_behaviour() {
        let cfg = EditorConfig::default();
        assert_eq!(cfg.min_aoi_size, 50.0);
        assert_eq!(cfg.brush_margin, 100.0);
        assert_eq!(cfg.density.bandwidth, 20.0);
        assert_eq!(cfg.layout.charge, -1000.0);
    }

    #[test]
    fn survives_msgpack_round_trip() {
        let cfg = EditorConfig {
            min_aoi_size: 20.0,
            ..EditorConfig::default()
        };
        let bytes = rmp_serde::to_vec_named(&cfg).unwrap();
        let back: EditorConfig = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, cfg);
    }
}
