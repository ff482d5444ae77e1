//! Attention-map density estimation.
//!
//! Points of the selected persons are blurred with a gaussian kernel onto a
//! coarse grid covering the image. When the image has AOIs, only points that
//! fall inside at least one AOI contribute. The renderer turns the grid into
//! contours colored from transparent up to the session color.

use crate::aoi::Aoi;
use crate::model::{ImageData, ImageSize, UserFilter};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityConfig {
    /// Kernel standard deviation in image pixels.
    pub bandwidth: f32,
    /// Grid cell edge in image pixels.
    pub cell_size: u32,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            bandwidth: 20.0,
            cell_size: 4,
        }
    }
}

/// Row-major density grid. Cell `(col, row)` covers
/// `[col * cell_size, (col + 1) * cell_size)` horizontally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityGrid {
    pub columns: usize,
    pub rows: usize,
    pub cell_size: u32,
    pub values: Vec<f32>,
    pub max: f32,
}

impl DensityGrid {
    pub fn value(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.columns || row >= self.rows {
            return None;
        }
        self.values.get(row * self.columns + col).copied()
    }

    /// Value at an image-space position.
    pub fn value_at(&self, x: f32, y: f32) -> Option<f32> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let cell = self.cell_size as f32;
        self.value((x / cell) as usize, (y / cell) as usize)
    }
}

/// Positions that feed the attention map: points of persons in `users`,
/// restricted to AOI interiors when any AOI exists.
pub fn attention_points(image: &ImageData, aois: &[Aoi], users: &UserFilter) -> Vec<(f32, f32)> {
    image
        .scan_paths()
        .iter()
        .filter(|path| users.contains(path.person))
        .flat_map(|path| path.points().iter())
        .filter(|p| aois.is_empty() || aois.iter().any(|a| a.includes_point(p)))
        .map(|p| (p.x, p.y))
        .collect()
}

/// Gaussian kernel density of `points` over an image of `size`.
pub fn attention_density(
    points: &[(f32, f32)],
    size: ImageSize,
    config: DensityConfig,
) -> DensityGrid {
    let size = size.sanitized();
    let cell = config.cell_size.max(1);
    let cell_f = cell as f32;
    let columns = (size.width / cell_f).ceil() as usize;
    let rows = (size.height / cell_f).ceil() as usize;
    let mut values = vec![0.0f32; columns * rows];

    let sigma = config.bandwidth.max(f32::EPSILON);
    let two_sigma_sq = 2.0 * sigma * sigma;
    let norm = 1.0 / (std::f32::consts::PI * two_sigma_sq);
    // Beyond three standard deviations the kernel is negligible.
    let reach = ((3.0 * sigma) / cell_f).ceil() as isize;

    for &(px, py) in points {
        let center_col = (px / cell_f).floor() as isize;
        let center_row = (py / cell_f).floor() as isize;
        for row in (center_row - reach)..=(center_row + reach) {
            if row < 0 || row as usize >= rows {
                continue;
            }
            let cy = (row as f32 + 0.5) * cell_f;
            for col in (center_col - reach)..=(center_col + reach) {
                if col < 0 || col as usize >= columns {
                    continue;
                }
                let cx = (col as f32 + 0.5) * cell_f;
                let d2 = (cx - px).powi(2) + (cy - py).powi(2);
                values[row as usize * columns + col as usize] += norm * (-d2 / two_sigma_sq).exp();
            }
        }
    }

    let max = values.iter().copied().fold(0.0f32, f32::max);
    log::debug!(
        "density grid {columns}x{rows} from {} points, max {max}",
        points.len()
    );

    DensityGrid {
        columns,
        rows,
        cell_size: cell,
        values,
        max,
    }
}
