// density.rs - Block-averaged darkness field over a grid of cells

use crate::error_handling::{invalid, Result};
use crate::raster::{GrayBuffer, NEUTRAL};

/// One density per cell in [0,1], 1 = darkest. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityField {
    cols: u32,
    rows: u32,
    values: Vec<f64>,
}

impl DensityField {
    /// Average each cell's pixel block and invert it.
    ///
    /// Blocks are non-overlapping; when the grid is finer than the image,
    /// a block is widened to one pixel so every cell samples something.
    pub fn from_image(image: &GrayBuffer, cols: u32, rows: u32) -> Result<Self> {
        if cols == 0 || rows == 0 {
            return Err(invalid("grid", format!("{cols}x{rows} has no cells")));
        }
        let (w, h) = (image.width() as u64, image.height() as u64);
        let mut values = Vec::with_capacity(cols as usize * rows as usize);
        for r in 0..rows as u64 {
            let y0 = (r * h / rows as u64) as u32;
            let y1 = (((r + 1) * h / rows as u64) as u32).max(y0 + 1);
            for c in 0..cols as u64 {
                let x0 = (c * w / cols as u64) as u32;
                let x1 = (((c + 1) * w / cols as u64) as u32).max(x0 + 1);
                values.push(1.0 - image.block_mean(x0, y0, x1, y1));
            }
        }
        log::debug!("Density field {cols}x{rows} from {w}x{h} image");
        Ok(Self { cols, rows, values })
    }

    /// Field with the same density everywhere.
    pub fn uniform(cols: u32, rows: u32, density: f64) -> Result<Self> {
        if cols == 0 || rows == 0 {
            return Err(invalid("grid", format!("{cols}x{rows} has no cells")));
        }
        Ok(Self {
            cols,
            rows,
            values: vec![density.clamp(0.0, 1.0); cols as usize * rows as usize],
        })
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Density at `(col, row)`; out-of-range queries return 0.5.
    pub fn get(&self, col: i64, row: i64) -> f64 {
        if col < 0 || row < 0 || col >= self.cols as i64 || row >= self.rows as i64 {
            return NEUTRAL;
        }
        self.values[row as usize * self.cols as usize + col as usize]
    }

    fn clamped(&self, col: i64, row: i64) -> f64 {
        let c = col.clamp(0, self.cols as i64 - 1);
        let r = row.clamp(0, self.rows as i64 - 1);
        self.values[r as usize * self.cols as usize + c as usize]
    }

    /// Sobel gradient magnitude over the 3x3 neighbourhood, scaled to [0,1].
    ///
    /// Edge pixels are replicated so the image border does not read as an edge.
    pub fn edge_strength(&self, col: i64, row: i64) -> f64 {
        if col < 0 || row < 0 || col >= self.cols as i64 || row >= self.rows as i64 {
            return 0.0;
        }
        let p = |dc: i64, dr: i64| self.clamped(col + dc, row + dr);
        let gx = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
        let gy = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
        ((gx * gx + gy * gy).sqrt() / 4.0).min(1.0)
    }

    /// Darken cells on strong edges: `d + weight * edge_strength`, capped
    /// at 1. Edges are measured on `self`, not on the biased result.
    pub fn with_edge_bias(&self, weight: f64) -> Self {
        if weight <= 0.0 {
            return self.clone();
        }
        let mut values = Vec::with_capacity(self.values.len());
        for row in 0..self.rows as i64 {
            for col in 0..self.cols as i64 {
                let d = self.get(col, row) + weight * self.edge_strength(col, row);
                values.push(d.min(1.0));
            }
        }
        Self { cols: self.cols, rows: self.rows, values }
    }
}
