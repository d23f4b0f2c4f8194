// partition.rs - Spatial partition of the maze plane into leaf cells
//
// Two layouts share one output type: a uniform grid (every leaf the same
// size) and an adaptive quadtree whose resolution follows image content.

use serde::{Deserialize, Serialize};

use crate::density::DensityField;
use crate::error_handling::{ensure_range, invalid, MazeError, Result};
use crate::raster::GrayBuffer;
use crate::types::Rect;

/// A terminal cell of the partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub rect: Rect,
    /// Sampled brightness in [0,1], 1 = white.
    pub brightness: f64,
}

impl Leaf {
    pub fn density(&self) -> f64 {
        1.0 - self.brightness
    }
}

/// Subdivision controls for the adaptive layout, in image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadtreeParams {
    /// Regions at or below this side length are never split.
    pub min_cell_size: u32,
    /// Threshold used for pure white; darker regions scale it down.
    pub max_cell_size: u32,
    /// How strongly local edges lower the threshold, in [0,1].
    pub edge_sensitivity: f64,
}

impl Default for QuadtreeParams {
    fn default() -> Self {
        Self {
            min_cell_size: 4,
            max_cell_size: 48,
            edge_sensitivity: 0.5,
        }
    }
}

impl QuadtreeParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_cell_size < 2 {
            return Err(invalid("min_cell_size", "must be at least 2"));
        }
        if self.max_cell_size < self.min_cell_size {
            return Err(invalid(
                "max_cell_size",
                format!("{} is below min_cell_size {}", self.max_cell_size, self.min_cell_size),
            ));
        }
        ensure_range("edge_sensitivity", self.edge_sensitivity, 0.0, 1.0)
    }

    /// Side length above which a region splits. Darker midpoints and
    /// stronger edges both pull the threshold down.
    pub fn threshold(&self, brightness: f64, edge_strength: f64) -> f64 {
        let min = self.min_cell_size as f64;
        let span = (self.max_cell_size - self.min_cell_size) as f64;
        let scaled = min + span * brightness.clamp(0.0, 1.0);
        scaled * (1.0 - edge_strength.clamp(0.0, 1.0) * self.edge_sensitivity)
    }

    fn should_split(&self, image: &GrayBuffer, rect: &Rect) -> bool {
        let side = rect.min_side();
        if side <= self.min_cell_size || side < 2 {
            return false;
        }
        let mid = rect.center();
        let brightness = image.brightness_at(mid.x, mid.y);
        let corner1 = image.brightness_at(rect.x as f64, rect.y as f64);
        let corner2 = image.brightness_at((rect.right() - 1) as f64, (rect.bottom() - 1) as f64);
        let edge = (corner1 - corner2).abs();
        side as f64 > self.threshold(brightness, edge)
    }
}

/// Leaves tiling `[0,width) x [0,height)` with no gaps or overlaps.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    width: u32,
    height: u32,
    leaves: Vec<Leaf>,
}

impl Partition {
    /// Uniform grid over the density field, `cell_size` maze units per cell.
    pub fn uniform(density: &DensityField, cell_size: u32) -> Result<Self> {
        if cell_size == 0 {
            return Err(invalid("cell_size", "must be positive"));
        }
        let mut leaves = Vec::with_capacity(density.values().len());
        for row in 0..density.rows() {
            for col in 0..density.cols() {
                leaves.push(Leaf {
                    rect: Rect::new(col * cell_size, row * cell_size, cell_size, cell_size),
                    brightness: 1.0 - density.get(col as i64, row as i64),
                });
            }
        }
        Ok(Self {
            width: density.cols() * cell_size,
            height: density.rows() * cell_size,
            leaves,
        })
    }

    /// Adaptive quadtree over the whole image, in pixel units.
    pub fn quadtree(image: &GrayBuffer, params: &QuadtreeParams) -> Result<Self> {
        params.validate()?;
        let root = Rect::new(0, 0, image.width(), image.height());
        let mut leaves = Vec::new();
        subdivide(image, params, root, &mut leaves);
        log::debug!(
            "Quadtree over {}x{}: {} leaves (min {}, max {})",
            image.width(),
            image.height(),
            leaves.len(),
            params.min_cell_size,
            params.max_cell_size
        );
        Ok(Self {
            width: image.width(),
            height: image.height(),
            leaves,
        })
    }

    /// Wrap externally built leaves, checking they stay inside a non-empty
    /// plane, never overlap, and cover it exactly by area.
    pub fn from_leaves(width: u32, height: u32, leaves: Vec<Leaf>) -> Result<Self> {
        if width == 0 || height == 0 || leaves.is_empty() {
            return Err(MazeError::EmptyImage { width, height });
        }
        if leaves.iter().any(|l| l.rect.w == 0 || l.rect.h == 0) {
            return Err(invalid("leaves", "zero-sized leaf"));
        }
        if let Some(l) = leaves
            .iter()
            .find(|l| l.rect.right() > width || l.rect.bottom() > height)
        {
            return Err(invalid(
                "leaves",
                format!("{:?} leaves the {width}x{height} plane", l.rect),
            ));
        }
        for (i, a) in leaves.iter().enumerate() {
            if let Some(b) = leaves[i + 1..].iter().find(|b| overlaps(&a.rect, &b.rect)) {
                return Err(invalid("leaves", format!("{:?} overlaps {:?}", a.rect, b.rect)));
            }
        }
        let area: u64 = leaves.iter().map(|l| l.rect.w as u64 * l.rect.h as u64).sum();
        if area != width as u64 * height as u64 {
            return Err(invalid(
                "leaves",
                format!("leaf area {area} does not tile {width}x{height}"),
            ));
        }
        Ok(Self { width, height, leaves })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn into_leaves(self) -> Vec<Leaf> {
        self.leaves
    }
}

fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x.max(b.x) < a.right().min(b.right()) && a.y.max(b.y) < a.bottom().min(b.bottom())
}

fn subdivide(image: &GrayBuffer, params: &QuadtreeParams, rect: Rect, out: &mut Vec<Leaf>) {
    if params.should_split(image, &rect) {
        for quadrant in rect.quadrants() {
            subdivide(image, params, quadrant, out);
        }
    } else {
        out.push(Leaf {
            rect,
            brightness: image.block_mean(rect.x, rect.y, rect.right(), rect.bottom()),
        });
    }
}
