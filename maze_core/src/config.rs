// config.rs - Parameter surface for maze generation and vector export

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::carver::CarveParams;
use crate::error_handling::{ensure_range, invalid, Result};
use crate::partition::QuadtreeParams;
use crate::preprocess::PreprocessOptions;

/// How the plane is partitioned into cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    /// Fixed `cols x rows` grid, `cell_size` maze units per cell.
    /// `edge_weight` in [0,1] darkens cells on image edges.
    Grid {
        cols: u32,
        rows: u32,
        cell_size: u32,
        #[serde(default)]
        edge_weight: f64,
    },
    /// Adaptive quadtree in image pixel units.
    Quadtree(QuadtreeParams),
}

impl Default for Layout {
    fn default() -> Self {
        Layout::Quadtree(QuadtreeParams::default())
    }
}

impl Layout {
    pub fn validate(&self) -> Result<()> {
        match self {
            Layout::Grid { cols, rows, cell_size, edge_weight } => {
                if *cols == 0 || *rows == 0 {
                    return Err(invalid("grid", format!("{cols}x{rows} has no cells")));
                }
                if *cell_size == 0 {
                    return Err(invalid("cell_size", "must be positive"));
                }
                ensure_range("edge_weight", *edge_weight, 0.0, 1.0)
            }
            Layout::Quadtree(params) => params.validate(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvgLayout {
    /// One `<line>` per wall segment, in plotting order.
    #[default]
    Segments,
    /// One `<path>` per run of equal stroke width within a chain.
    Chains,
}

/// Stroke weighting and document options for the vector exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeOptions {
    /// Stroke width of a white wall, in maze units.
    pub base_weight: f64,
    /// How much darker walls thicken; 0 disables shading.
    pub shading_intensity: f64,
    /// Physical document width; height follows the maze aspect ratio.
    pub output_width_mm: f64,
    /// Decimal places for coordinates and stroke widths.
    pub precision: usize,
    pub labels: bool,
    pub markers: bool,
    /// Overlay the entrance-to-exit route as a separate group.
    pub show_solution: bool,
    pub layout: SvgLayout,
    pub color: String,
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self {
            base_weight: 1.0,
            shading_intensity: 2.0,
            output_width_mm: 200.0,
            precision: 2,
            labels: true,
            markers: true,
            show_solution: false,
            layout: SvgLayout::Segments,
            color: "#000000".to_string(),
        }
    }
}

impl StrokeOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.base_weight.is_finite() && self.base_weight > 0.0) {
            return Err(invalid("base_weight", "must be positive"));
        }
        ensure_range("shading_intensity", self.shading_intensity, 0.0, 100.0)?;
        if !(self.output_width_mm.is_finite() && self.output_width_mm > 0.0) {
            return Err(invalid("output_width_mm", "must be positive"));
        }
        if self.precision > 6 {
            return Err(invalid("precision", "at most 6 decimal places"));
        }
        Ok(())
    }

    /// `base * (1 + (1 - brightness) * shading)`: darker walls are thicker.
    pub fn stroke_width(&self, brightness: f64) -> f64 {
        self.base_weight * (1.0 + (1.0 - brightness.clamp(0.0, 1.0)) * self.shading_intensity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MazeConfig {
    pub seed: u64,
    /// Extra passages opened in light areas, in [0,1].
    pub wall_removal_strength: f64,
    /// Passages closed again in dark areas, in [0,1].
    pub extra_walls_strength: f64,
    /// Probability of extending the newest active cell, in [0,1].
    pub corridor_bias: f64,
    pub layout: Layout,
    pub preprocess: PreprocessOptions,
    pub stroke: StrokeOptions,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            wall_removal_strength: 0.3,
            extra_walls_strength: 0.3,
            corridor_bias: 0.75,
            layout: Layout::default(),
            preprocess: PreprocessOptions::default(),
            stroke: StrokeOptions::default(),
        }
    }
}

impl MazeConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_range("wall_removal_strength", self.wall_removal_strength, 0.0, 1.0)?;
        ensure_range("extra_walls_strength", self.extra_walls_strength, 0.0, 1.0)?;
        ensure_range("corridor_bias", self.corridor_bias, 0.0, 1.0)?;
        self.layout.validate()?;
        self.preprocess.validate()?;
        self.stroke.validate()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: MazeConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn carve_params(&self) -> CarveParams {
        CarveParams {
            seed: self.seed,
            corridor_bias: self.corridor_bias,
            wall_removal_strength: self.wall_removal_strength,
            extra_walls_strength: self.extra_walls_strength,
        }
    }
}
