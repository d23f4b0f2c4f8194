// session.rs - Explicit pipeline context: image in, carved maze and geometry out
//
// Nothing here is global. A session owns its config and preprocessed image,
// so independent sessions can run side by side (see `generate_batch`).

use rayon::prelude::*;

use crate::carver::{carve, CarveReport};
use crate::config::{Layout, MazeConfig};
use crate::density::DensityField;
use crate::error_handling::Result;
use crate::maze::Maze;
use crate::optimizer::{optimize, travel_stats, Chain, TravelStats};
use crate::partition::Partition;
use crate::preprocess::preprocess;
use crate::raster::GrayBuffer;
use crate::svg::render_svg;
use crate::types::{Point, WallSegment};

/// Everything one generation run produces.
#[derive(Debug, Clone)]
pub struct MazeArtifact {
    pub seed: u64,
    pub maze: Maze,
    pub report: CarveReport,
    pub walls: Vec<WallSegment>,
    /// Walls stitched and ordered for plotting, starting at the origin.
    pub chains: Vec<Chain>,
    pub travel: TravelStats,
}

#[derive(Debug, Clone)]
pub struct MazeSession {
    config: MazeConfig,
    image: GrayBuffer,
}

impl MazeSession {
    /// Validate the config and apply image preprocessing once.
    pub fn new(image: &GrayBuffer, config: MazeConfig) -> Result<Self> {
        config.validate()?;
        let image = preprocess(image, &config.preprocess)?;
        Ok(Self { config, image })
    }

    pub fn config(&self) -> &MazeConfig {
        &self.config
    }

    /// The preprocessed image the pipeline samples.
    pub fn image(&self) -> &GrayBuffer {
        &self.image
    }

    pub fn partition(&self) -> Result<Partition> {
        match &self.config.layout {
            Layout::Grid { cols, rows, cell_size, edge_weight } => {
                let density = DensityField::from_image(&self.image, *cols, *rows)?
                    .with_edge_bias(*edge_weight);
                Partition::uniform(&density, *cell_size)
            }
            Layout::Quadtree(params) => Partition::quadtree(&self.image, params),
        }
    }

    pub fn generate(&self) -> Result<MazeArtifact> {
        self.generate_seed(self.config.seed)
    }

    pub fn generate_seed(&self, seed: u64) -> Result<MazeArtifact> {
        let mut maze = Maze::from_partition(self.partition()?);
        let mut params = self.config.carve_params();
        params.seed = seed;
        let report = carve(&mut maze, &params);
        let walls = crate::walls::extract_walls(&maze);
        let origin = Point::default();
        let chains = optimize(&walls, origin);
        let travel = travel_stats(&chains, origin);
        log::info!(
            "Generated maze seed {}: {} cells, {} walls, {} chains",
            seed,
            maze.node_count(),
            walls.len(),
            chains.len()
        );
        Ok(MazeArtifact { seed, maze, report, walls, chains, travel })
    }

    /// One maze per seed, generated in parallel. Each result is identical to
    /// what `generate_seed` returns for the same seed.
    pub fn generate_batch(&self, seeds: &[u64]) -> Result<Vec<MazeArtifact>> {
        seeds.par_iter().map(|&seed| self.generate_seed(seed)).collect()
    }

    pub fn render_svg(&self, artifact: &MazeArtifact) -> String {
        render_svg(&artifact.maze, &artifact.chains, &self.config.stroke)
    }
}
