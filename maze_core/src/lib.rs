// lib.rs - Library exports for maze_core
// Portrait-to-maze pipeline: density field, partition, carving, wall
// extraction, pen-path optimization and SVG export.

pub mod carver;
pub mod config;
pub mod density;
pub mod error_handling;
pub mod maze;
pub mod optimizer;
pub mod partition;
pub mod preprocess;
pub mod raster;
pub mod session;
pub mod svg;
pub mod types;
pub mod walls;

// Re-export commonly used types
pub use carver::{carve, CarveParams, CarveReport};
pub use config::{Layout, MazeConfig, StrokeOptions, SvgLayout};
pub use density::DensityField;
pub use error_handling::{MazeError, Result};
pub use maze::{Maze, MazeSnapshot, NodeId};
pub use optimizer::{
    optimize, order_chains, order_segments, stitch_chains, travel_stats, Chain, TravelStats,
};
pub use partition::{Leaf, Partition, QuadtreeParams};
pub use preprocess::{preprocess, PreprocessOptions};
pub use raster::GrayBuffer;
pub use session::{MazeArtifact, MazeSession};
pub use svg::render_svg;
pub use types::{Point, PointKey, Rect, Side, SideSet, WallSegment};
pub use walls::extract_walls;
