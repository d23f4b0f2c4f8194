// walls.rs - Deduplicated wall geometry from cells plus passage state

use std::collections::BTreeMap;

use crate::maze::Maze;
use crate::types::{PointKey, Side, WallSegment};

/// Every wall of the finished maze, each exactly once.
///
/// Border sides emit the full side unless they are the entrance or exit
/// opening. Closed internal boundaries emit only the span the two cells
/// actually share, which differs from the full side when neighbour sizes
/// differ. Output is sorted by canonical endpoints.
pub fn extract_walls(maze: &Maze) -> Vec<WallSegment> {
    let mut walls: BTreeMap<(PointKey, PointKey), WallSegment> = BTreeMap::new();
    let mut insert = |segment: WallSegment| {
        let segment = segment.canonical();
        walls.entry(segment.key()).or_insert(segment);
    };

    for (id, node) in maze.nodes().iter().enumerate() {
        for side in Side::ALL {
            if maze.on_border(id, side) {
                if !maze.is_opening(id, side) {
                    let (start, end) = node.rect.side_line(side);
                    insert(WallSegment::new(start, end, node.brightness));
                }
                continue;
            }
            for n in node.neighbors.iter().filter(|n| n.side == side) {
                if maze.is_open(n.edge) {
                    continue;
                }
                let edge = &maze.edges()[n.edge];
                let brightness = (node.brightness + maze.node(n.node).brightness) / 2.0;
                insert(WallSegment::new(edge.start, edge.end, brightness));
            }
        }
    }

    let walls: Vec<WallSegment> = walls.into_values().collect();
    log::debug!("Extracted {} wall segments", walls.len());
    walls
}
