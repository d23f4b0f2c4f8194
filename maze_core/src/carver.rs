// carver.rs - Randomized growing-tree carving plus density-driven refinement
//
// One seeded RNG drives every pass, so identical inputs reproduce the same
// maze. Pass order is fixed: spanning tree, light-area wall removal, then
// dark-area complexity injection.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::maze::{EdgeId, Maze, NodeId};

/// Light cells get extra passages below this density.
pub const LIGHT_DENSITY: f64 = 0.5;
/// Dark cells get walls back above this density.
pub const DARK_DENSITY: f64 = 0.6;
/// How much a neighbour's density discounts its pick weight.
pub const DENSITY_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct CarveParams {
    pub seed: u64,
    pub corridor_bias: f64,
    pub wall_removal_strength: f64,
    pub extra_walls_strength: f64,
}

impl Default for CarveParams {
    fn default() -> Self {
        Self {
            seed: 1,
            corridor_bias: 0.75,
            wall_removal_strength: 0.0,
            extra_walls_strength: 0.0,
        }
    }
}

/// What each pass did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarveReport {
    /// Cells reached by the spanning-tree pass.
    pub visited: Vec<bool>,
    /// Passages opened by the spanning-tree pass.
    pub tree_passages: usize,
    /// Cells that received an extra passage in the light pass.
    pub walls_removed: Vec<NodeId>,
    /// Passages closed again in the dark pass.
    pub walls_added: usize,
}

impl CarveReport {
    pub fn visited_count(&self) -> usize {
        self.visited.iter().filter(|&&v| v).count()
    }
}

/// Carve `maze` in place. Any previous passages are discarded first.
pub fn carve(maze: &mut Maze, params: &CarveParams) -> CarveReport {
    maze.close_all();
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

    let (visited, tree_passages) = grow_tree(maze, &mut rng, params.corridor_bias);
    let walls_removed = remove_light_walls(maze, &mut rng, params.wall_removal_strength);
    let walls_added = add_dark_walls(maze, &mut rng, params.extra_walls_strength);

    log::debug!(
        "Carved seed {}: {} tree passages, {} walls removed, {} walls added",
        params.seed,
        tree_passages,
        walls_removed.len(),
        walls_added
    );
    CarveReport {
        visited,
        tree_passages,
        walls_removed,
        walls_added,
    }
}

fn grow_tree(maze: &mut Maze, rng: &mut ChaCha8Rng, corridor_bias: f64) -> (Vec<bool>, usize) {
    let mut visited = vec![false; maze.node_count()];
    if maze.node_count() == 0 {
        return (visited, 0);
    }
    let bias = corridor_bias.clamp(0.0, 1.0);
    let entrance = maze.entrance();
    visited[entrance] = true;
    let mut active = vec![entrance];
    let mut opened = 0;
    let mut candidates: Vec<(NodeId, EdgeId)> = Vec::with_capacity(8);

    while !active.is_empty() {
        let idx = if rng.random_bool(bias) {
            active.len() - 1
        } else {
            rng.random_range(0..active.len())
        };
        let cell = active[idx];

        candidates.clear();
        candidates.extend(
            maze.node(cell)
                .neighbors
                .iter()
                .filter(|n| !visited[n.node])
                .map(|n| (n.node, n.edge)),
        );
        if candidates.is_empty() {
            active.remove(idx);
            continue;
        }

        let (next, edge) = pick_weighted(rng, &candidates, |&(node, _)| {
            1.0 - maze.density(node) * DENSITY_WEIGHT
        });
        maze.set_open(edge, true);
        visited[next] = true;
        active.push(next);
        opened += 1;
    }
    (visited, opened)
}

fn pick_weighted<T: Copy>(rng: &mut ChaCha8Rng, items: &[T], weight: impl Fn(&T) -> f64) -> T {
    let total: f64 = items.iter().map(&weight).sum();
    let mut roll = rng.random::<f64>() * total;
    for item in items {
        roll -= weight(item);
        if roll < 0.0 {
            return *item;
        }
    }
    items[items.len() - 1]
}

/// Open at most one extra boundary per light cell, never closing a 4-cycle
/// of open passages (a fully open 2x2 block on a grid).
fn remove_light_walls(maze: &mut Maze, rng: &mut ChaCha8Rng, strength: f64) -> Vec<NodeId> {
    let mut touched = Vec::new();
    for cell in 0..maze.node_count() {
        let density = maze.density(cell);
        if density >= LIGHT_DENSITY {
            continue;
        }
        let chance = ((1.0 - density - 0.5) * 2.0 * strength).clamp(0.0, 1.0);
        if rng.random::<f64>() >= chance {
            continue;
        }
        let candidates: Vec<EdgeId> = maze
            .node(cell)
            .neighbors
            .iter()
            .filter(|n| !maze.is_open(n.edge) && !closes_open_square(maze, cell, n.node))
            .map(|n| n.edge)
            .collect();
        if candidates.is_empty() {
            continue;
        }
        let edge = candidates[rng.random_range(0..candidates.len())];
        maze.set_open(edge, true);
        touched.push(cell);
    }
    touched
}

/// Would opening `a`-`b` complete a cycle a-b-c-d of open passages?
fn closes_open_square(maze: &Maze, a: NodeId, b: NodeId) -> bool {
    maze.open_neighbors(b)
        .filter(|c| c.node != a)
        .any(|c| {
            maze.open_neighbors(a)
                .filter(|d| d.node != b && d.node != c.node)
                .any(|d| maze.is_passage(c.node, d.node))
        })
}

/// Close at most one passage per dark interior cell. Both endpoints keep at
/// least two open sides, and the endpoints must stay connected through the
/// rest of the maze, so no cell is cut off.
fn add_dark_walls(maze: &mut Maze, rng: &mut ChaCha8Rng, strength: f64) -> usize {
    let mut closed = 0;
    for cell in 0..maze.node_count() {
        let density = maze.density(cell);
        if density <= DARK_DENSITY || maze.is_border_node(cell) {
            continue;
        }
        let chance = ((density - DARK_DENSITY) * 2.5 * strength).clamp(0.0, 1.0);
        if rng.random::<f64>() >= chance {
            continue;
        }
        if maze.open_degree(cell) < 3 {
            continue;
        }
        let mut candidates: Vec<EdgeId> = maze
            .open_neighbors(cell)
            .filter(|n| maze.open_degree(n.node) >= 3)
            .map(|n| n.edge)
            .collect();
        while !candidates.is_empty() {
            let edge = candidates.swap_remove(rng.random_range(0..candidates.len()));
            if maze.connected_without(edge) {
                maze.set_open(edge, false);
                closed += 1;
                break;
            }
        }
    }
    closed
}
