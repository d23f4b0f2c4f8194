// maze.rs - Cells, adjacency and the open/closed passage set
//
// Nodes live in one owned array and refer to each other by index. Each
// adjacent pair is stored once as an `Edge`; whether it is a passage is a
// single flag in `open`, so both sides always agree.

use std::collections::VecDeque;

use nohash_hasher::IntMap;
use serde::{Deserialize, Serialize};

use crate::partition::{Leaf, Partition};
use crate::types::{Point, Rect, Side, SideSet};

pub type NodeId = usize;
pub type EdgeId = usize;

/// Adjacent node as seen from one side of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub node: NodeId,
    pub side: Side,
    pub edge: EdgeId,
    /// Midpoint of the shared boundary.
    pub midpoint: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub rect: Rect,
    pub brightness: f64,
    pub neighbors: Vec<Neighbor>,
}

impl Node {
    pub fn density(&self) -> f64 {
        1.0 - self.brightness
    }
}

/// Shared boundary between two nodes. `a` lies north or west of `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    pub start: Point,
    pub end: Point,
}

impl Edge {
    pub fn other(&self, node: NodeId) -> NodeId {
        if node == self.a {
            self.b
        } else {
            self.a
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Maze {
    width: u32,
    height: u32,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    open: Vec<bool>,
    entrance: NodeId,
    exit: NodeId,
}

impl Maze {
    /// Build adjacency for the leaves and pick entrance and exit. Every
    /// boundary starts closed.
    pub fn from_partition(partition: Partition) -> Self {
        let (width, height) = (partition.width(), partition.height());
        let leaves = partition.into_leaves();
        let mut nodes: Vec<Node> = leaves
            .iter()
            .map(|l: &Leaf| Node {
                rect: l.rect,
                brightness: l.brightness,
                neighbors: Vec::new(),
            })
            .collect();

        // Index nodes by the coordinate of their west and north edges.
        let mut by_left: IntMap<u32, Vec<NodeId>> = IntMap::default();
        let mut by_top: IntMap<u32, Vec<NodeId>> = IntMap::default();
        for (id, node) in nodes.iter().enumerate() {
            by_left.entry(node.rect.x).or_default().push(id);
            by_top.entry(node.rect.y).or_default().push(id);
        }

        let mut edges = Vec::new();
        for a in 0..nodes.len() {
            let ra = nodes[a].rect;
            if let Some(candidates) = by_left.get(&ra.right()) {
                for &b in candidates {
                    let rb = nodes[b].rect;
                    let lo = ra.y.max(rb.y);
                    let hi = ra.bottom().min(rb.bottom());
                    if lo < hi {
                        let x = ra.right() as f64;
                        let (start, end) = (Point::new(x, lo as f64), Point::new(x, hi as f64));
                        edges.push((a, b, Side::East, start, end));
                    }
                }
            }
            if let Some(candidates) = by_top.get(&ra.bottom()) {
                for &b in candidates {
                    let rb = nodes[b].rect;
                    let lo = ra.x.max(rb.x);
                    let hi = ra.right().min(rb.right());
                    if lo < hi {
                        let y = ra.bottom() as f64;
                        let (start, end) = (Point::new(lo as f64, y), Point::new(hi as f64, y));
                        edges.push((a, b, Side::South, start, end));
                    }
                }
            }
        }

        let edges: Vec<Edge> = edges
            .into_iter()
            .enumerate()
            .map(|(id, (a, b, side, start, end))| {
                let midpoint = Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
                nodes[a].neighbors.push(Neighbor { node: b, side, edge: id, midpoint });
                nodes[b].neighbors.push(Neighbor {
                    node: a,
                    side: side.opposite(),
                    edge: id,
                    midpoint,
                });
                Edge { a, b, start, end }
            })
            .collect();

        let centre = width as f64 / 2.0;
        let entrance = closest_to_centre(&nodes, centre, |r| r.y == 0);
        let exit = closest_to_centre(&nodes, centre, |r| r.bottom() == height);

        log::debug!("Maze graph: {} nodes, {} adjacencies", nodes.len(), edges.len());
        let open = vec![false; edges.len()];
        Self { width, height, nodes, edges, open, entrance, exit }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn entrance(&self) -> NodeId {
        self.entrance
    }

    pub fn exit(&self) -> NodeId {
        self.exit
    }

    pub fn density(&self, id: NodeId) -> f64 {
        self.nodes[id].density()
    }

    pub fn is_open(&self, edge: EdgeId) -> bool {
        self.open[edge]
    }

    pub(crate) fn set_open(&mut self, edge: EdgeId, open: bool) {
        self.open[edge] = open;
    }

    pub(crate) fn close_all(&mut self) {
        self.open.iter_mut().for_each(|o| *o = false);
    }

    /// Number of open passages in the whole maze.
    pub fn passage_count(&self) -> usize {
        self.open.iter().filter(|&&o| o).count()
    }

    /// Open passages as `(a, b)` pairs, in edge order.
    pub fn passages(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges
            .iter()
            .zip(&self.open)
            .filter(|(_, &open)| open)
            .map(|(e, _)| (e.a, e.b))
    }

    pub fn open_neighbors(&self, id: NodeId) -> impl Iterator<Item = &Neighbor> + '_ {
        self.nodes[id].neighbors.iter().filter(|n| self.open[n.edge])
    }

    pub fn open_degree(&self, id: NodeId) -> usize {
        self.open_neighbors(id).count()
    }

    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.nodes[a].neighbors.iter().find(|n| n.node == b).map(|n| n.edge)
    }

    pub fn is_passage(&self, a: NodeId, b: NodeId) -> bool {
        self.edge_between(a, b).is_some_and(|e| self.open[e])
    }

    /// True when the side lies on the outer boundary of the maze.
    pub fn on_border(&self, id: NodeId, side: Side) -> bool {
        let r = self.nodes[id].rect;
        match side {
            Side::North => r.y == 0,
            Side::West => r.x == 0,
            Side::South => r.bottom() == self.height,
            Side::East => r.right() == self.width,
        }
    }

    pub fn is_border_node(&self, id: NodeId) -> bool {
        Side::ALL.iter().any(|&s| self.on_border(id, s))
    }

    /// Whether this side is the entrance (top) or exit (bottom) opening.
    pub fn is_opening(&self, id: NodeId, side: Side) -> bool {
        (id == self.entrance && side == Side::North) || (id == self.exit && side == Side::South)
    }

    /// Sides with any wall on them: a closed neighbour boundary, or the
    /// outer border unless it is the entrance/exit opening.
    pub fn walls(&self, id: NodeId) -> SideSet {
        let mut walls = SideSet::EMPTY;
        for side in Side::ALL {
            if self.on_border(id, side) {
                if !self.is_opening(id, side) {
                    walls.insert(side);
                }
            } else if self.nodes[id]
                .neighbors
                .iter()
                .any(|n| n.side == side && !self.open[n.edge])
            {
                walls.insert(side);
            }
        }
        walls
    }

    /// Breadth-first reachability over open passages.
    pub fn reachable_from(&self, start: NodeId) -> Vec<bool> {
        self.bfs(start, None).0
    }

    /// Shortest passage route from entrance to exit.
    pub fn solve(&self) -> Option<Vec<NodeId>> {
        let (seen, parent) = self.bfs(self.entrance, None);
        if !seen[self.exit] {
            return None;
        }
        let mut path = vec![self.exit];
        let mut cur = self.exit;
        while cur != self.entrance {
            cur = parent[cur]?;
            path.push(cur);
        }
        path.reverse();
        Some(path)
    }

    /// Whether the endpoints of `edge` stay connected if it were closed.
    pub fn connected_without(&self, edge: EdgeId) -> bool {
        let e = self.edges[edge];
        self.bfs(e.a, Some(edge)).0[e.b]
    }

    fn bfs(&self, start: NodeId, skip: Option<EdgeId>) -> (Vec<bool>, Vec<Option<NodeId>>) {
        let mut seen = vec![false; self.nodes.len()];
        let mut parent = vec![None; self.nodes.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        while let Some(cur) = queue.pop_front() {
            for n in self.open_neighbors(cur) {
                if Some(n.edge) == skip || seen[n.node] {
                    continue;
                }
                seen[n.node] = true;
                parent[n.node] = Some(cur);
                queue.push_back(n.node);
            }
        }
        (seen, parent)
    }

    pub fn snapshot(&self) -> MazeSnapshot {
        MazeSnapshot {
            width: self.width,
            height: self.height,
            entrance: self.entrance,
            exit: self.exit,
            nodes: self
                .nodes
                .iter()
                .map(|n| NodeSnapshot { rect: n.rect, brightness: n.brightness })
                .collect(),
            passages: self.passages().collect(),
        }
    }
}

fn closest_to_centre(nodes: &[Node], centre: f64, touches: impl Fn(&Rect) -> bool) -> NodeId {
    nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| touches(&n.rect))
        .min_by(|(_, a), (_, b)| {
            let da = (a.rect.center().x - centre).abs();
            let db = (b.rect.center().x - centre).abs();
            da.total_cmp(&db)
        })
        .map(|(id, _)| id)
        .unwrap_or(0)
}

/// Serializable view of a finished maze for external renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MazeSnapshot {
    pub width: u32,
    pub height: u32,
    pub entrance: NodeId,
    pub exit: NodeId,
    pub nodes: Vec<NodeSnapshot>,
    pub passages: Vec<(NodeId, NodeId)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(flatten)]
    pub rect: Rect,
    pub brightness: f64,
}
