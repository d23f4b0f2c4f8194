// optimizer.rs - Pen-travel optimization: chain stitching and greedy ordering
//
// Segments are stitched into chains through bit-exact shared endpoints, then
// the chains are ordered by a nearest-neighbour tour from the pen position.
// Greedy ordering is O(n^2), which is fine for maze-sized inputs (thousands
// of chains).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Point, PointKey, WallSegment};

/// Polyline of endpoint-contiguous wall segments. `brightness[i]` belongs to
/// the segment `points[i] -> points[i + 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    points: Vec<Point>,
    brightness: Vec<f64>,
}

impl Chain {
    pub fn from_segment(segment: WallSegment) -> Self {
        Self {
            points: vec![segment.start, segment.end],
            brightness: vec![segment.brightness],
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn brightness(&self) -> &[f64] {
        &self.brightness
    }

    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn end(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.brightness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brightness.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.len() > 1 && self.start().key() == self.end().key()
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
        self.brightness.reverse();
    }

    pub fn push(&mut self, point: Point, brightness: f64) {
        self.points.push(point);
        self.brightness.push(brightness);
    }

    /// Pen-down length.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    pub fn segments(&self) -> impl Iterator<Item = WallSegment> + '_ {
        self.points
            .windows(2)
            .zip(&self.brightness)
            .map(|(w, &b)| WallSegment::new(w[0], w[1], b))
    }
}

/// Stitch segments into maximal chains through exactly shared endpoints.
///
/// Seeds are taken lowest endpoint degree first, so chains start at open
/// ends (degree 1) rather than in the middle of a corridor. Candidates are
/// reversed as needed to continue a chain. Pure loops seed last.
pub fn stitch_chains(segments: &[WallSegment]) -> Vec<Chain> {
    let mut ends: HashMap<PointKey, Vec<usize>> = HashMap::with_capacity(segments.len() * 2);
    for (i, s) in segments.iter().enumerate() {
        ends.entry(s.start.key()).or_default().push(i);
        ends.entry(s.end.key()).or_default().push(i);
    }
    let degree = |p: Point| ends.get(&p.key()).map_or(0, Vec::len);

    let mut seeds: Vec<usize> = (0..segments.len()).collect();
    seeds.sort_by_key(|&i| (degree(segments[i].start).min(degree(segments[i].end)), i));

    let mut used = vec![false; segments.len()];
    let mut chains = Vec::new();
    for seed in seeds {
        if used[seed] {
            continue;
        }
        used[seed] = true;
        let mut first = segments[seed];
        if degree(first.end) < degree(first.start) {
            first = first.reversed();
        }

        let mut chain = Chain::from_segment(first);
        while let Some(next) = take_continuation(&ends, segments, &mut used, chain.end()) {
            chain.push(next.end, next.brightness);
        }

        // walk backwards from the seed's start, then splice in front
        let mut prefix = Chain {
            points: vec![first.start],
            brightness: Vec::new(),
        };
        while let Some(prev) = take_continuation(&ends, segments, &mut used, prefix.end()) {
            prefix.push(prev.end, prev.brightness);
        }
        if !prefix.is_empty() {
            prefix.reverse();
            prefix.points.pop();
            prefix.points.extend_from_slice(&chain.points);
            prefix.brightness.extend_from_slice(&chain.brightness);
            chain = prefix;
        }
        chains.push(chain);
    }

    log::debug!("Stitched {} segments into {} chains", segments.len(), chains.len());
    chains
}

/// Claim the lowest-index unused segment touching `at`, oriented to start there.
fn take_continuation(
    ends: &HashMap<PointKey, Vec<usize>>,
    segments: &[WallSegment],
    used: &mut [bool],
    at: Point,
) -> Option<WallSegment> {
    let key = at.key();
    let &idx = ends.get(&key)?.iter().find(|&&i| !used[i])?;
    used[idx] = true;
    let s = segments[idx];
    Some(if s.start.key() == key { s } else { s.reversed() })
}

/// Greedy nearest-neighbour tour over chains starting from `origin`.
///
/// Each step takes the chain whose nearer endpoint is closest to the pen,
/// reversing it when its end is the nearer one.
pub fn order_chains(chains: Vec<Chain>, origin: Point) -> Vec<Chain> {
    let mut pending: Vec<Option<Chain>> =
        chains.into_iter().filter(|c| !c.is_empty()).map(Some).collect();
    let mut ordered = Vec::with_capacity(pending.len());
    let mut pen = origin;

    for _ in 0..pending.len() {
        let mut best: Option<(usize, bool)> = None;
        let mut best_dist = f64::INFINITY;
        for (i, slot) in pending.iter().enumerate() {
            let Some(chain) = slot else { continue };
            let forward = pen.distance_squared(chain.start());
            let backward = pen.distance_squared(chain.end());
            let (dist, reversed) = if forward <= backward {
                (forward, false)
            } else {
                (backward, true)
            };
            if dist < best_dist {
                best_dist = dist;
                best = Some((i, reversed));
            }
        }
        let Some((idx, reversed)) = best else { break };
        let Some(mut chain) = pending[idx].take() else { break };
        if reversed {
            chain.reverse();
        }
        pen = chain.end();
        ordered.push(chain);
    }
    ordered
}

/// Simple variant: order individual segments without stitching.
pub fn order_segments(segments: &[WallSegment], origin: Point) -> Vec<WallSegment> {
    let singles = segments.iter().copied().map(Chain::from_segment).collect();
    order_chains(singles, origin)
        .iter()
        .flat_map(|c| c.segments().collect::<Vec<_>>())
        .collect()
}

/// Stitch then order.
pub fn optimize(segments: &[WallSegment], origin: Point) -> Vec<Chain> {
    let ordered = order_chains(stitch_chains(segments), origin);
    let stats = travel_stats(&ordered, origin);
    log::debug!(
        "Optimized path: {} chains, {:.1} pen-down, {:.1} pen-up over {} lifts",
        ordered.len(),
        stats.pen_down,
        stats.pen_up,
        stats.lifts
    );
    ordered
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TravelStats {
    pub pen_down: f64,
    pub pen_up: f64,
    /// Repositioning moves, including the first one from `origin`.
    pub lifts: usize,
}

/// Drawing and travel distances for chains plotted in order from `origin`.
pub fn travel_stats(chains: &[Chain], origin: Point) -> TravelStats {
    let mut stats = TravelStats::default();
    let mut pen = origin;
    for chain in chains.iter().filter(|c| !c.is_empty()) {
        if chain.start().key() != pen.key() {
            stats.pen_up += pen.distance(chain.start());
            stats.lifts += 1;
        }
        stats.pen_down += chain.length();
        pen = chain.end();
    }
    stats
}
