// types.rs - Shared geometry types for the maze pipeline
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance_squared(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Bit-exact key for endpoint matching. `-0.0` folds into `0.0`.
    #[inline]
    pub fn key(self) -> PointKey {
        PointKey((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }
}

/// Hashable identity of a point. Ordering matches numeric ordering for
/// non-negative coordinates, which is all the maze ever produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey(u64, u64);

/// Axis-aligned integer rectangle in maze units (image pixels for the
/// quadtree layout, grid units for the uniform layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    #[inline]
    pub fn min_side(&self) -> u32 {
        self.w.min(self.h)
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + self.w as f64 / 2.0,
            self.y as f64 + self.h as f64 / 2.0,
        )
    }

    /// Split into four quadrants (NW, NE, SW, SE) that tile `self` exactly.
    pub fn quadrants(&self) -> [Rect; 4] {
        let w1 = self.w / 2;
        let h1 = self.h / 2;
        let w2 = self.w - w1;
        let h2 = self.h - h1;
        [
            Rect::new(self.x, self.y, w1, h1),
            Rect::new(self.x + w1, self.y, w2, h1),
            Rect::new(self.x, self.y + h1, w1, h2),
            Rect::new(self.x + w1, self.y + h1, w2, h2),
        ]
    }

    /// Endpoints of the given side, in increasing coordinate order.
    pub fn side_line(&self, side: Side) -> (Point, Point) {
        let (x0, y0) = (self.x as f64, self.y as f64);
        let (x1, y1) = (self.right() as f64, self.bottom() as f64);
        match side {
            Side::North => (Point::new(x0, y0), Point::new(x1, y0)),
            Side::South => (Point::new(x0, y1), Point::new(x1, y1)),
            Side::West => (Point::new(x0, y0), Point::new(x0, y1)),
            Side::East => (Point::new(x1, y0), Point::new(x1, y1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    pub fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::East => Side::West,
            Side::South => Side::North,
            Side::West => Side::East,
        }
    }

    #[inline]
    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// One bit per side; a set bit means "wall present".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SideSet(u8);

impl SideSet {
    pub const EMPTY: SideSet = SideSet(0);
    pub const ALL: SideSet = SideSet(0b1111);

    pub fn contains(self, side: Side) -> bool {
        self.0 & side.bit() != 0
    }

    pub fn insert(&mut self, side: Side) {
        self.0 |= side.bit();
    }

    pub fn remove(&mut self, side: Side) {
        self.0 &= !side.bit();
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// A wall line plus the brightness used to weight its stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallSegment {
    pub start: Point,
    pub end: Point,
    /// 0 = black, 1 = white.
    pub brightness: f64,
}

impl WallSegment {
    pub fn new(start: Point, end: Point, brightness: f64) -> Self {
        Self { start, end, brightness }
    }

    /// Lexicographically smaller endpoint first.
    pub fn canonical(self) -> Self {
        if self.end.key() < self.start.key() {
            self.reversed()
        } else {
            self
        }
    }

    pub fn reversed(self) -> Self {
        Self {
            start: self.end,
            end: self.start,
            brightness: self.brightness,
        }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    pub fn key(&self) -> (PointKey, PointKey) {
        (self.start.key(), self.end.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrants_tile_odd_rect() {
        let r = Rect::new(3, 5, 7, 9);
        let q = r.quadrants();
        let area: u32 = q.iter().map(|c| c.w * c.h).sum();
        assert_eq!(area, r.w * r.h);
        assert_eq!(q[1].right(), r.right());
        assert_eq!(q[3].bottom(), r.bottom());
        assert_eq!(q[0].right(), q[1].x);
        assert_eq!(q[0].bottom(), q[2].y);
    }

    #[test]
    fn test_canonical_orders_endpoints() {
        let s = WallSegment::new(Point::new(4.0, 0.0), Point::new(2.0, 0.0), 0.5).canonical();
        assert_eq!(s.start, Point::new(2.0, 0.0));
        assert_eq!(s.end, Point::new(4.0, 0.0));
    }

    #[test]
    fn test_negative_zero_shares_key() {
        assert_eq!(Point::new(-0.0, 1.0).key(), Point::new(0.0, 1.0).key());
    }

    #[test]
    fn test_side_set_bits() {
        let mut walls = SideSet::ALL;
        walls.remove(Side::East);
        assert!(!walls.contains(Side::East));
        assert!(walls.contains(Side::West));
        assert_eq!(walls.len(), 3);
    }
}
