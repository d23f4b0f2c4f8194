// transform.rs - Maze units to paper millimetres, plus per-segment pen height

use maze_core::{Chain, Point, StrokeOptions};

use crate::config::{PlotArea, PlotterConfig};

/// Uniform scale-and-centre from the maze plane into a plot area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotTransform {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl PlotTransform {
    /// Largest uniform scale that fits `width x height` inside `area`,
    /// centred on both axes.
    pub fn fit(width: u32, height: u32, area: PlotArea) -> Self {
        let (w, h) = (width.max(1) as f64, height.max(1) as f64);
        let scale = (area.width / w).min(area.height / h);
        Self {
            scale,
            offset_x: area.x + (area.width - w * scale) / 2.0,
            offset_y: area.y + (area.height - h * scale) / 2.0,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(self.offset_x + p.x * self.scale, self.offset_y + p.y * self.scale)
    }
}

/// One stroke on paper, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotSegment {
    pub start: Point,
    pub end: Point,
    /// Logical pen height on the 0-100 scale.
    pub height: f64,
}

impl PlotSegment {
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// Flatten ordered chains into paper-space strokes. Chain order and
/// direction are preserved, so contiguous walls stay contiguous.
pub fn plot_segments(
    chains: &[Chain],
    maze_width: u32,
    maze_height: u32,
    stroke: &StrokeOptions,
    config: &PlotterConfig,
) -> Vec<PlotSegment> {
    let transform = PlotTransform::fit(maze_width, maze_height, config.plot_area());
    let segments: Vec<PlotSegment> = chains
        .iter()
        .flat_map(|chain| chain.segments())
        .map(|seg| PlotSegment {
            start: transform.apply(seg.start),
            end: transform.apply(seg.end),
            height: config.stroke_height(stroke.stroke_width(seg.brightness)),
        })
        .collect();
    log::debug!(
        "Mapped {} chains to {} plot segments at {:.3} mm per unit",
        chains.len(),
        segments.len(),
        transform.scale()
    );
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_core::{stitch_chains, WallSegment};

    fn area() -> PlotArea {
        PlotArea { x: 10.0, y: 10.0, width: 200.0, height: 100.0 }
    }

    #[test]
    fn test_fit_preserves_aspect_and_centres() {
        // Square maze is height-limited and centred horizontally.
        let t = PlotTransform::fit(50, 50, area());
        assert_eq!(t.scale(), 2.0);
        assert_eq!(t.apply(Point::new(0.0, 0.0)), Point::new(60.0, 10.0));
        assert_eq!(t.apply(Point::new(50.0, 50.0)), Point::new(160.0, 110.0));

        // Wide maze is width-limited and centred vertically.
        let t = PlotTransform::fit(400, 100, area());
        assert_eq!(t.scale(), 0.5);
        assert_eq!(t.apply(Point::new(0.0, 0.0)), Point::new(10.0, 35.0));
    }

    #[test]
    fn test_segments_keep_order_and_shade_heights() {
        let walls = [
            WallSegment::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 1.0),
            WallSegment::new(Point::new(10.0, 0.0), Point::new(10.0, 10.0), 0.0),
        ];
        let chains = stitch_chains(&walls);
        assert_eq!(chains.len(), 1);

        let stroke = StrokeOptions::default();
        let config = PlotterConfig::default();
        let segs = plot_segments(&chains, 10, 10, &stroke, &config);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].end, segs[1].start);
        let (light, dark) = if segs[0].start.y == segs[0].end.y {
            (segs[0], segs[1])
        } else {
            (segs[1], segs[0])
        };

        // White wall -> width 1 -> lightest height; black wall -> width 3 -> darkest.
        assert_eq!(light.height, config.light_stroke_height);
        assert_eq!(dark.height, config.dark_stroke_height);
        assert!((light.length() - 10.0 * 18.0).abs() < 1e-9);
    }
}
