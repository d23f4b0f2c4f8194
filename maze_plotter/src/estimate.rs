// estimate.rs - Up-front plot duration from stroke geometry and speed

use std::time::Duration;

use maze_core::Point;
use serde::Serialize;

use crate::config::PlotterConfig;
use crate::transform::PlotSegment;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PlotEstimate {
    pub draw_steps: f64,
    pub travel_steps: f64,
    /// Pen-up moves, counting the first one from home.
    pub repositions: usize,
    pub seconds: f64,
}

impl PlotEstimate {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.seconds.max(0.0))
    }
}

/// Motion time plus a lift and a drop for every reposition. The final
/// return home is not counted.
pub fn estimate(segments: &[PlotSegment], config: &PlotterConfig) -> PlotEstimate {
    let spm = config.steps_per_mm;
    let mut est = PlotEstimate::default();
    let mut pen = Point::default();
    for seg in segments {
        if seg.start != pen {
            est.travel_steps += pen.distance(seg.start) * spm;
            est.repositions += 1;
        }
        est.draw_steps += seg.length() * spm;
        pen = seg.end;
    }
    est.seconds = (est.travel_steps + est.draw_steps) / config.steps_per_second()
        + 2.0 * config.pen_move_duration * est.repositions as f64;
    est
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(x: f64) -> PlotSegment {
        PlotSegment { start: Point::new(x, 0.0), end: Point::new(x + 1.0, 0.0), height: 0.0 }
    }

    #[test]
    fn test_three_disjoint_unit_segments() {
        let config = PlotterConfig::default();
        assert_eq!(config.steps_per_second(), 1100.0);
        let est = estimate(&[unit(10.0), unit(20.0), unit(30.0)], &config);

        // Travel 10 + 9 + 9 mm, draw 3 mm, at 80 steps/mm.
        assert_eq!(est.repositions, 3);
        assert!((est.travel_steps - 28.0 * 80.0).abs() < 1e-9);
        assert!((est.draw_steps - 3.0 * 80.0).abs() < 1e-9);
        let expected = (est.travel_steps + est.draw_steps) / 1100.0 + 2.0 * 0.3 * 3.0;
        assert!((est.seconds - expected).abs() < 1e-9);
        assert!((est.seconds - (2480.0 / 1100.0 + 1.8)).abs() < 1e-9);
    }

    #[test]
    fn test_contiguous_strokes_do_not_reposition() {
        let config = PlotterConfig::default();
        let est = estimate(&[unit(0.0), unit(1.0), unit(2.0)], &config);
        assert_eq!(est.repositions, 0);
        assert_eq!(est.travel_steps, 0.0);
        assert!((est.seconds - 240.0 / 1100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_job_is_free() {
        let est = estimate(&[], &PlotterConfig::default());
        assert_eq!(est, PlotEstimate::default());
        assert_eq!(est.duration(), Duration::ZERO);
    }
}
