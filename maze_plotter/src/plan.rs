// plan.rs - Turn paper-space strokes into device commands
//
// The planner tracks the carriage position in whole motor steps and the pen
// state, so a travel move is only emitted when the next stroke does not start
// where the last one ended.

use maze_core::Point;

use crate::config::PlotterConfig;
use crate::protocol::DeviceCommand;
use crate::transform::PlotSegment;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pen {
    Up,
    Down(f64),
}

#[derive(Debug, Clone)]
pub struct MotionPlanner<'a> {
    config: &'a PlotterConfig,
    position: (i64, i64),
    pen: Pen,
}

impl<'a> MotionPlanner<'a> {
    /// Planner at the home position with the pen raised.
    pub fn new(config: &'a PlotterConfig) -> Self {
        Self { config, position: (0, 0), pen: Pen::Up }
    }

    pub fn position(&self) -> (i64, i64) {
        self.position
    }

    pub fn pen_is_down(&self) -> bool {
        matches!(self.pen, Pen::Down(_))
    }

    /// Motors on, servo limits and rate, pen raised.
    pub fn preamble(&mut self) -> Vec<DeviceCommand> {
        let c = self.config;
        self.pen = Pen::Up;
        vec![
            DeviceCommand::Motors(true),
            DeviceCommand::ServoUp(c.servo_position(c.pen_up_height)),
            DeviceCommand::ServoDown(c.servo_position(c.pen_down_height)),
            DeviceCommand::ServoRate(c.servo_rate),
            self.pen_to(c.pen_up_height),
        ]
    }

    /// Commands that draw one stroke from the current state.
    pub fn segment(&mut self, segment: &PlotSegment) -> Vec<DeviceCommand> {
        let mut commands = Vec::with_capacity(4);
        let start = self.to_steps(segment.start);
        let end = self.to_steps(segment.end);

        if start != self.position {
            commands.extend(self.lift());
            commands.push(self.move_to(start));
        }
        if self.pen != Pen::Down(segment.height) {
            commands.push(self.pen_to(segment.height));
            self.pen = Pen::Down(segment.height);
        }
        if end != self.position {
            commands.push(self.move_to(end));
        }
        commands
    }

    /// Raise the pen and drive home.
    pub fn return_home(&mut self) -> Vec<DeviceCommand> {
        let mut commands: Vec<DeviceCommand> = self.lift().into_iter().collect();
        let (x, y) = self.position;
        commands.push(DeviceCommand::home(x, y, self.config.steps_per_second()));
        self.position = (0, 0);
        commands
    }

    /// `return_home` followed by releasing the motors.
    pub fn finish(&mut self) -> Vec<DeviceCommand> {
        let mut commands = self.return_home();
        commands.push(DeviceCommand::Motors(false));
        commands
    }

    fn lift(&mut self) -> Option<DeviceCommand> {
        if self.pen_is_down() {
            self.pen = Pen::Up;
            Some(self.pen_to(self.config.pen_up_height))
        } else {
            None
        }
    }

    fn pen_to(&self, height: f64) -> DeviceCommand {
        DeviceCommand::PenHeight {
            position: self.config.servo_position(height),
            duration_ms: (self.config.pen_move_duration * 1000.0).round() as u32,
        }
    }

    fn move_to(&mut self, target: (i64, i64)) -> DeviceCommand {
        let (dx, dy) = (target.0 - self.position.0, target.1 - self.position.1);
        self.position = target;
        DeviceCommand::travel(dx, dy, self.config.steps_per_second())
    }

    fn to_steps(&self, p: Point) -> (i64, i64) {
        let spm = self.config.steps_per_mm;
        ((p.x * spm).round() as i64, (p.y * spm).round() as i64)
    }
}

/// The full command stream for a job: preamble, every stroke, finish.
pub fn plan_job(segments: &[PlotSegment], config: &PlotterConfig) -> Vec<DeviceCommand> {
    let mut planner = MotionPlanner::new(config);
    let mut commands = planner.preamble();
    for segment in segments {
        commands.extend(planner.segment(segment));
    }
    commands.extend(planner.finish());
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(x1: f64, y1: f64, x2: f64, y2: f64, height: f64) -> PlotSegment {
        PlotSegment { start: Point::new(x1, y1), end: Point::new(x2, y2), height }
    }

    fn config() -> PlotterConfig {
        PlotterConfig { steps_per_mm: 10.0, ..Default::default() }
    }

    #[test]
    fn test_contiguous_strokes_share_one_pen_drop() {
        let config = config();
        let mut planner = MotionPlanner::new(&config);
        planner.preamble();

        let first = planner.segment(&stroke(1.0, 1.0, 2.0, 1.0, 0.0));
        assert_eq!(first.len(), 3, "travel, drop, draw: {first:?}");
        assert!(matches!(first[0], DeviceCommand::Move { steps_a: 20, steps_b: 0, .. }));
        assert!(matches!(first[1], DeviceCommand::PenHeight { position: 7500, .. }));

        let second = planner.segment(&stroke(2.0, 1.0, 2.0, 3.0, 0.0));
        assert_eq!(second.len(), 1, "contiguous stroke only draws: {second:?}");
        assert!(matches!(second[0], DeviceCommand::Move { steps_a: 20, steps_b: -20, .. }));
        assert_eq!(planner.position(), (20, 30));
    }

    #[test]
    fn test_gap_lifts_then_travels_then_drops() {
        let config = config();
        let mut planner = MotionPlanner::new(&config);
        planner.segment(&stroke(0.0, 0.0, 1.0, 0.0, 0.0));
        let cmds = planner.segment(&stroke(5.0, 0.0, 6.0, 0.0, 0.0));
        let up = config.servo_position(config.pen_up_height);
        assert!(matches!(cmds[0], DeviceCommand::PenHeight { position, .. } if position == up));
        assert!(matches!(cmds[1], DeviceCommand::Move { steps_a: 40, steps_b: 40, .. }));
        assert!(matches!(cmds[2], DeviceCommand::PenHeight { position: 7500, .. }));
        assert!(matches!(cmds[3], DeviceCommand::Move { steps_a: 10, steps_b: 10, .. }));
    }

    #[test]
    fn test_height_change_on_contiguous_stroke_adjusts_pen_in_place() {
        let config = config();
        let mut planner = MotionPlanner::new(&config);
        planner.segment(&stroke(0.0, 0.0, 1.0, 0.0, 0.0));
        let cmds = planner.segment(&stroke(1.0, 0.0, 2.0, 0.0, 40.0));
        assert_eq!(cmds.len(), 2);
        assert_eq!(
            cmds[0],
            DeviceCommand::PenHeight { position: config.servo_position(40.0), duration_ms: 300 }
        );
    }

    #[test]
    fn test_job_ends_lifted_at_home() {
        let config = config();
        let segments = [stroke(1.0, 0.0, 2.0, 0.0, 0.0), stroke(2.0, 0.0, 2.0, 1.0, 0.0)];
        let cmds = plan_job(&segments, &config);
        assert_eq!(cmds[0], DeviceCommand::Motors(true));
        let n = cmds.len();
        assert_eq!(cmds[n - 1], DeviceCommand::Motors(false));
        assert!(matches!(cmds[n - 2], DeviceCommand::Home { .. }));
        assert!(matches!(
            cmds[n - 3],
            DeviceCommand::PenHeight { position, .. } if position == config.servo_position(100.0)
        ));
        let travels = cmds.iter().filter(|c| matches!(c, DeviceCommand::Move { .. })).count();
        assert_eq!(travels, 3);
    }

    #[test]
    fn test_zero_length_stroke_emits_no_move() {
        let config = config();
        let mut planner = MotionPlanner::new(&config);
        let cmds = planner.segment(&stroke(0.0, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(cmds.len(), 1);
        assert!(planner.pen_is_down());
    }
}
