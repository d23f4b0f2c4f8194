// protocol.rs - Text command set understood by the pen plotter controller
//
// Every command is one ASCII line terminated by `\r`. The controller answers
// `OK` (or a text line for the version query); anything starting with `!`
// is an error report.

use std::fmt;
use std::time::Duration;

use crate::error_handling::{PlotError, Result};

pub const TERMINATOR: char = '\r';

/// Output pin the pen servo is wired to.
const SERVO_PIN: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Firmware version query.
    Version,
    /// Energise (`true`) or release both steppers.
    Motors(bool),
    /// Servo position used for the raised pen.
    ServoUp(u32),
    /// Servo position used for the lowered pen.
    ServoDown(u32),
    /// Servo transition rate.
    ServoRate(u32),
    /// Move the pen servo to an absolute position.
    PenHeight { position: u32, duration_ms: u32 },
    /// Relative carriage move in motor steps.
    Move { duration_ms: u32, steps_a: i64, steps_b: i64 },
    /// Return the carriage to the origin.
    Home { step_rate: u32, duration_ms: u32 },
}

impl DeviceCommand {
    /// Relative XY move over `(dx, dy)` steps at `steps_per_second`.
    /// The two motors see `dx + dy` and `dx - dy`.
    pub fn travel(dx: i64, dy: i64, steps_per_second: f64) -> Self {
        Self::Move {
            duration_ms: motion_ms((dx as f64).hypot(dy as f64), steps_per_second),
            steps_a: dx + dy,
            steps_b: dx - dy,
        }
    }

    /// Return home from `(x, y)` steps away.
    pub fn home(x: i64, y: i64, steps_per_second: f64) -> Self {
        Self::Home {
            step_rate: steps_per_second.round().max(1.0) as u32,
            duration_ms: motion_ms((x as f64).hypot(y as f64), steps_per_second),
        }
    }

    /// Time the physical action takes once acknowledged.
    pub fn duration(&self) -> Duration {
        match self {
            Self::PenHeight { duration_ms, .. }
            | Self::Move { duration_ms, .. }
            | Self::Home { duration_ms, .. } => Duration::from_millis(*duration_ms as u64),
            _ => Duration::ZERO,
        }
    }

    /// Whether the controller replies with free text instead of `OK`.
    pub fn expects_text(&self) -> bool {
        matches!(self, Self::Version)
    }

    /// Bytes to put on the wire.
    pub fn to_wire(&self) -> String {
        format!("{self}{TERMINATOR}")
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version => write!(f, "V"),
            Self::Motors(true) => write!(f, "EM,1,1"),
            Self::Motors(false) => write!(f, "EM,0,0"),
            Self::ServoUp(v) => write!(f, "SC,4,{v}"),
            Self::ServoDown(v) => write!(f, "SC,5,{v}"),
            Self::ServoRate(v) => write!(f, "SC,10,{v}"),
            Self::PenHeight { position, .. } => write!(f, "S2,{position},{SERVO_PIN}"),
            Self::Move { duration_ms, steps_a, steps_b } => {
                write!(f, "SM,{duration_ms},{steps_a},{steps_b}")
            }
            Self::Home { step_rate, .. } => write!(f, "HM,{step_rate}"),
        }
    }
}

/// Parsed acknowledgment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Ok,
    Text(String),
    /// No answer within the acknowledgment timeout.
    TimedOut,
}

/// Interpret one trimmed response line for `command`.
pub fn parse_ack(command: &DeviceCommand, line: &str) -> Result<Ack> {
    let line = line.trim();
    let unexpected = || PlotError::UnexpectedResponse {
        command: command.to_string(),
        response: line.to_string(),
    };
    if line.starts_with('!') {
        return Err(unexpected());
    }
    if command.expects_text() {
        return Ok(Ack::Text(line.to_string()));
    }
    if line == "OK" {
        Ok(Ack::Ok)
    } else {
        Err(unexpected())
    }
}

fn motion_ms(steps: f64, steps_per_second: f64) -> u32 {
    if steps <= 0.0 {
        return 0;
    }
    (steps / steps_per_second * 1000.0).ceil().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(DeviceCommand::Version.to_wire(), "V\r");
        assert_eq!(DeviceCommand::Motors(true).to_wire(), "EM,1,1\r");
        assert_eq!(DeviceCommand::Motors(false).to_string(), "EM,0,0");
        assert_eq!(DeviceCommand::ServoUp(28000).to_string(), "SC,4,28000");
        assert_eq!(DeviceCommand::ServoDown(7500).to_string(), "SC,5,7500");
        assert_eq!(DeviceCommand::ServoRate(150).to_string(), "SC,10,150");
        assert_eq!(
            DeviceCommand::PenHeight { position: 17750, duration_ms: 300 }.to_string(),
            "S2,17750,4"
        );
    }

    #[test]
    fn test_travel_uses_mixed_axis_kinematics() {
        let cmd = DeviceCommand::travel(300, 400, 1000.0);
        assert_eq!(cmd, DeviceCommand::Move { duration_ms: 500, steps_a: 700, steps_b: -100 });
        assert_eq!(cmd.to_string(), "SM,500,700,-100");
        assert_eq!(cmd.duration(), Duration::from_millis(500));

        // Tiny moves still take at least a millisecond.
        let tiny = DeviceCommand::travel(1, 0, 2200.0);
        assert_eq!(tiny.duration(), Duration::from_millis(1));
    }

    #[test]
    fn test_home_duration_covers_the_distance() {
        let cmd = DeviceCommand::home(1100, 0, 1100.0);
        assert_eq!(cmd, DeviceCommand::Home { step_rate: 1100, duration_ms: 1000 });
        assert_eq!(cmd.to_string(), "HM,1100");
        assert_eq!(DeviceCommand::home(0, 0, 1100.0).duration(), Duration::ZERO);
    }

    #[test]
    fn test_parse_ack() {
        let mv = DeviceCommand::travel(1, 1, 1000.0);
        assert_eq!(parse_ack(&mv, "OK\r\n").unwrap(), Ack::Ok);
        assert!(matches!(
            parse_ack(&mv, "!8 Err: Unknown command"),
            Err(PlotError::UnexpectedResponse { .. })
        ));
        assert!(parse_ack(&mv, "huh").is_err());

        let version =
            parse_ack(&DeviceCommand::Version, "EBBv13_and_above Firmware Version 2.8.1\r\n")
                .unwrap();
        assert_eq!(version, Ack::Text("EBBv13_and_above Firmware Version 2.8.1".into()));
        assert!(parse_ack(&DeviceCommand::Version, "!0 Err").is_err());
    }
}
