// config.rs - Physical plotter settings: paper, motion, pen and servo

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error_handling::{invalid_config, Result};

/// Step rate at 100% speed.
pub const MAX_STEPS_PER_SECOND: f64 = 2200.0;

/// Drawable rectangle on the paper, in millimetres from the home corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotterConfig {
    pub paper_width_mm: f64,
    pub paper_height_mm: f64,
    pub margin_x_mm: f64,
    pub margin_y_mm: f64,
    pub steps_per_mm: f64,
    /// Percentage of `MAX_STEPS_PER_SECOND`, in (0,100].
    pub speed_percent: f64,
    /// Logical heights on the 0-100 scale: 0 = full pressure, 100 = lifted.
    pub pen_up_height: f64,
    pub pen_down_height: f64,
    /// Height used for the thinnest stroke.
    pub light_stroke_height: f64,
    /// Height used for the thickest stroke.
    pub dark_stroke_height: f64,
    pub servo_min: u32,
    pub servo_max: u32,
    pub servo_rate: u32,
    /// Flip the height scale for servos mounted the other way round.
    pub invert_height: bool,
    /// Seconds a pen lift or drop takes.
    pub pen_move_duration: f64,
    pub ack_timeout_ms: u64,
    /// Stroke widths mapped onto `light_stroke_height..dark_stroke_height`.
    pub min_stroke_width: f64,
    pub max_stroke_width: f64,
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            paper_width_mm: 297.0,
            paper_height_mm: 210.0,
            margin_x_mm: 15.0,
            margin_y_mm: 15.0,
            steps_per_mm: 80.0,
            speed_percent: 50.0,
            pen_up_height: 100.0,
            pen_down_height: 0.0,
            light_stroke_height: 40.0,
            dark_stroke_height: 0.0,
            servo_min: 7500,
            servo_max: 28000,
            servo_rate: 150,
            invert_height: false,
            pen_move_duration: 0.3,
            ack_timeout_ms: 2000,
            min_stroke_width: 1.0,
            max_stroke_width: 3.0,
        }
    }
}

impl PlotterConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("paper_width_mm", self.paper_width_mm),
            ("paper_height_mm", self.paper_height_mm),
            ("steps_per_mm", self.steps_per_mm),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid_config(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.speed_percent > 0.0 && self.speed_percent <= 100.0) {
            return Err(invalid_config(format!(
                "speed_percent {} is outside (0,100]",
                self.speed_percent
            )));
        }
        let heights = [
            ("pen_up_height", self.pen_up_height),
            ("pen_down_height", self.pen_down_height),
            ("light_stroke_height", self.light_stroke_height),
            ("dark_stroke_height", self.dark_stroke_height),
        ];
        for (name, value) in heights {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid_config(format!("{name} {value} is outside [0,100]")));
            }
        }
        if self.servo_min >= self.servo_max {
            return Err(invalid_config(format!(
                "servo_min {} must be below servo_max {}",
                self.servo_min, self.servo_max
            )));
        }
        if !(self.pen_move_duration.is_finite() && self.pen_move_duration >= 0.0) {
            return Err(invalid_config("pen_move_duration must be non-negative"));
        }
        if !(self.min_stroke_width >= 0.0 && self.max_stroke_width >= self.min_stroke_width) {
            return Err(invalid_config(format!(
                "stroke width range {}..{} is empty",
                self.min_stroke_width, self.max_stroke_width
            )));
        }
        let area = self.plot_area();
        if !(area.width > 0.0 && area.height > 0.0) {
            return Err(invalid_config("margins leave no drawable area"));
        }
        Ok(())
    }

    pub fn steps_per_second(&self) -> f64 {
        MAX_STEPS_PER_SECOND * self.speed_percent / 100.0
    }

    pub fn plot_area(&self) -> PlotArea {
        PlotArea {
            x: self.margin_x_mm,
            y: self.margin_y_mm,
            width: self.paper_width_mm - 2.0 * self.margin_x_mm,
            height: self.paper_height_mm - 2.0 * self.margin_y_mm,
        }
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Servo position for a logical height, honouring `invert_height`.
    pub fn servo_position(&self, height: f64) -> u32 {
        let mut t = height.clamp(0.0, 100.0) / 100.0;
        if self.invert_height {
            t = 1.0 - t;
        }
        let span = (self.servo_max - self.servo_min) as f64;
        self.servo_min + (span * t).round() as u32
    }

    /// Pen height for a stroke width: the thinnest stroke gets
    /// `light_stroke_height`, the thickest `dark_stroke_height`.
    pub fn stroke_height(&self, stroke_width: f64) -> f64 {
        let range = self.max_stroke_width - self.min_stroke_width;
        let t = if range > 0.0 {
            ((stroke_width - self.min_stroke_width) / range).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.light_stroke_height + (self.dark_stroke_height - self.light_stroke_height) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlotterConfig::default();
        config.validate().unwrap();
        assert_eq!(config.steps_per_second(), 1100.0);
        assert_eq!(
            config.plot_area(),
            PlotArea { x: 15.0, y: 15.0, width: 267.0, height: 180.0 }
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            PlotterConfig::from_json(r#"{"speed_percent": 100, "invert_height": true}"#).unwrap();
        assert_eq!(config.steps_per_second(), 2200.0);
        assert!(config.invert_height);
        assert_eq!(config.steps_per_mm, 80.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        for json in [
            r#"{"speed_percent": 0}"#,
            r#"{"pen_up_height": 120}"#,
            r#"{"servo_min": 30000}"#,
            r#"{"margin_x_mm": 200}"#,
            r#"{"min_stroke_width": 4}"#,
        ] {
            assert!(
                matches!(
                    PlotterConfig::from_json(json),
                    Err(crate::PlotError::InvalidConfig { .. })
                ),
                "{json} should be rejected"
            );
        }
        assert!(matches!(
            PlotterConfig::from_json("{not json"),
            Err(crate::PlotError::Serialization(_))
        ));
    }

    #[test]
    fn test_servo_position_scale_and_inversion() {
        let mut config = PlotterConfig::default();
        assert_eq!(config.servo_position(0.0), 7500);
        assert_eq!(config.servo_position(100.0), 28000);
        assert_eq!(config.servo_position(50.0), 17750);
        assert_eq!(config.servo_position(250.0), 28000);
        config.invert_height = true;
        assert_eq!(config.servo_position(100.0), 7500);
    }

    #[test]
    fn test_stroke_height_interpolates_and_clamps() {
        let config = PlotterConfig::default();
        assert_eq!(config.stroke_height(1.0), 40.0);
        assert_eq!(config.stroke_height(3.0), 0.0);
        assert_eq!(config.stroke_height(2.0), 20.0);
        assert_eq!(config.stroke_height(0.2), 40.0);
        assert_eq!(config.stroke_height(9.0), 0.0);

        let flat =
            PlotterConfig { min_stroke_width: 2.0, max_stroke_width: 2.0, ..Default::default() };
        assert_eq!(flat.stroke_height(5.0), 40.0);
    }
}
