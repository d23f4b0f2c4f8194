// lib.rs - Pen plotter bridge for portrait mazes
// Maps ordered maze geometry onto paper and drives the controller over a
// line-based command protocol.

pub mod bridge;
pub mod config;
pub mod error_handling;
pub mod estimate;
pub mod link;
pub mod plan;
pub mod protocol;
pub mod transform;

pub use bridge::{PlotControl, PlotOutcome, PlotProgress, PlotState, PlotterBridge};
pub use config::{PlotArea, PlotterConfig, MAX_STEPS_PER_SECOND};
pub use error_handling::{PlotError, Result};
pub use estimate::{estimate, PlotEstimate};
pub use link::DeviceLink;
pub use plan::{plan_job, MotionPlanner};
pub use protocol::{Ack, DeviceCommand};
pub use transform::{plot_segments, PlotSegment, PlotTransform};
