// error_handling.rs - Error types for device I/O and plot jobs

use maze_core::MazeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("A plot job is already running on this device")]
    AlreadyPlotting,

    #[error("No device connected")]
    NotConnected,

    #[error("Transport failed: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Device closed the connection")]
    ConnectionClosed,

    #[error("Device answered {response:?} to {command:?}")]
    UnexpectedResponse { command: String, response: String },

    #[error("Invalid plotter config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Maze generation failed: {0}")]
    Maze(#[from] MazeError),
}

pub type Result<T> = std::result::Result<T, PlotError>;

pub(crate) fn invalid_config(reason: impl Into<String>) -> PlotError {
    PlotError::InvalidConfig { reason: reason.into() }
}
