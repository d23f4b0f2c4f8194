// error_handling.rs - Error taxonomy for the maze pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MazeError {
    #[error("Image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Pixel buffer holds {actual} bytes but {width}x{height} needs {expected}")]
    PixelBufferMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MazeError>;

/// Shorthand for parameter validation failures.
pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> MazeError {
    MazeError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

/// Fail with `InvalidParameter` unless `value` lies in `[lo, hi]`.
pub(crate) fn ensure_range(name: &'static str, value: f64, lo: f64, hi: f64) -> Result<()> {
    if value.is_finite() && value >= lo && value <= hi {
        Ok(())
    } else {
        Err(invalid(name, format!("{value} is outside [{lo}, {hi}]")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_range() {
        assert!(ensure_range("seed_bias", 0.5, 0.0, 1.0).is_ok());
        assert!(ensure_range("seed_bias", f64::NAN, 0.0, 1.0).is_err());
        let err = ensure_range("gamma", 2.0, 0.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("gamma"));
    }
}
