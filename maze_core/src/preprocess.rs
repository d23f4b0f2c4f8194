// preprocess.rs - Brightness / contrast / levels / gamma / invert adjustments
//
// Pure function over a grayscale buffer. All adjustments are folded into one
// 256-entry lookup table, so the cost is a single pass over the pixels.

use serde::{Deserialize, Serialize};

use crate::error_handling::{ensure_range, invalid, Result};
use crate::raster::GrayBuffer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessOptions {
    /// Additive offset in [-1, 1].
    pub brightness: f64,
    /// Contrast in [-1, 1]; 0 leaves the image unchanged.
    pub contrast: f64,
    /// Input level mapped to black, in [0, 1].
    pub black_point: f64,
    /// Input level mapped to white, in [0, 1].
    pub white_point: f64,
    /// Gamma > 0; values above 1 brighten midtones.
    pub gamma: f64,
    pub invert: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 0.0,
            black_point: 0.0,
            white_point: 1.0,
            gamma: 1.0,
            invert: false,
        }
    }
}

impl PreprocessOptions {
    pub fn validate(&self) -> Result<()> {
        ensure_range("brightness", self.brightness, -1.0, 1.0)?;
        ensure_range("contrast", self.contrast, -1.0, 1.0)?;
        ensure_range("black_point", self.black_point, 0.0, 1.0)?;
        ensure_range("white_point", self.white_point, 0.0, 1.0)?;
        if self.black_point >= self.white_point {
            return Err(invalid(
                "black_point",
                format!("{} must be below white_point {}", self.black_point, self.white_point),
            ));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(invalid("gamma", format!("{} must be positive", self.gamma)));
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    fn adjust(&self, v: f64) -> f64 {
        let span = self.white_point - self.black_point;
        let mut v = ((v - self.black_point) / span).clamp(0.0, 1.0);
        v += self.brightness;
        // keep the factor finite at contrast = 1
        let c = self.contrast.clamp(-1.0, 0.99);
        v = (v - 0.5) * ((1.0 + c) / (1.0 - c)) + 0.5;
        v = v.clamp(0.0, 1.0).powf(1.0 / self.gamma);
        if self.invert {
            v = 1.0 - v;
        }
        v.clamp(0.0, 1.0)
    }

    fn lut(&self) -> [u8; 256] {
        let mut lut = [0u8; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = (self.adjust(i as f64 / 255.0) * 255.0).round() as u8;
        }
        lut
    }
}

/// Apply the adjustments, returning a new buffer.
pub fn preprocess(image: &GrayBuffer, options: &PreprocessOptions) -> Result<GrayBuffer> {
    options.validate()?;
    if options.is_identity() {
        return Ok(image.clone());
    }
    Ok(image.map_lut(&options.lut()))
}
