// raster.rs - 8-bit grayscale buffer the pipeline reads brightness from

use std::path::Path;

use image::DynamicImage;

use crate::error_handling::{MazeError, Result};

/// Neutral brightness returned for queries outside the image.
pub const NEUTRAL: f64 = 0.5;

/// Row-major luma pixels, 0 = black, 255 = white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl GrayBuffer {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MazeError::EmptyImage { width, height });
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(MazeError::PixelBufferMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    pub fn filled(width: u32, height: u32, value: u8) -> Result<Self> {
        Self::new(width, height, vec![value; width as usize * height as usize])
    }

    /// Build from a closure evaluated at every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Result<Self> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self::new(width, height, pixels)
    }

    pub fn from_dynamic(img: &DynamicImage) -> Result<Self> {
        let luma = img.to_luma8();
        let (width, height) = luma.dimensions();
        Self::new(width, height, luma.into_raw())
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)?;
        log::debug!("Loaded {} ({}x{})", path.display(), img.width(), img.height());
        Self::from_dynamic(&img)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.pixels[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    /// Brightness in [0,1] of the pixel under `(x, y)`; `NEUTRAL` outside.
    pub fn brightness_at(&self, x: f64, y: f64) -> f64 {
        if !(x >= 0.0 && y >= 0.0) {
            return NEUTRAL;
        }
        match self.get(x.floor() as u32, y.floor() as u32) {
            Some(v) => v as f64 / 255.0,
            None => NEUTRAL,
        }
    }

    /// Mean brightness over the half-open pixel block `[x0,x1) x [y0,y1)`.
    pub fn block_mean(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> f64 {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return NEUTRAL;
        }
        let mut sum = 0u64;
        for y in y0..y1 {
            let row = y as usize * self.width as usize;
            sum += self.pixels[row + x0 as usize..row + x1 as usize]
                .iter()
                .map(|&v| v as u64)
                .sum::<u64>();
        }
        let count = (x1 - x0) as u64 * (y1 - y0) as u64;
        sum as f64 / (count as f64 * 255.0)
    }

    /// Same dimensions, pixels remapped through a lookup table.
    pub(crate) fn map_lut(&self, lut: &[u8; 256]) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&v| lut[v as usize]).collect(),
        }
    }
}
