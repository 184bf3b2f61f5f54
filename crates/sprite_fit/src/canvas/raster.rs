//! Raster storage for RGBA pixel values.
//!
//! Channels are stored as linear `f32` in `[0, 1]`, one [`Vec4`] per pixel, row-major.
use glam::Vec4;

use crate::error::{Error, Result};

/// A `width x height` grid of RGBA pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbaRaster {
    width: u32,
    height: u32,
    data: Vec<Vec4>,
}

impl RgbaRaster {
    /// Create a new raster with every pixel set to `fill`.
    pub fn filled(width: u32, height: u32, fill: Vec4) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            data: vec![fill; len],
        }
    }

    /// Create a new fully transparent black raster.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::filled(width, height, Vec4::ZERO)
    }

    /// Wrap existing pixels. Fails if `data.len() != width * height`.
    pub fn from_pixels(width: u32, height: u32, data: Vec<Vec4>) -> Result<Self> {
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(Error::InvalidImage(format!(
                "expected {expected} pixels for {width}x{height}, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode tightly packed 8-bit RGBA bytes.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if bytes.len() != expected {
            return Err(Error::InvalidImage(format!(
                "expected {expected} bytes for {width}x{height} RGBA8, got {}",
                bytes.len()
            )));
        }
        let data = bytes
            .chunks_exact(4)
            .map(|px| {
                Vec4::new(
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                    px[3] as f32 / 255.0,
                )
            })
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Encode to tightly packed 8-bit RGBA bytes, clamping each channel.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 4);
        for px in &self.data {
            out.extend_from_slice(&encode_rgba8(*px));
        }
        out
    }

    /// Get the size of the raster as `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.data
    }

    /// Get the pixel at `(x, y)`, returning transparent black if out of bounds.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        if x >= self.width || y >= self.height {
            return Vec4::ZERO;
        }
        self.data[self.index(x, y)]
    }

    /// Set the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: Vec4) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.data[i] = value;
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

/// Clamp and quantize a color to 8-bit RGBA.
#[inline]
pub fn encode_rgba8(color: Vec4) -> [u8; 4] {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}
