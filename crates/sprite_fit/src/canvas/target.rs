//! The fixed image being approximated and the accumulation buffer built from committed sprites.
use glam::Vec4;

use crate::canvas::geometry::PixelRect;
use crate::canvas::raster::RgbaRaster;
use crate::error::Result;

/// Read-only RGBA image the search tries to reproduce.
#[derive(Clone, Debug)]
pub struct TargetImage {
    raster: RgbaRaster,
}

impl TargetImage {
    pub fn new(raster: RgbaRaster) -> Self {
        Self { raster }
    }

    /// Decode tightly packed 8-bit RGBA bytes.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(RgbaRaster::from_rgba8(width, height, bytes)?))
    }

    /// A target of a single color.
    pub fn uniform(width: u32, height: u32, color: Vec4) -> Self {
        Self::new(RgbaRaster::filled(width, height, color))
    }

    pub fn size(&self) -> (u32, u32) {
        self.raster.size()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.raster.get(x, y)
    }

    pub fn raster(&self) -> &RgbaRaster {
        &self.raster
    }
}

/// Rendered pixels for one candidate inside its pixel rectangle, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
    pub rect: PixelRect,
    pub pixels: Vec<Vec4>,
}

/// Sum of all committed sprites so far. Starts transparent black and only changes on commit.
#[derive(Clone, Debug)]
pub struct ComposedImage {
    raster: RgbaRaster,
}

impl ComposedImage {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            raster: RgbaRaster::blank(width, height),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.raster.size()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.raster.get(x, y)
    }

    pub fn raster(&self) -> &RgbaRaster {
        &self.raster
    }

    /// Overwrites the patch's rectangle with its pixels.
    pub(crate) fn apply_patch(&mut self, patch: &Patch) {
        debug_assert_eq!(patch.pixels.len(), patch.rect.len());
        for ((x, y), px) in patch.rect.pixels().zip(patch.pixels.iter()) {
            self.raster.set(x, y, *px);
        }
    }

    /// Sum of squared RGB differences against `target` over the whole canvas.
    pub fn squared_error(&self, target: &TargetImage) -> f64 {
        self.raster
            .pixels()
            .iter()
            .zip(target.raster().pixels())
            .map(|(c, t)| (t.truncate() - c.truncate()).length_squared() as f64)
            .sum()
    }
}
