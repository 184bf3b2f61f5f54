//! Canvas geometry: world units, normalized canvas units, and pixel rectangles.
//!
//! World space spans `x in [0, aspect_ratio]` and `y in [0, 1]`; a stamp of size 1 is as tall
//! as the canvas. Normalized canvas space divides world `x` by the aspect ratio so both axes
//! span `[0, 1]`. [`BoundingBox`] lives in normalized space, [`PixelRect`] in pixel space.
use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pixel dimensions of the canvas and its horizontal aspect correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasGeometry {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f32,
}

impl CanvasGeometry {
    pub fn new(width: u32, height: u32, aspect_ratio: f32) -> Self {
        Self {
            width,
            height,
            aspect_ratio,
        }
    }

    /// World-space center of pixel `(px, py)`.
    #[inline]
    pub fn pixel_center(&self, px: u32, py: u32) -> Vec2 {
        Vec2::new(
            (px as f32 + 0.5) / self.width as f32 * self.aspect_ratio,
            (py as f32 + 0.5) / self.height as f32,
        )
    }

    /// Total pixel count, used to normalize scores.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Pixels covered by a normalized bounding box, or `None` when it covers no pixel.
    pub fn pixel_rect(&self, bounds: &BoundingBox) -> Option<PixelRect> {
        if bounds.is_empty() {
            return None;
        }
        let w = self.width as f32;
        let h = self.height as f32;
        let x0 = (bounds.min.x * w).floor().clamp(0.0, w) as u32;
        let y0 = (bounds.min.y * h).floor().clamp(0.0, h) as u32;
        let x1 = (bounds.max.x * w).ceil().clamp(0.0, w) as u32;
        let y1 = (bounds.max.y * h).ceil().clamp(0.0, h) as u32;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect { x0, y0, x1, y1 })
    }
}

/// Axis-aligned extent in normalized canvas units, clipped to `[0, 1]` on both axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl BoundingBox {
    pub const EMPTY: BoundingBox = BoundingBox {
        min: Vec2::ZERO,
        max: Vec2::ZERO,
    };

    /// Builds a box from world-space extents, undoing the aspect correction on `x` and clipping
    /// to the canvas.
    pub fn from_world_extents(min: Vec2, max: Vec2, aspect_ratio: f32) -> Self {
        let inv_aspect = if aspect_ratio > 0.0 {
            1.0 / aspect_ratio
        } else {
            0.0
        };
        let min = Vec2::new((min.x * inv_aspect).clamp(0.0, 1.0), min.y.clamp(0.0, 1.0));
        let max = Vec2::new((max.x * inv_aspect).clamp(0.0, 1.0), max.y.clamp(0.0, 1.0));
        if min.x.is_nan() || min.y.is_nan() || max.x.is_nan() || max.y.is_nan() {
            return Self::EMPTY;
        }
        Self { min, max }
    }

    pub fn width(&self) -> f32 {
        (self.max.x - self.min.x).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.max.y - self.min.y).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.area() <= 0.0
    }

    /// Returns `true` if the boxes share a region of positive area.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn len(&self) -> usize {
        (self.width() as usize) * (self.height() as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates `(x, y)` in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y0..self.y1).flat_map(move |y| (self.x0..self.x1).map(move |x| (x, y)))
    }
}
