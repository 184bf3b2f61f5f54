//! Sprite placement hypotheses and the space they are drawn from.
use std::f32::consts::TAU;

use glam::Vec2;
use mint::Vector2;
use rand::RngCore;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::canvas::atlas::ShapeAtlas;
use crate::canvas::geometry::BoundingBox;
use crate::search::{rand01, rand_range};

/// A proposed stamp placement.
///
/// Position is in world units (`x` in `[0, aspect_ratio]`, `y` in `[0, 1]`). A negative width or
/// height mirrors the stencil along that axis.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hypothesis {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Rotation in radians, kept in `[0, 2π)`.
    pub angle: f32,
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
    pub atlas_id: u32,
}

/// Ranges that random hypotheses are drawn from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchSpace {
    pub aspect_ratio: f32,
    /// Number of atlas shapes; ids are kept in `[0, shape_count)`.
    pub shape_count: u32,
}

impl SearchSpace {
    pub fn new(aspect_ratio: f32, shape_count: u32) -> Self {
        Self {
            aspect_ratio,
            shape_count: shape_count.max(1),
        }
    }

    #[inline]
    pub(crate) fn random_atlas_id(&self, rng: &mut dyn RngCore) -> u32 {
        rng.next_u32() % self.shape_count
    }
}

impl Hypothesis {
    /// Draws a hypothesis uniformly: position inside the canvas, size in `[-1, 1)`, angle in
    /// `[0, 2π)`, alpha in `[0.75, 1)`, any atlas id.
    pub fn random(rng: &mut dyn RngCore, space: &SearchSpace) -> Self {
        Self {
            x: rand01(rng) * space.aspect_ratio,
            y: rand01(rng),
            width: rand_range(rng, -1.0, 1.0),
            height: rand_range(rng, -1.0, 1.0),
            angle: (rand01(rng) * TAU).rem_euclid(TAU),
            alpha: rand_range(rng, 0.75, 1.0),
            atlas_id: space.random_atlas_id(rng),
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Rotation-expanded extent clipped to the canvas, in normalized canvas units.
    pub fn bounding_box(&self, aspect_ratio: f32) -> BoundingBox {
        let (sin, cos) = self.angle.sin_cos();
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for corner in 0..4 {
            let lx = if corner / 2 == 0 { -0.5 } else { 0.5 } * self.width;
            let ly = if corner % 2 == 0 { -0.5 } else { 0.5 } * self.height;
            let rotated = Vec2::new(cos * lx - sin * ly, sin * lx + cos * ly);
            min = min.min(rotated);
            max = max.max(rotated);
        }
        let pos = self.position();
        BoundingBox::from_world_extents(pos + min, pos + max, aspect_ratio)
    }

    /// Precomputed inverse transform, or `None` for a degenerate (zero-size) stamp.
    pub fn footprint(&self) -> Option<Footprint> {
        if self.width == 0.0 || self.height == 0.0 || !self.width.is_finite() {
            return None;
        }
        if !self.height.is_finite() || self.alpha <= 0.0 {
            return None;
        }
        let (sin, cos) = self.angle.sin_cos();
        Some(Footprint {
            position: self.position(),
            inv_size: Vec2::new(1.0 / self.width, 1.0 / self.height),
            sin,
            cos,
            alpha: self.alpha.min(1.0),
            atlas_id: self.atlas_id,
        })
    }
}

/// World-to-stencil mapping of one hypothesis, ready for per-pixel lookups.
#[derive(Clone, Copy, Debug)]
pub struct Footprint {
    position: Vec2,
    inv_size: Vec2,
    sin: f32,
    cos: f32,
    alpha: f32,
    atlas_id: u32,
}

impl Footprint {
    /// Stencil coordinates of world point `p`; inside the stamp when both lie in `[0, 1)`.
    #[inline]
    pub fn uv(&self, p: Vec2) -> Vec2 {
        let d = p - self.position;
        let local = Vec2::new(self.cos * d.x + self.sin * d.y, -self.sin * d.x + self.cos * d.y);
        local * self.inv_size + Vec2::splat(0.5)
    }

    /// Opacity the stamp contributes at world point `p`: stencil coverage times alpha.
    #[inline]
    pub fn opacity(&self, atlas: &dyn ShapeAtlas, p: Vec2) -> f32 {
        let uv = self.uv(p);
        if !(0.0..1.0).contains(&uv.x) || !(0.0..1.0).contains(&uv.y) {
            return 0.0;
        }
        atlas.coverage(self.atlas_id, Vector2::from(uv)) * self.alpha
    }
}
