//! Shape atlas: the fixed set of monochrome stencils that sprites are stamped with.
//!
//! - Implement [`ShapeAtlas`] to supply your own stencils.
//! - [`MaskAtlas`] stores grayscale masks, either unpacked from an 8x8 atlas image with
//!   [`MaskAtlas::from_packed`] or generated with [`MaskAtlas::procedural`].
use mint::Vector2;

use crate::error::{Error, Result};

/// Number of stencils in a full atlas. Shape ids live in `[0, ATLAS_SHAPE_COUNT)`.
pub const ATLAS_SHAPE_COUNT: u32 = 64;

/// Read-only lookup of stencil coverage keyed by shape id.
///
/// `uv` is the position inside the stamp's unit square, `(0, 0)` at one corner and `(1, 1)` at
/// the opposite one. Implementations return coverage in `[0, 1]` and `0.0` for ids or
/// coordinates they do not know.
pub trait ShapeAtlas: Send + Sync {
    fn shape_count(&self) -> u32;

    fn coverage(&self, id: u32, uv: Vector2<f32>) -> f32;
}

/// Grayscale stencils of a common cell size, sampled with nearest-texel lookup.
#[derive(Clone, Debug)]
pub struct MaskAtlas {
    cell_width: u32,
    cell_height: u32,
    masks: Vec<f32>,
    shape_count: u32,
}

impl MaskAtlas {
    /// Builds an atlas from per-shape masks, each `cell_width * cell_height` values in row-major
    /// order.
    pub fn from_masks(cell_width: u32, cell_height: u32, masks: Vec<Vec<f32>>) -> Result<Self> {
        if cell_width == 0 || cell_height == 0 {
            return Err(Error::InvalidAtlas("cell size must be > 0".into()));
        }
        if masks.is_empty() {
            return Err(Error::InvalidAtlas("atlas has no shapes".into()));
        }
        if masks.len() > ATLAS_SHAPE_COUNT as usize {
            return Err(Error::InvalidAtlas(format!(
                "atlas has {} shapes, at most {ATLAS_SHAPE_COUNT} are addressable",
                masks.len()
            )));
        }
        let texels = (cell_width as usize) * (cell_height as usize);
        let mut flat = Vec::with_capacity(texels * masks.len());
        for (id, mask) in masks.iter().enumerate() {
            if mask.len() != texels {
                return Err(Error::InvalidAtlas(format!(
                    "shape {id} has {} texels, expected {texels}",
                    mask.len()
                )));
            }
            flat.extend(mask.iter().map(|v| v.clamp(0.0, 1.0)));
        }
        Ok(Self {
            cell_width,
            cell_height,
            shape_count: masks.len() as u32,
            masks: flat,
        })
    }

    /// Unpacks a single-channel atlas image laid out as `columns x rows` equal cells.
    ///
    /// Shape ids are assigned row-major: id `i` lives in column `i % columns`, row `i / columns`.
    pub fn from_packed(
        luma: &[u8],
        width: u32,
        height: u32,
        columns: u32,
        rows: u32,
    ) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(Error::InvalidAtlas("columns and rows must be > 0".into()));
        }
        if columns.saturating_mul(rows) > ATLAS_SHAPE_COUNT {
            return Err(Error::InvalidAtlas(format!(
                "{columns}x{rows} cells exceed {ATLAS_SHAPE_COUNT} shapes"
            )));
        }
        if luma.len() != (width as usize) * (height as usize) {
            return Err(Error::InvalidAtlas(format!(
                "expected {} bytes for {width}x{height}, got {}",
                (width as usize) * (height as usize),
                luma.len()
            )));
        }
        if width % columns != 0 || height % rows != 0 {
            return Err(Error::InvalidAtlas(format!(
                "{width}x{height} does not divide into {columns}x{rows} cells"
            )));
        }
        let cell_width = width / columns;
        let cell_height = height / rows;
        let mut masks = Vec::with_capacity((columns * rows) as usize);
        for id in 0..columns * rows {
            let origin_x = (id % columns) * cell_width;
            let origin_y = (id / columns) * cell_height;
            let mut mask = Vec::with_capacity((cell_width * cell_height) as usize);
            for y in 0..cell_height {
                let row = ((origin_y + y) as usize) * (width as usize);
                for x in 0..cell_width {
                    mask.push(luma[row + (origin_x + x) as usize] as f32 / 255.0);
                }
            }
            masks.push(mask);
        }
        Self::from_masks(cell_width, cell_height, masks)
    }

    /// Generates a full atlas of [`ATLAS_SHAPE_COUNT`] simple stencils.
    ///
    /// Ids come in eight families of eight variants: squares, discs, rings, triangles, diamonds,
    /// bars, crosses and ellipses. Id `0` is the solid square.
    pub fn procedural(cell_size: u32) -> Self {
        let cell_size = cell_size.max(1);
        let inv = 1.0 / cell_size as f32;
        let masks: Vec<Vec<f32>> = (0..ATLAS_SHAPE_COUNT)
            .map(|id| {
                let mut mask = Vec::with_capacity((cell_size * cell_size) as usize);
                for y in 0..cell_size {
                    for x in 0..cell_size {
                        let u = (x as f32 + 0.5) * inv;
                        let v = (y as f32 + 0.5) * inv;
                        mask.push(if procedural_inside(id, u, v) { 1.0 } else { 0.0 });
                    }
                }
                mask
            })
            .collect();
        Self {
            cell_width: cell_size,
            cell_height: cell_size,
            masks: masks.into_iter().flatten().collect(),
            shape_count: ATLAS_SHAPE_COUNT,
        }
    }

    pub fn cell_size(&self) -> (u32, u32) {
        (self.cell_width, self.cell_height)
    }

    /// Fraction of texels in shape `id` with non-zero coverage.
    pub fn fill_ratio(&self, id: u32) -> f32 {
        if id >= self.shape_count {
            return 0.0;
        }
        let texels = (self.cell_width * self.cell_height) as usize;
        let start = id as usize * texels;
        let filled = self.masks[start..start + texels]
            .iter()
            .filter(|v| **v > 0.0)
            .count();
        filled as f32 / texels as f32
    }
}

impl ShapeAtlas for MaskAtlas {
    fn shape_count(&self) -> u32 {
        self.shape_count
    }

    #[inline]
    fn coverage(&self, id: u32, uv: Vector2<f32>) -> f32 {
        if id >= self.shape_count || !(0.0..1.0).contains(&uv.x) || !(0.0..1.0).contains(&uv.y) {
            return 0.0;
        }
        let tx = ((uv.x * self.cell_width as f32) as u32).min(self.cell_width - 1);
        let ty = ((uv.y * self.cell_height as f32) as u32).min(self.cell_height - 1);
        let texels = (self.cell_width as usize) * (self.cell_height as usize);
        let idx = id as usize * texels + (ty as usize) * (self.cell_width as usize) + tx as usize;
        self.masks[idx]
    }
}

fn procedural_inside(id: u32, u: f32, v: f32) -> bool {
    let family = id / 8;
    let t = (id % 8) as f32;
    let du = u - 0.5;
    let dv = v - 0.5;
    match family {
        0 => {
            let inset = t * 0.04;
            du.abs() <= 0.5 - inset && dv.abs() <= 0.5 - inset
        }
        1 => du * du + dv * dv <= (0.5 - t * 0.04).powi(2),
        2 => {
            let r2 = du * du + dv * dv;
            let inner = 0.1 + t * 0.04;
            r2 <= 0.25 && r2 >= inner * inner
        }
        3 => {
            // apex slides along the top edge
            let apex = t / 7.0;
            let half_width_at_v = v;
            let left = apex - apex * half_width_at_v;
            let right = apex + (1.0 - apex) * half_width_at_v;
            u >= left && u <= right
        }
        4 => du.abs() + dv.abs() <= 0.5 - t * 0.03,
        5 => dv.abs() <= 0.05 + t * 0.05,
        6 => {
            let half = 0.05 + t * 0.02;
            du.abs() <= half || dv.abs() <= half
        }
        _ => {
            let ry = 0.5 - t * 0.05;
            (du / 0.5).powi(2) + (dv / ry).powi(2) <= 1.0
        }
    }
}
