//! Pixel-side data for the search: raster buffers, the target and composed images, the
//! shape atlas, and the mapping between world units and pixels.
pub mod atlas;
pub mod geometry;
pub mod raster;
pub mod target;

pub use atlas::{MaskAtlas, ShapeAtlas, ATLAS_SHAPE_COUNT};
pub use geometry::{BoundingBox, CanvasGeometry, PixelRect};
pub use raster::RgbaRaster;
pub use target::{ComposedImage, TargetImage};
