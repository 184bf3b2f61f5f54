use std::path::Path;

use anyhow::Context;
use sprite_fit::prelude::{ChosenSequence, ComposedImage, MaskAtlas, TargetImage};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Packed atlases hold their 64 shapes as an 8x8 grid of cells.
pub const ATLAS_GRID: u32 = 8;

/// Installs a fmt subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Calling it twice is harmless; the second subscriber is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let _ = Registry::default().with(filter).with(fmt_layer).try_init();
}

pub fn load_target_png(path: impl AsRef<Path>) -> anyhow::Result<TargetImage> {
    let path = path.as_ref();
    let img = image::open(path)
        .with_context(|| format!("failed to open target {}", path.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(TargetImage::from_rgba8(width, height, img.as_raw())?)
}

/// Loads a grayscale atlas laid out as [`ATLAS_GRID`] x [`ATLAS_GRID`] cells.
pub fn load_atlas_png(path: impl AsRef<Path>) -> anyhow::Result<MaskAtlas> {
    let path = path.as_ref();
    let img = image::open(path)
        .with_context(|| format!("failed to open atlas {}", path.display()))?
        .to_luma8();
    let (width, height) = img.dimensions();
    Ok(MaskAtlas::from_packed(
        img.as_raw(),
        width,
        height,
        ATLAS_GRID,
        ATLAS_GRID,
    )?)
}

pub fn write_composed_png(composed: &ComposedImage, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let (width, height) = composed.size();
    let buffer = image::RgbaImage::from_raw(width, height, composed.raster().to_rgba8())
        .context("composed raster has an unexpected length")?;
    buffer
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {}.", path.display());
    Ok(())
}

/// Logs each committed sprite as one replayable line.
pub fn log_sequence(sequence: &ChosenSequence) {
    for (i, sprite) in sequence.iter().enumerate() {
        let pos = sprite.position();
        let size = sprite.size();
        let [r, g, b, _] = sprite.color_rgba8();
        info!(
            "#{i:02} shape {:2} at ({:.4}, {:.4}) size ({:.4}, {:.4}) angle {:.4} alpha {:.3} color #{r:02x}{g:02x}{b:02x}",
            sprite.atlas_id(),
            pos.x,
            pos.y,
            size.x,
            size.y,
            sprite.angle(),
            sprite.alpha(),
        );
    }
}
