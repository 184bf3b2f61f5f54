//! Fits sprites to a PNG target.
//!
//! Usage: `fit-image <target.png> [atlas.png] [sprite-limit]`. Without an atlas the procedural
//! one is used.
use sprite_fit::prelude::*;
use sprite_fit::search::SPRITE_LIMIT;
use sprite_fit_examples::{
    init_tracing, load_atlas_png, load_target_png, log_sequence, write_composed_png,
};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut args = std::env::args().skip(1);
    let target_path = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: fit-image <target.png> [atlas.png] [limit]"))?;
    let atlas_path = args.next().filter(|a| a != "-");
    let sprite_limit = match args.next() {
        Some(raw) => raw.parse()?,
        None => SPRITE_LIMIT,
    };

    let target = load_target_png(&target_path)?;
    let atlas = match atlas_path {
        Some(path) => load_atlas_png(path)?,
        None => MaskAtlas::procedural(32),
    };

    let config = RunConfig::for_target(&target).with_sprite_limit(sprite_limit);
    let mut runner = SearchRunner::try_new(config, &target, &atlas)?;
    let result = runner.run();

    log_sequence(&result.sequence);
    write_composed_png(runner.composed(), "fit-image.png")?;
    Ok(())
}
