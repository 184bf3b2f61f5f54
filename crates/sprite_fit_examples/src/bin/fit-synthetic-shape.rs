//! Fits a handful of sprites to a generated target: two colored discs on a dark background.
use glam::Vec4;
use sprite_fit::prelude::*;
use sprite_fit_examples::{init_tracing, log_sequence, write_composed_png};

const WIDTH: u32 = 165;
const HEIGHT: u32 = 100;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let target = synthetic_target()?;
    let atlas = MaskAtlas::procedural(32);

    let config = RunConfig::for_target(&target)
        .with_grid_size(24)
        .with_iterations_per_round(256)
        .with_sprite_limit(12)
        .with_round_limit(Some(48));

    let mut events = VecSink::only([SearchEventKind::SpriteCommitted]);
    let mut runner = SearchRunner::try_new(config, &target, &atlas)?;
    let result = runner.run_with_events(&mut events);

    tracing::info!(
        "{} commits, {} stagnant rounds, final error {:.2}.",
        events.len(),
        result.stagnant_rounds,
        runner.composed().squared_error(&target),
    );
    log_sequence(&result.sequence);
    write_composed_png(runner.composed(), "fit-synthetic-shape.png")?;
    Ok(())
}

fn synthetic_target() -> sprite_fit::error::Result<TargetImage> {
    let background = Vec4::new(0.08, 0.08, 0.12, 1.0);
    let discs = [
        (0.35, 0.45, 0.22, Vec4::new(0.95, 0.55, 0.1, 1.0)),
        (0.7, 0.6, 0.15, Vec4::new(0.2, 0.6, 0.95, 1.0)),
    ];
    let mut pixels = Vec::with_capacity((WIDTH * HEIGHT) as usize);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let u = (x as f32 + 0.5) / WIDTH as f32;
            let v = (y as f32 + 0.5) / HEIGHT as f32;
            let aspect = WIDTH as f32 / HEIGHT as f32;
            let color = discs
                .iter()
                .find(|(cx, cy, r, _)| ((u - cx) * aspect).hypot(v - cy) < *r)
                .map_or(background, |(_, _, _, c)| *c);
            pixels.push(color);
        }
    }
    Ok(TargetImage::new(RgbaRaster::from_pixels(WIDTH, HEIGHT, pixels)?))
}
