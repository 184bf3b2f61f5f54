#![allow(dead_code)]

use std::time::Duration;

use criterion::{Criterion, Throughput};
use glam::Vec4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sprite_fit::prelude::{Hypothesis, MaskAtlas, SearchSpace, TargetImage, ATLAS_SHAPE_COUNT};

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(2);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// Diagonal color gradient with a bright disc, so every stamp has something to fit.
pub fn gradient_target(width: u32, height: u32) -> TargetImage {
    let mut bytes = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let u = x as f32 / width as f32;
            let v = y as f32 / height as f32;
            let d = (u - 0.5).hypot(v - 0.5);
            let disc = if d < 0.2 { 1.0 } else { 0.0 };
            let px = Vec4::new(u.max(disc), v.max(disc), (1.0 - u).max(disc), 1.0);
            bytes.extend(px.to_array().iter().map(|c| (c * 255.0) as u8));
        }
    }
    TargetImage::from_rgba8(width, height, &bytes).unwrap_or_else(|_| {
        TargetImage::uniform(width, height, Vec4::ONE)
    })
}

pub fn atlas() -> MaskAtlas {
    MaskAtlas::procedural(32)
}

pub fn random_hypotheses(count: usize, aspect_ratio: f32, seed: u64) -> Vec<Hypothesis> {
    let mut rng = StdRng::seed_from_u64(seed);
    let space = SearchSpace::new(aspect_ratio, ATLAS_SHAPE_COUNT);
    (0..count)
        .map(|_| Hypothesis::random(&mut rng, &space))
        .collect()
}
