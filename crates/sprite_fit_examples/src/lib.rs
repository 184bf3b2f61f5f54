#![forbid(unsafe_code)]

mod io;

pub use io::{
    init_tracing, load_atlas_png, load_target_png, log_sequence, write_composed_png,
    ATLAS_GRID,
};
