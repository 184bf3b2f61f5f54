//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Every
//! variant describes a setup failure: once a run has started, the search loop clamps numeric
//! degeneracy instead of reporting it.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "target image must be {}x{}, got {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    TargetSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("invalid shape atlas: {0}")]
    InvalidAtlas(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
