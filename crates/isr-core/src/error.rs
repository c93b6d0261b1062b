use std::path::PathBuf;

use thiserror::Error;

use crate::frame::FrameRole;

#[derive(Error, Debug)]
pub enum IsrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FITS error: {0}")]
    Fits(#[from] fitsio::errors::Error),

    #[error("No usable {role} frames found{}", filter_suffix(.filter))]
    MissingFrames {
        role: FrameRole,
        filter: Option<String>,
    },

    #[error("{}: missing or invalid header {key}", path.display())]
    MissingMetadata { path: PathBuf, key: String },

    #[error("Frame dimensions {actual:?} do not match expected {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Empty frame stack")]
    EmptyStack,

    #[error("Flat normalization failed: {0}")]
    ZeroNormalization(String),

    #[error("Remote service error: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("Remote service error: {0}")]
    RemoteService(String),
}

fn filter_suffix(filter: &Option<String>) -> String {
    match filter {
        Some(f) => format!(" for filter {f}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, IsrError>;
