//! The [`GenofuseError`] `enum` definition and error messages.
//!
use crate::Position;
use ndarray_npy::{ReadNpyError, ReadNpzError, WriteNpyError, WriteNpzError};
use std::path::PathBuf;
use std::string::FromUtf8Error;
use thiserror::Error;

/// The [`GenofuseError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum GenofuseError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid UTF-8 in FASTA sequence name: {0}")]
    FromUtf8Error(#[from] FromUtf8Error),
    #[error("Could not read .npy array: {0}")]
    ReadNpyError(#[from] ReadNpyError),
    #[error("Could not write .npy array: {0}")]
    WriteNpyError(#[from] WriteNpyError),
    #[error("Could not read .npz archive: {0}")]
    ReadNpzError(#[from] ReadNpzError),
    #[error("Could not write .npz archive: {0}")]
    WriteNpzError(#[from] WriteNpzError),
    #[error("Model configuration could not be parsed: {0}")]
    ConfigError(#[from] serde_json::Error),

    // Missing inputs
    #[error("File not found: {0}")]
    MissingFile(PathBuf),
    #[error("Sequence name '{0}' is not in the store")]
    MissingSequence(String),
    #[error("Unsupported track store '{0}': expected a directory of .npy files or an .npz archive")]
    UnsupportedTrackStore(PathBuf),

    // Invalid genomic range errors
    #[error("Range invalid: start ({0}) must be less than end ({1})")]
    InvalidGenomicRange(Position, Position),
    #[error("Range [{0}, {1}) is invalid for sequence of length {2}")]
    InvalidGenomicRangeForSequence(Position, Position, Position),

    // Assembly errors
    #[error("Slice lengths differ: sequence {sequence}, CTCF {ctcf}, ATAC {atac}, H3K27ac {h3k27ac}")]
    ShapeMismatch {
        sequence: usize,
        ctcf: usize,
        atac: usize,
        h3k27ac: usize,
    },
    #[error("Sequence slice has {0} encoding columns, expected {1}")]
    InvalidEncodingWidth(usize, usize),
    #[error("Array shape error: {0}")]
    ArrayShapeError(#[from] ndarray::ShapeError),
    #[error("Tensor operation failed: {0}")]
    TensorError(#[from] candle_core::Error),

    // Model and device errors
    #[error("Model loading failed: {0}")]
    ModelLoad(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Device error: {0}")]
    Device(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    // Command line tool related errors
    #[error("Command line argument error: {0}")]
    ArgumentError(#[from] clap::error::Error),
}
