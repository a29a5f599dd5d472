//! Model checkpoints that a [`Predictor`](crate::predict::Predictor) can run.
//!
//! Any [`ModelLoader`](crate::traits::ModelLoader) works with the predictor; this module
//! ships [`ConvHead`], a small per-position convolutional readout, and its safetensors
//! loader so the command line tool works end to end.

pub mod conv;

pub use conv::{ConvHead, ConvHeadConfig, ConvHeadLoader};
