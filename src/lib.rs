//! # genofuse
//!
//! Load a reference sequence and three genomic signal tracks (CTCF, ATAC, H3K27ac) over
//! one chromosomal interval, fuse them into a single `(1, L, 5 + 3)` tensor, and run a
//! pretrained model on it.
//!
//! The pipeline has three stages:
//!
//!  1. [`RegionLoader`] computes the interval and slices the four stores.
//!  2. [`Assembler`] fills missing values, reshapes and concatenates the slices and
//!     places the result on the selected compute device.
//!  3. [`Predictor`] loads a model and runs a single forward pass.
//!
//! ```no_run
//! use genofuse::prelude::*;
//!
//! let slices = load_region("chr2", 500_000, "data/dna", "data/ctcf.npz",
//!                          "data/atac.npz", "data/h3k27ac.npz", DEFAULT_WINDOW)?;
//! let pred = prediction(&slices, "models/corigami")?;
//! println!("{:?}", pred.shape());
//! # Ok::<(), GenofuseError>(())
//! ```
//!
//! [`RegionLoader`]: crate::loader::RegionLoader
//! [`Assembler`]: crate::assemble::Assembler
//! [`Predictor`]: crate::predict::Predictor

pub mod assemble;
pub mod commands;
pub mod device;
pub mod error;
pub mod io;
pub mod loader;
pub mod models;
pub mod predict;
pub mod ranges;
pub mod reporting;
pub mod sequences;
pub mod test_utilities;
pub mod traits;

/// The coordinate type used for all genomic positions.
pub type Position = u32;

/// The default interval width, in basepairs (2 Mb).
pub const DEFAULT_WINDOW: Position = 2_097_152;

pub const INTERNAL_ERROR_MESSAGE: &str = "
An internal error has occurred. Please file a GitHub issue with the exact
command and inputs used to trigger this error.
";

pub mod prelude {
    pub use crate::assemble::{AssembledInput, Assembler, FillPolicy, MissingValues};
    pub use crate::device::DeviceSelector;
    pub use crate::error::GenofuseError;
    pub use crate::loader::{load_region, RegionLoader, RegionSlices};
    pub use crate::models::{ConvHead, ConvHeadConfig, ConvHeadLoader};
    pub use crate::predict::{prediction, LoadedPredictor, Prediction, Predictor};
    pub use crate::ranges::Interval;
    pub use crate::sequences::nucleotide::{NucleotideSequences, ENCODING_WIDTH};
    pub use crate::sequences::numeric::{Normalization, NumericTrack};
    pub use crate::traits::{ModelLoader, SequenceSource, StoreOpener, TrackSource};
    pub use crate::{Position, DEFAULT_WINDOW};
}
