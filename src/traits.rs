//! Traits used by the genofuse library.
//!
//! These are the seams of the pipeline: the stores that data are sliced from
//! ([`SequenceSource`], [`TrackSource`]), how those stores get opened ([`StoreOpener`]),
//! and how a model is loaded ([`ModelLoader`]).

use std::path::Path;

use candle_core::{Device, Module};
use ndarray::{Array1, Array2};

use crate::{error::GenofuseError, sequences::numeric::Normalization, Position};

/// The [`GenericRange`] trait defines common functionality for range types.
pub trait GenericRange {
    fn start(&self) -> Position;
    fn end(&self) -> Position;
    fn width(&self) -> Position {
        self.end() - self.start()
    }
}

/// A per-basepair, encoded nucleotide sequence store.
pub trait SequenceSource {
    /// Retrieve the encoded sequence over `[start, end)` as an `(end - start, width)` array.
    fn get(&self, seqname: &str, start: Position, end: Position) -> Result<Array2<f32>, GenofuseError>;

    /// Get the length of a particular sequence.
    fn get_sequence_length(&self, seqname: &str) -> Result<Position, GenofuseError>;
}

/// A per-basepair real-valued signal store (e.g. a ChIP-seq or ATAC-seq coverage track).
pub trait TrackSource {
    /// Retrieve the (normalized) signal over `[start, end)`, one value per basepair.
    fn get(&self, seqname: &str, start: Position, end: Position) -> Result<Array1<f32>, GenofuseError>;

    /// The normalization applied to values on retrieval.
    fn normalization(&self) -> Normalization;
}

/// Opens the stores that a [`RegionLoader`] slices.
///
/// [`RegionLoader`]: crate::loader::RegionLoader
pub trait StoreOpener {
    type Sequence: SequenceSource;
    type Track: TrackSource;

    fn open_sequence(&self, path: &Path) -> Result<Self::Sequence, GenofuseError>;
    fn open_track(&self, path: &Path, normalization: Normalization) -> Result<Self::Track, GenofuseError>;
}

/// Loads a model handle from a path onto a device.
///
/// Any closure `Fn(&Path, &Device) -> Result<M, GenofuseError>` where `M` is a candle
/// [`Module`] is a [`ModelLoader`].
pub trait ModelLoader {
    type Model: Module;

    fn load(&self, path: &Path, device: &Device) -> Result<Self::Model, GenofuseError>;
}

impl<F, M> ModelLoader for F
where
    F: Fn(&Path, &Device) -> Result<M, GenofuseError>,
    M: Module,
{
    type Model = M;

    fn load(&self, path: &Path, device: &Device) -> Result<M, GenofuseError> {
        self(path, device)
    }
}
