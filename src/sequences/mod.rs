//! Per-basepair data stores.
//!
//! Sequence data and signal tracks exhaustively cover a chromosome, so they are not
//! stored as ranges: a store is sliced with a `(seqname, start, end)` query instead.
//!
//! ## Main Functionality
//!
//!  - [`NucleotideSequences`]: FASTA-backed reference sequence, one-hot encoded on
//!    retrieval.
//!  - [`NumericTrack`]: per-chromosome `f32` signal stored as NumPy arrays (a directory
//!    of `.npy` files or one `.npz` archive), lazily loaded one chromosome at a time,
//!    and normalized on retrieval.
//!  - [`LazyLoader`]: the generic single-key cache behind [`NumericTrack`].
//!
//! [`NucleotideSequences`]: crate::sequences::nucleotide::NucleotideSequences
//! [`NumericTrack`]: crate::sequences::numeric::NumericTrack
//! [`LazyLoader`]: crate::sequences::lazy::LazyLoader

pub mod lazy;
pub mod nucleotide;
pub mod numeric;

use std::path::Path;

use crate::{
    error::GenofuseError, traits::StoreOpener, Position,
};
use nucleotide::NucleotideSequences;
use numeric::{Normalization, NumericTrack};

/// Convert an in-memory length into a [`Position`], saturating on (unrealistically)
/// long sequences so that range validation rejects any query past the end.
pub(crate) fn as_position(len: usize) -> Position {
    Position::try_from(len).unwrap_or(Position::MAX)
}

/// The default [`StoreOpener`]: FASTA sequence files and NumPy signal tracks.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileStoreOpener;

impl StoreOpener for FileStoreOpener {
    type Sequence = NucleotideSequences;
    type Track = NumericTrack;

    fn open_sequence(&self, path: &Path) -> Result<Self::Sequence, GenofuseError> {
        NucleotideSequences::from_fasta(path, None)
    }

    fn open_track(&self, path: &Path, normalization: Normalization) -> Result<Self::Track, GenofuseError> {
        NumericTrack::open(path, normalization)
    }
}
