//! Region loading: slice the sequence and the three signal tracks over one interval.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use tracing::debug;

use crate::error::GenofuseError;
use crate::io::sanitize_path;
use crate::ranges::Interval;
use crate::sequences::numeric::Normalization;
use crate::sequences::FileStoreOpener;
use crate::traits::{SequenceSource, StoreOpener, TrackSource};
use crate::Position;

/// The four aligned slices of one interval.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionSlices {
    /// One-hot encoded sequence, `(L, ENCODING_WIDTH)`.
    pub sequence: Array2<f32>,
    /// CTCF signal, as stored.
    pub ctcf: Array1<f32>,
    /// ATAC signal, `ln(x + 1)`.
    pub atac: Array1<f32>,
    /// H3K27ac signal, `ln(x + 1)`.
    pub h3k27ac: Array1<f32>,
}

impl RegionSlices {
    /// The sequence length; every slice of a loaded region has this length.
    pub fn len(&self) -> usize {
        self.sequence.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The per-chromosome sequence file inside `sequence_dir`: `<seqname>.fa.gz`, or
/// `<seqname>.fa` if only an uncompressed file exists.
pub fn sequence_file(sequence_dir: &Path, seqname: &str) -> PathBuf {
    let gzipped = sequence_dir.join(format!("{}.fa.gz", seqname));
    let plain = sequence_dir.join(format!("{}.fa", seqname));
    if !gzipped.exists() && plain.exists() {
        plain
    } else {
        gzipped
    }
}

/// Loads [`RegionSlices`] through an injected [`StoreOpener`].
#[derive(Clone, Debug, Default)]
pub struct RegionLoader<O = FileStoreOpener> {
    opener: O,
}

impl<O: StoreOpener> RegionLoader<O> {
    pub fn new(opener: O) -> Self {
        Self { opener }
    }

    /// Slice `[start, start + window)` of `seqname` from the sequence directory and the
    /// three tracks.
    ///
    /// Paths are sanitized with [`sanitize_path`]. CTCF is opened without
    /// normalization, ATAC and H3K27ac with [`Normalization::Log`]. Errors from the
    /// stores (missing files or sequences, out-of-range intervals) are returned as-is.
    #[allow(clippy::too_many_arguments)]
    pub fn load_region(
        &self,
        seqname: &str,
        start: Position,
        sequence_dir: impl AsRef<Path>,
        ctcf_path: impl AsRef<Path>,
        atac_path: impl AsRef<Path>,
        h3k27ac_path: impl AsRef<Path>,
        window: Position,
    ) -> Result<RegionSlices, GenofuseError> {
        let interval = Interval::with_window(seqname, start, window)?;

        let sequence_path = sequence_file(&sanitize_path(sequence_dir), seqname);
        debug!("opening sequence {}", sequence_path.display());
        let sequence = self.opener.open_sequence(&sequence_path)?;
        let ctcf = self.opener.open_track(&sanitize_path(ctcf_path), Normalization::None)?;
        let atac = self.opener.open_track(&sanitize_path(atac_path), Normalization::Log)?;
        let h3k27ac = self.opener.open_track(&sanitize_path(h3k27ac_path), Normalization::Log)?;

        self.slice(&interval, &sequence, &ctcf, &atac, &h3k27ac)
    }

    /// Slice already opened stores over `interval`.
    pub fn slice(
        &self,
        interval: &Interval,
        sequence: &O::Sequence,
        ctcf: &O::Track,
        atac: &O::Track,
        h3k27ac: &O::Track,
    ) -> Result<RegionSlices, GenofuseError> {
        slice_region(interval, sequence, ctcf, atac, h3k27ac)
    }
}

/// Slice any sequence and track stores over `interval`.
pub fn slice_region<S, T>(
    interval: &Interval,
    sequence: &S,
    ctcf: &T,
    atac: &T,
    h3k27ac: &T,
) -> Result<RegionSlices, GenofuseError>
where
    S: SequenceSource,
    T: TrackSource,
{
    let Interval { seqname, start, end } = interval;
    let slices = RegionSlices {
        sequence: sequence.get(seqname, *start, *end)?,
        ctcf: ctcf.get(seqname, *start, *end)?,
        atac: atac.get(seqname, *start, *end)?,
        h3k27ac: h3k27ac.get(seqname, *start, *end)?,
    };
    debug!("sliced {} ({} bp)", interval, slices.len());
    Ok(slices)
}

/// Load one region with the default file-backed stores.
///
/// See [`RegionLoader::load_region`].
pub fn load_region(
    seqname: &str,
    start: Position,
    sequence_dir: impl AsRef<Path>,
    ctcf_path: impl AsRef<Path>,
    atac_path: impl AsRef<Path>,
    h3k27ac_path: impl AsRef<Path>,
    window: Position,
) -> Result<RegionSlices, GenofuseError> {
    RegionLoader::new(FileStoreOpener).load_region(
        seqname,
        start,
        sequence_dir,
        ctcf_path,
        atac_path,
        h3k27ac_path,
        window,
    )
}

#[cfg(test)]
mod tests {
    use super::{load_region, sequence_file, RegionLoader};
    use crate::prelude::*;
    use crate::sequences::nucleotide::{NucleotideSequences, Nucleotides};
    use crate::test_utilities::write_region_fixture;
    use indexmap::IndexMap;
    use ndarray::Array1;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_load_region_lengths() {
        let fixture = write_region_fixture("chr1", 5_000).unwrap();
        for (start, window) in [(0, 5_000), (100, 1_000), (4_999, 1), (1_234, 1)] {
            let slices = fixture.load(start, window).unwrap();
            let window = window as usize;
            assert_eq!(slices.sequence.dim(), (window, ENCODING_WIDTH));
            assert_eq!(slices.ctcf.len(), window);
            assert_eq!(slices.atac.len(), window);
            assert_eq!(slices.h3k27ac.len(), window);
        }
    }

    #[test]
    fn test_load_region_normalization() {
        let fixture = write_region_fixture("chr1", 100).unwrap();
        let slices = fixture.load(10, 20).unwrap();
        let raw = fixture.raw_signal(10, 20);
        // CTCF raw, ATAC and H3K27ac log-normalized
        assert_eq!(slices.ctcf, raw);
        assert_eq!(slices.atac, raw.mapv(f32::ln_1p));
        assert_eq!(slices.h3k27ac, raw.mapv(f32::ln_1p));
    }

    #[test]
    fn test_load_region_sanitizes_paths() {
        let fixture = write_region_fixture("chr1", 100).unwrap();
        let eq = |p: &Path| format!("={}=", p.display());
        let slices = load_region(
            "chr1",
            0,
            eq(&fixture.sequence_dir),
            eq(&fixture.ctcf),
            eq(&fixture.atac),
            eq(&fixture.h3k27ac),
            50,
        )
        .unwrap();
        assert_eq!(slices.len(), 50);
    }

    #[test]
    fn test_load_region_missing_chromosome() {
        let fixture = write_region_fixture("chr1", 100).unwrap();
        let result = load_region(
            "chr2",
            0,
            &fixture.sequence_dir,
            &fixture.ctcf,
            &fixture.atac,
            &fixture.h3k27ac,
            10,
        );
        assert!(matches!(result, Err(GenofuseError::MissingFile(_))));
    }

    #[test]
    fn test_load_region_out_of_range() {
        let fixture = write_region_fixture("chr1", 100).unwrap();
        assert!(matches!(
            fixture.load(90, 20),
            Err(GenofuseError::InvalidGenomicRangeForSequence(90, 110, 100))
        ));
        assert!(matches!(
            fixture.load(0, 0),
            Err(GenofuseError::InvalidGenomicRange(0, 0))
        ));
    }

    #[test]
    fn test_sequence_file_fallback() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(sequence_file(dir.path(), "chr1"), dir.path().join("chr1.fa.gz"));
        std::fs::write(dir.path().join("chr1.fa"), ">chr1\nACGT\n").unwrap();
        assert_eq!(sequence_file(dir.path(), "chr1"), dir.path().join("chr1.fa"));
    }

    /// An in-memory opener that records what was opened.
    #[derive(Default)]
    struct RecordingOpener {
        opened: RefCell<Vec<(PathBuf, Option<Normalization>)>>,
    }

    impl StoreOpener for RecordingOpener {
        type Sequence = NucleotideSequences;
        type Track = NumericTrack;

        fn open_sequence(&self, path: &Path) -> Result<Self::Sequence, GenofuseError> {
            self.opened.borrow_mut().push((path.to_path_buf(), None));
            let mut data = IndexMap::new();
            data.insert("chrT".to_string(), Nucleotides::from("ACGTACGTAC"));
            Ok(NucleotideSequences::new(data))
        }

        fn open_track(&self, path: &Path, normalization: Normalization) -> Result<Self::Track, GenofuseError> {
            self.opened
                .borrow_mut()
                .push((path.to_path_buf(), Some(normalization)));
            let mut data = IndexMap::new();
            data.insert("chrT".to_string(), Array1::from_elem(10, 1.0f32));
            Ok(NumericTrack::from_arrays(data, normalization))
        }
    }

    #[test]
    fn test_injected_opener() {
        let loader = RegionLoader::new(RecordingOpener::default());
        let slices = loader
            .load_region("chrT", 2, "=seq", "ctcf.npz", "atac.npz", "h3k27ac.npz", 4)
            .unwrap();
        assert_eq!(slices.len(), 4);
        assert_eq!(slices.ctcf, Array1::from_elem(4, 1.0));
        assert_eq!(slices.atac, Array1::from_elem(4, 1.0f32.ln_1p()));

        let opened = loader.opener.opened.borrow();
        assert_eq!(
            *opened,
            vec![
                (PathBuf::from("seq/chrT.fa.gz"), None),
                (PathBuf::from("ctcf.npz"), Some(Normalization::None)),
                (PathBuf::from("atac.npz"), Some(Normalization::Log)),
                (PathBuf::from("h3k27ac.npz"), Some(Normalization::Log)),
            ]
        );
    }
}
