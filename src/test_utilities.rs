//! Test cases and test utility functions.
//!
//! Synthetic regions, and writers for the on-disk stores (FASTA, `.npy` directories,
//! `.npz` archives and model checkpoints) inside temporary directories.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use ndarray::Array1;
use ndarray_npy::{write_npy, NpzWriter};
use rand::{thread_rng, Rng};
use tempfile::TempDir;

use crate::error::GenofuseError;
use crate::io::OutputFile;
use crate::loader::{load_region, RegionSlices};
use crate::models::conv::{ConvHead, ConvHeadConfig, CONFIG_FILE, WEIGHTS_FILE};
use crate::sequences::nucleotide::{one_hot_encode, ALPHABET};
use crate::Position;

/// FASTA line width used by [`write_fasta`].
pub const FASTA_LINE_WIDTH: usize = 60;

// maximum random signal value
pub const MAX_SIGNAL: f32 = 50.0;

/// Repeat `pattern` until it is `len` long.
pub fn repeat_pattern(pattern: &[u8], len: usize) -> Vec<u8> {
    pattern.iter().copied().cycle().take(len).collect()
}

/// Build a random nucleotide sequence of length `len` (no `N`s).
pub fn random_nucleotides(len: usize) -> Vec<u8> {
    let mut rng = thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..4)].to_ascii_uppercase())
        .collect()
}

/// Build a random non-negative signal of length `len`.
pub fn random_signal(len: usize) -> Array1<f32> {
    let mut rng = thread_rng();
    (0..len).map(|_| rng.gen_range(0.0..MAX_SIGNAL)).collect()
}

/// Build random, NaN-free [`RegionSlices`] of length `len`.
pub fn random_region_slices(len: usize) -> RegionSlices {
    RegionSlices {
        sequence: one_hot_encode(&random_nucleotides(len)),
        ctcf: random_signal(len),
        atac: random_signal(len).mapv(f32::ln_1p),
        h3k27ac: random_signal(len).mapv(f32::ln_1p),
    }
}

/// Write a FASTA file (gzip-compressed if `path` ends in `.gz`).
pub fn write_fasta<S: AsRef<[u8]>>(path: impl Into<PathBuf>, records: &[(&str, S)]) -> Result<(), GenofuseError> {
    let mut writer = OutputFile::new(path).writer()?;
    for (name, seq) in records {
        writeln!(writer, ">{}", name)?;
        for line in seq.as_ref().chunks(FASTA_LINE_WIDTH) {
            writer.write_all(line)?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write a track as a directory of `<seqname>.npy` files.
pub fn write_track_dir(dir: &Path, tracks: &[(&str, Array1<f32>)]) -> Result<(), GenofuseError> {
    std::fs::create_dir_all(dir)?;
    for (seqname, values) in tracks {
        write_npy(dir.join(format!("{}.npy", seqname)), values)?;
    }
    Ok(())
}

/// Write a track as an `.npz` archive with one array per sequence.
pub fn write_track_npz(path: &Path, tracks: &[(&str, Array1<f32>)]) -> Result<(), GenofuseError> {
    let mut npz = NpzWriter::new(File::create(path)?);
    for (seqname, values) in tracks {
        npz.add_array(*seqname, values)?;
    }
    npz.finish()?;
    Ok(())
}

/// Write a randomly initialized [`ConvHead`] checkpoint (`config.json` and
/// `model.safetensors`) into `dir`.
pub fn write_conv_head_checkpoint(dir: &Path, config: &ConvHeadConfig) -> Result<(), GenofuseError> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    ConvHead::new(config, vb)?;
    varmap.save(dir.join(WEIGHTS_FILE))?;
    std::fs::write(dir.join(CONFIG_FILE), serde_json::to_string_pretty(config)?)?;
    Ok(())
}

/// A single-chromosome set of stores in a temporary directory.
///
/// CTCF is stored as a `.npy` directory, ATAC and H3K27ac as `.npz` archives; all three
/// tracks hold the same raw signal.
pub struct RegionFixture {
    pub dir: TempDir,
    pub seqname: String,
    pub sequence_dir: PathBuf,
    pub ctcf: PathBuf,
    pub atac: PathBuf,
    pub h3k27ac: PathBuf,
    pub signal: Array1<f32>,
}

impl RegionFixture {
    /// Load `[start, start + window)` from the fixture stores.
    pub fn load(&self, start: Position, window: Position) -> Result<RegionSlices, GenofuseError> {
        load_region(
            &self.seqname,
            start,
            &self.sequence_dir,
            &self.ctcf,
            &self.atac,
            &self.h3k27ac,
            window,
        )
    }

    /// The raw (unnormalized) signal over `[start, start + window)`.
    pub fn raw_signal(&self, start: Position, window: Position) -> Array1<f32> {
        let start = start as usize;
        self.signal
            .slice(ndarray::s![start..start + window as usize])
            .to_owned()
    }
}

/// Write fixture stores for `seqname` with the given sequence and raw signal.
pub fn write_region_fixture_with(
    seqname: &str,
    sequence: &[u8],
    signal: Array1<f32>,
) -> Result<RegionFixture, GenofuseError> {
    let dir = tempfile::tempdir()?;
    let sequence_dir = dir.path().join("dna");
    std::fs::create_dir_all(&sequence_dir)?;
    write_fasta(sequence_dir.join(format!("{}.fa.gz", seqname)), &[(seqname, sequence)])?;

    let ctcf = dir.path().join("ctcf");
    write_track_dir(&ctcf, &[(seqname, signal.clone())])?;
    let atac = dir.path().join("atac.npz");
    write_track_npz(&atac, &[(seqname, signal.clone())])?;
    let h3k27ac = dir.path().join("h3k27ac.npz");
    write_track_npz(&h3k27ac, &[(seqname, signal.clone())])?;

    Ok(RegionFixture {
        dir,
        seqname: seqname.to_string(),
        sequence_dir,
        ctcf,
        atac,
        h3k27ac,
        signal,
    })
}

/// Write fixture stores for a `len` basepair `seqname` with a repeating sequence and a
/// deterministic sawtooth signal.
pub fn write_region_fixture(seqname: &str, len: usize) -> Result<RegionFixture, GenofuseError> {
    let sequence = repeat_pattern(b"ACGTTGCAN", len);
    let signal = (0..len).map(|i| (i % 7) as f32 * 0.5).collect();
    write_region_fixture_with(seqname, &sequence, signal)
}

#[cfg(test)]
mod tests {
    use super::{random_region_slices, repeat_pattern};

    #[test]
    fn test_repeat_pattern() {
        assert_eq!(repeat_pattern(b"ACG", 7), b"ACGACGA".to_vec());
        assert!(repeat_pattern(b"ACG", 0).is_empty());
    }

    #[test]
    fn test_random_region_slices() {
        let slices = random_region_slices(100);
        assert_eq!(slices.len(), 100);
        assert!(slices.ctcf.iter().all(|x| (0.0..super::MAX_SIGNAL).contains(x)));
    }
}
