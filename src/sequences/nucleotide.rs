//! Types and methods for working with per-basepair nucleotide sequence data.
//!
//! Sequences are read with [`noodles::fasta`] and one-hot encoded on retrieval over the
//! alphabet `a, t, c, g, n` (see [`ALPHABET`]).

use bytes::Bytes;
use indexmap::IndexMap;
use ndarray::Array2;
use noodles::fasta;
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::str;
use tracing::debug;

use super::as_position;
use crate::error::GenofuseError;
use crate::io::InputFile;
use crate::ranges::try_range;
use crate::traits::SequenceSource;
use crate::Position;

/// The one-hot encoding column order. Anything that is not `a`, `t`, `c` or `g`
/// (case-insensitive) is encoded as `n`.
pub const ALPHABET: [u8; 5] = *b"atcgn";

/// The number of columns of an encoded sequence slice.
pub const ENCODING_WIDTH: usize = ALPHABET.len();

/// The encoding column of a nucleotide.
pub fn encode_base(base: u8) -> usize {
    match base.to_ascii_lowercase() {
        b'a' => 0,
        b't' => 1,
        b'c' => 2,
        b'g' => 3,
        _ => 4,
    }
}

/// One-hot encode a nucleotide slice into an `(len, ENCODING_WIDTH)` array.
pub fn one_hot_encode(seq: &[u8]) -> Array2<f32> {
    let mut encoded = Array2::zeros((seq.len(), ENCODING_WIDTH));
    for (mut row, &base) in encoded.rows_mut().into_iter().zip(seq) {
        row[encode_base(base)] = 1.0;
    }
    encoded
}

/// A newtype around raw nucleotide [`Bytes`], for making it more
/// display and other operations more convenient.
#[derive(Clone, Debug, PartialEq)]
pub struct Nucleotides(Bytes);

impl fmt::Display for Nucleotides {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match str::from_utf8(&self.0) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl Deref for Nucleotides {
    type Target = Bytes;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<u8>> for Nucleotides {
    fn from(bytes: Vec<u8>) -> Self {
        Nucleotides(Bytes::from(bytes))
    }
}

impl<'a> From<&'a str> for Nucleotides {
    fn from(s: &'a str) -> Self {
        Nucleotides(Bytes::from(s.as_bytes().to_vec()))
    }
}

/// [`NucleotideSequences`] stores a set of reference sequences in memory, typically the
/// single chromosome of a per-chromosome `<seqname>.fa.gz` file.
#[derive(Clone, Debug, Default)]
pub struct NucleotideSequences {
    data: IndexMap<String, Nucleotides>,
}

impl NucleotideSequences {
    /// Build from in-memory sequences.
    pub fn new(data: IndexMap<String, Nucleotides>) -> Self {
        Self { data }
    }

    /// Load a (possibly gzipped) FASTA file into memory.
    ///
    /// # Arguments
    /// * `filepath`: a path to the FASTA file.
    /// * `seqnames`: an optional subset of sequences to load.
    pub fn from_fasta(
        filepath: impl Into<PathBuf>,
        seqnames: Option<Vec<String>>,
    ) -> Result<Self, GenofuseError> {
        let data = parse_fasta(filepath, seqnames)?;
        Ok(Self { data })
    }

    /// Retrieve an [`IndexMap`] of the sequence names and their lengths.
    pub fn seqlens(&self) -> IndexMap<String, Position> {
        self.data
            .iter()
            .map(|(k, v)| (k.clone(), as_position(v.len())))
            .collect()
    }

    /// Retrieve all sequence names.
    pub fn seqnames(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Retrieve the [`Nucleotides`] for a particular sequence name.
    ///
    /// Per-chromosome FASTA files do not always name their record like the file (e.g.
    /// `>1` inside `chr1.fa.gz`), so a store holding exactly one sequence answers for any
    /// name.
    pub fn get_sequence(&self, seqname: &str) -> Result<&Nucleotides, GenofuseError> {
        if let Some(seq) = self.data.get(seqname) {
            return Ok(seq);
        }
        match (self.data.len(), self.data.first()) {
            (1, Some((name, seq))) => {
                debug!("using sole FASTA record '{}' for sequence '{}'", name, seqname);
                Ok(seq)
            }
            _ => Err(GenofuseError::MissingSequence(seqname.to_string())),
        }
    }
}

impl SequenceSource for NucleotideSequences {
    /// One-hot encode the region `[start, end)`.
    fn get(&self, seqname: &str, start: Position, end: Position) -> Result<Array2<f32>, GenofuseError> {
        let seq = self.get_sequence(seqname)?;
        let range = try_range(start, end, as_position(seq.len()))?;
        Ok(one_hot_encode(&seq[range]))
    }

    fn get_sequence_length(&self, seqname: &str) -> Result<Position, GenofuseError> {
        Ok(as_position(self.get_sequence(seqname)?.len()))
    }
}

/// Use the [`noodles`] library to parse a FASTA file.
pub fn parse_fasta(
    filepath: impl Into<PathBuf>,
    seqnames: Option<Vec<String>>,
) -> Result<IndexMap<String, Nucleotides>, GenofuseError> {
    let seqnames_set = seqnames.map(HashSet::<String>::from_iter);
    let filepath = filepath.into();

    let mut reader = fasta::Reader::new(InputFile::new(&filepath).reader()?);
    let mut sequences = IndexMap::new();

    for result in reader.records() {
        let record = result?;
        let name = String::from_utf8(record.definition().name().to_vec())?;
        if seqnames_set
            .as_ref()
            .map_or(true, |keep_seqnames| keep_seqnames.contains(&name))
        {
            let seq = record.sequence().as_ref().to_vec();
            sequences.insert(name, Nucleotides::from(seq));
        }
    }
    debug!("read {} sequence(s) from {}", sequences.len(), filepath.display());

    Ok(sequences)
}
