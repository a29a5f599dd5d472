//! Input/Output file handling with [`InputFile`] and [`OutputFile`].
//!
//! These types abstract over reading/writing both plaintext and gzip-compressed
//! input/output.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{ArrayBase, Data, Dimension};
use ndarray_npy::{WritableElement, WriteNpyExt};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::GenofuseError;

/// Strip the stray `=` characters that command line wrappers sometimes leave on path
/// arguments (e.g. `--seq==/data/dna`).
pub fn sanitize_path(path: impl AsRef<Path>) -> PathBuf {
    let raw = path.as_ref().to_string_lossy();
    PathBuf::from(raw.trim_matches('='))
}

/// Check if a file is a gzipped by looking for the magic numbers
fn is_gzipped_file(file_path: &Path) -> io::Result<bool> {
    let mut file = File::open(file_path)?;
    let mut buffer = [0; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        // files shorter than the magic number are plaintext
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Represents an input file.
///
/// This abstracts how data is read in, allowing for both plaintext and gzip-compressed input
/// to be read through a common interface.
#[derive(Clone, Debug)]
pub struct InputFile {
    pub filepath: PathBuf,
}

impl InputFile {
    /// Constructs a new `InputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - the path to the file. Gzip-compressed files are detected by their
    /// magic number and uncompressed automatically.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    /// Opens the file and returns a buffered reader.
    ///
    /// A missing file is reported as [`GenofuseError::MissingFile`].
    pub fn reader(&self) -> Result<BufReader<Box<dyn Read>>, GenofuseError> {
        if !self.filepath.is_file() {
            return Err(GenofuseError::MissingFile(self.filepath.clone()));
        }
        let file = File::open(&self.filepath)?;
        let is_gzipped = is_gzipped_file(&self.filepath)?;
        let reader: Box<dyn Read> = if is_gzipped {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(BufReader::new(reader))
    }
}

/// Represents an output file.
///
/// This abstracts writing both plaintext and gzip-compressed files.
pub struct OutputFile {
    filepath: PathBuf,
}

impl OutputFile {
    /// Constructs a new `OutputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - the path to the file. If the file extension is
    /// `.gz`, `OutputFile` will write gzip-compressed output.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    fn is_gzip(&self) -> bool {
        self.filepath
            .extension()
            .map_or(false, |ext| ext == "gz")
    }

    /// Opens the file and returns a writer.
    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        let file = File::create(&self.filepath)?;
        let writer: Box<dyn Write> = if self.is_gzip() {
            Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
        } else {
            Box::new(BufWriter::new(file))
        };
        Ok(writer)
    }

    /// Write an array in NumPy `.npy` format.
    pub fn write_npy<A, S, D>(&self, array: &ArrayBase<S, D>) -> Result<(), GenofuseError>
    where
        A: WritableElement,
        S: Data<Elem = A>,
        D: Dimension,
    {
        let mut writer = self.writer()?;
        array.write_npy(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
