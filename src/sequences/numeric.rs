//! Per-basepair numeric signal tracks.
//!
//! A [`NumericTrack`] is a per-chromosome `f32` signal stored as NumPy arrays, either as a
//! directory of `<seqname>.npy` files or as a single `.npz` archive with one array per
//! chromosome. Chromosomes are loaded lazily, one at a time.
//!
use indexmap::IndexMap;
use ndarray::{s, Array1};
use ndarray_npy::{read_npy, NpzReader, ReadNpyError, ReadNpzError};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use super::as_position;
use super::lazy::LazyLoader;
use crate::error::GenofuseError;
use crate::ranges::try_range;
use crate::traits::TrackSource;
use crate::Position;

/// The transform applied to track values when they are retrieved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Normalization {
    /// Values are returned as stored.
    #[default]
    None,
    /// Values are returned as `ln(x + 1)`.
    Log,
}

impl Normalization {
    /// Apply the normalization in place. NaN values stay NaN.
    pub fn apply(&self, values: &mut Array1<f32>) {
        match self {
            Normalization::None => {}
            Normalization::Log => values.mapv_inplace(f32::ln_1p),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalization::None => write!(f, "none"),
            Normalization::Log => write!(f, "log"),
        }
    }
}

impl FromStr for Normalization {
    type Err = GenofuseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Normalization::None),
            "log" => Ok(Normalization::Log),
            _ => Err(GenofuseError::InternalError(format!(
                "unknown normalization '{}', expected 'none' or 'log'",
                s
            ))),
        }
    }
}

/// Where a track's per-chromosome arrays come from.
enum TrackStore {
    Directory(PathBuf),
    Archive(NpzReader<File>),
    Memory(IndexMap<String, Array1<f32>>),
}

impl TrackStore {
    fn load(&mut self, seqname: &str) -> Result<Array1<f32>, GenofuseError> {
        match self {
            TrackStore::Directory(dir) => {
                let path = dir.join(format!("{}.npy", seqname));
                if !path.is_file() {
                    return Err(GenofuseError::MissingSequence(seqname.to_string()));
                }
                read_npy_f32(&path)
            }
            TrackStore::Archive(npz) => {
                let npy_name = format!("{}.npy", seqname);
                let name = npz
                    .names()?
                    .into_iter()
                    .find(|name| name == seqname || *name == npy_name)
                    .ok_or_else(|| GenofuseError::MissingSequence(seqname.to_string()))?;
                match npz.by_name::<_, ndarray::Ix1>(&name) {
                    Ok(values) => Ok(values),
                    Err(ReadNpzError::Npy(ReadNpyError::WrongDescriptor(_))) => {
                        let values: Array1<f64> = npz.by_name(&name)?;
                        Ok(values.mapv(|x| x as f32))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            TrackStore::Memory(data) => data
                .get(seqname)
                .cloned()
                .ok_or_else(|| GenofuseError::MissingSequence(seqname.to_string())),
        }
    }
}

/// Read a one-dimensional `.npy` array, accepting `f32` or `f64` data.
fn read_npy_f32(path: &Path) -> Result<Array1<f32>, GenofuseError> {
    match read_npy::<_, Array1<f32>>(path) {
        Ok(values) => Ok(values),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let values: Array1<f64> = read_npy(path)?;
            Ok(values.mapv(|x| x as f32))
        }
        Err(e) => Err(e.into()),
    }
}

/// A lazy-loaded, per-chromosome numeric signal track.
pub struct NumericTrack {
    source: String,
    normalization: Normalization,
    lazy: LazyLoader<TrackStore, Array1<f32>, String>,
}

impl fmt::Debug for NumericTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericTrack")
            .field("source", &self.source)
            .field("normalization", &self.normalization)
            .field("lazy", &self.lazy)
            .finish()
    }
}

impl NumericTrack {
    fn from_store(source: String, store: TrackStore, normalization: Normalization) -> Self {
        let lazy = LazyLoader::new(store, |store: &mut TrackStore, seqname: &String| {
            let values = store.load(seqname)?;
            debug!("loaded {} track values for '{}'", values.len(), seqname);
            Ok(values)
        });
        Self {
            source,
            normalization,
            lazy,
        }
    }

    /// Open a track store.
    ///
    /// # Arguments
    /// * `path` - a directory of `<seqname>.npy` files, or an `.npz` archive.
    /// * `normalization` - the transform applied to values on retrieval.
    pub fn open(path: impl AsRef<Path>, normalization: Normalization) -> Result<Self, GenofuseError> {
        let path = path.as_ref();
        let store = if path.is_dir() {
            TrackStore::Directory(path.to_path_buf())
        } else if path.is_file() {
            if path.extension().map_or(true, |ext| ext != "npz") {
                return Err(GenofuseError::UnsupportedTrackStore(path.to_path_buf()));
            }
            TrackStore::Archive(NpzReader::new(File::open(path)?)?)
        } else {
            return Err(GenofuseError::MissingFile(path.to_path_buf()));
        };
        debug!("opened track {} (normalization: {})", path.display(), normalization);
        Ok(Self::from_store(path.display().to_string(), store, normalization))
    }

    /// Build a track from in-memory per-chromosome arrays.
    pub fn from_arrays(data: IndexMap<String, Array1<f32>>, normalization: Normalization) -> Self {
        Self::from_store("<memory>".to_string(), TrackStore::Memory(data), normalization)
    }

    /// Return a `bool` indicating whether the values of `seqname` are cached.
    pub fn is_loaded(&self, seqname: &str) -> bool {
        self.lazy.is_loaded(&seqname.to_string())
    }

    /// Clear the lazy-loading cache.
    pub fn clear(&self) {
        self.lazy.clear()
    }

    /// Get the length of a particular sequence's track.
    pub fn get_sequence_length(&self, seqname: &str) -> Result<Position, GenofuseError> {
        let values = self.lazy.get_data(&seqname.to_string())?;
        Ok(as_position(values.len()))
    }
}

impl TrackSource for NumericTrack {
    fn get(&self, seqname: &str, start: Position, end: Position) -> Result<Array1<f32>, GenofuseError> {
        let values = self.lazy.get_data(&seqname.to_string())?;
        let range = try_range(start, end, as_position(values.len()))?;
        let mut region = values.slice(s![range]).to_owned();
        self.normalization.apply(&mut region);
        Ok(region)
    }

    fn normalization(&self) -> Normalization {
        self.normalization
    }
}
