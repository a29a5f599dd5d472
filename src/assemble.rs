//! Feature assembly: fuse one region's sequence and signal slices into a model input.
//!
//! The [`Assembler`] checks that all four slices have the same length, replaces missing
//! (NaN) signal values according to a per-track [`FillPolicy`], and concatenates
//!
//! ```text
//! sequence (1, L, 5) ++ [ctcf (1, L, 1) ++ atac (1, L, 1) ++ h3k27ac (1, L, 1)]
//! ```
//!
//! along the last axis into one `(1, L, 8)` [`AssembledInput`] on the selected device.

use candle_core::{DType, Device, Tensor};
use ndarray::{Array1, Array3, ArrayBase, DataMut, Dimension};
use num_traits::Float;
use tracing::{debug, warn};

use crate::device::DeviceSelector;
use crate::error::GenofuseError;
use crate::loader::RegionSlices;
use crate::sequences::nucleotide::ENCODING_WIDTH;

/// The number of signal-track channels.
pub const NUM_TRACKS: usize = 3;

/// The channel count of an [`AssembledInput`].
pub const INPUT_CHANNELS: usize = ENCODING_WIDTH + NUM_TRACKS;

/// Track names, in channel order.
pub const TRACK_NAMES: [&str; NUM_TRACKS] = ["CTCF", "ATAC", "H3K27ac"];

/// What to do with missing (NaN) values of a signal track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingValues {
    /// Pass NaN through to the model.
    Keep,
    /// Replace NaN with `0.0`.
    Zero,
}

/// Per-track missing-value handling.
///
/// The default zero-fills CTCF only and keeps NaN in the log-normalized ATAC and
/// H3K27ac tracks, which is what existing checkpoints were trained against. Use
/// [`FillPolicy::all_zero`] to zero-fill every track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillPolicy {
    pub ctcf: MissingValues,
    pub atac: MissingValues,
    pub h3k27ac: MissingValues,
}

impl Default for FillPolicy {
    fn default() -> Self {
        Self {
            ctcf: MissingValues::Zero,
            atac: MissingValues::Keep,
            h3k27ac: MissingValues::Keep,
        }
    }
}

impl FillPolicy {
    /// Replace NaN with zero in all three tracks.
    pub fn all_zero() -> Self {
        Self {
            ctcf: MissingValues::Zero,
            atac: MissingValues::Zero,
            h3k27ac: MissingValues::Zero,
        }
    }

    fn as_array(&self) -> [MissingValues; NUM_TRACKS] {
        [self.ctcf, self.atac, self.h3k27ac]
    }
}

/// Replace NaN values with zero in place, returning how many were replaced.
pub fn fill_missing<T, S, D>(values: &mut ArrayBase<S, D>) -> usize
where
    T: Float,
    S: DataMut<Elem = T>,
    D: Dimension,
{
    let mut filled = 0;
    values.map_inplace(|x| {
        if x.is_nan() {
            *x = T::zero();
            filled += 1;
        }
    });
    filled
}

/// Missing-value accounting for one track of an assembled input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackSummary {
    pub name: &'static str,
    /// NaN values replaced by zero.
    pub filled: usize,
    /// NaN values passed through to the model.
    pub remaining: usize,
}

/// The fused `(1, L, ENCODING_WIDTH + 3)` model input of one region.
#[derive(Clone, Debug)]
pub struct AssembledInput {
    tensor: Tensor,
    summaries: Vec<TrackSummary>,
}

impl AssembledInput {
    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn into_tensor(self) -> Tensor {
        self.tensor
    }

    /// The `(batch, length, channels)` dimensions.
    pub fn dims(&self) -> (usize, usize, usize) {
        let dims = self.tensor.dims();
        (dims[0], dims[1], dims[2])
    }

    pub fn device(&self) -> &Device {
        self.tensor.device()
    }

    pub fn track_summaries(&self) -> &[TrackSummary] {
        &self.summaries
    }

    /// Copy the input back to host memory as an [`Array3`].
    pub fn to_array(&self) -> Result<Array3<f32>, GenofuseError> {
        let values = self
            .tensor
            .to_device(&Device::Cpu)?
            .to_dtype(DType::F32)?
            .flatten_all()?
            .to_vec1::<f32>()?;
        Ok(Array3::from_shape_vec(self.dims(), values)?)
    }
}

/// Check that the four slices can be concatenated, returning their common length.
pub fn check_shapes(slices: &RegionSlices) -> Result<usize, GenofuseError> {
    let (len, width) = slices.sequence.dim();
    if width != ENCODING_WIDTH {
        return Err(GenofuseError::InvalidEncodingWidth(width, ENCODING_WIDTH));
    }
    let lengths = [slices.ctcf.len(), slices.atac.len(), slices.h3k27ac.len()];
    if len == 0 || lengths.iter().any(|&l| l != len) {
        return Err(GenofuseError::ShapeMismatch {
            sequence: len,
            ctcf: lengths[0],
            atac: lengths[1],
            h3k27ac: lengths[2],
        });
    }
    Ok(len)
}

/// Builds [`AssembledInput`]s on the device chosen by its [`DeviceSelector`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Assembler {
    selector: DeviceSelector,
    fill: FillPolicy,
}

impl Assembler {
    pub fn new(selector: DeviceSelector, fill: FillPolicy) -> Self {
        Self { selector, fill }
    }

    pub fn selector(&self) -> DeviceSelector {
        self.selector
    }

    pub fn fill_policy(&self) -> FillPolicy {
        self.fill
    }

    /// Assemble the slices on the device the selector resolves to at call time.
    pub fn assemble(&self, slices: &RegionSlices) -> Result<AssembledInput, GenofuseError> {
        let device = self.selector.select()?;
        self.assemble_on(slices, &device)
    }

    /// Assemble the slices on a given device.
    pub fn assemble_on(
        &self,
        slices: &RegionSlices,
        device: &Device,
    ) -> Result<AssembledInput, GenofuseError> {
        let len = check_shapes(slices)?;

        let sequence = Tensor::from_iter(slices.sequence.iter().copied(), device)?
            .reshape((1, len, ENCODING_WIDTH))?;

        let tracks = [&slices.ctcf, &slices.atac, &slices.h3k27ac];
        let mut channels = Vec::with_capacity(NUM_TRACKS);
        let mut summaries = Vec::with_capacity(NUM_TRACKS);
        for ((name, values), policy) in TRACK_NAMES.into_iter().zip(tracks).zip(self.fill.as_array()) {
            let (values, summary) = prepare_track(name, values, policy);
            channels.push(Tensor::from_iter(values.iter().copied(), device)?.reshape((1, len, 1))?);
            summaries.push(summary);
        }
        let signals = Tensor::cat(&channels, 2)?;
        let tensor = Tensor::cat(&[&sequence, &signals], 2)?;

        debug!("assembled input {:?} on {:?}", tensor.dims(), device);
        Ok(AssembledInput { tensor, summaries })
    }
}

fn prepare_track(
    name: &'static str,
    values: &Array1<f32>,
    policy: MissingValues,
) -> (Array1<f32>, TrackSummary) {
    let mut values = values.clone();
    let filled = match policy {
        MissingValues::Zero => fill_missing(&mut values),
        MissingValues::Keep => 0,
    };
    let remaining = values.iter().filter(|x| x.is_nan()).count();
    if filled > 0 {
        debug!("{}: replaced {} NaN value(s) with 0", name, filled);
    }
    if remaining > 0 {
        warn!("{}: {} NaN value(s) passed to the model", name, remaining);
    }
    let summary = TrackSummary {
        name,
        filled,
        remaining,
    };
    (values, summary)
}

#[cfg(test)]
mod tests {
    use super::{fill_missing, Assembler, FillPolicy, INPUT_CHANNELS};
    use crate::prelude::*;
    use crate::sequences::nucleotide::one_hot_encode;
    use crate::test_utilities::{random_region_slices, repeat_pattern};
    use candle_core::Device;
    use ndarray::{array, s, Array1, Array2, Axis};

    fn cpu_assembler(fill: FillPolicy) -> Assembler {
        Assembler::new(DeviceSelector::Cpu, fill)
    }

    #[test]
    fn test_fill_missing() {
        let mut x = array![1.0f32, f32::NAN, -2.0, f32::NAN];
        assert_eq!(fill_missing(&mut x), 2);
        assert_eq!(x, array![1.0, 0.0, -2.0, 0.0]);
    }

    #[test]
    fn test_assemble_shape() {
        let slices = random_region_slices(1000);
        let input = cpu_assembler(FillPolicy::default()).assemble(&slices).unwrap();
        assert_eq!(input.dims(), (1, 1000, ENCODING_WIDTH + 3));
        assert_eq!(INPUT_CHANNELS, 8);
        assert!(matches!(input.device(), Device::Cpu));
    }

    #[test]
    fn test_assemble_channel_order() {
        let slices = RegionSlices {
            sequence: one_hot_encode(b"ACG"),
            ctcf: array![1.0, 2.0, 3.0],
            atac: array![4.0, 5.0, 6.0],
            h3k27ac: array![7.0, 8.0, 9.0],
        };
        let x = cpu_assembler(FillPolicy::default())
            .assemble(&slices)
            .unwrap()
            .to_array()
            .unwrap();
        assert_eq!(
            x.slice(s![0, .., ..]),
            array![
                [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 4.0, 7.0],
                [0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 5.0, 8.0],
                [0.0, 0.0, 0.0, 1.0, 0.0, 3.0, 6.0, 9.0],
            ]
        );
    }

    #[test]
    fn test_assemble_idempotent() {
        let slices = random_region_slices(257);
        let copy = slices.clone();
        let assembler = cpu_assembler(FillPolicy::default());
        let a = assembler.assemble(&slices).unwrap().to_array().unwrap();
        let b = assembler.assemble(&copy).unwrap().to_array().unwrap();
        let bits = |x: &ndarray::Array3<f32>| x.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_assemble_window_one() {
        let slices = random_region_slices(1);
        let input = cpu_assembler(FillPolicy::default()).assemble(&slices).unwrap();
        assert_eq!(input.dims(), (1, 1, INPUT_CHANNELS));
    }

    #[test]
    fn test_assemble_shape_mismatch() {
        let mut slices = random_region_slices(1000);
        slices.atac = Array1::zeros(999);
        let result = cpu_assembler(FillPolicy::default()).assemble(&slices);
        assert!(matches!(
            result,
            Err(GenofuseError::ShapeMismatch {
                sequence: 1000,
                ctcf: 1000,
                atac: 999,
                h3k27ac: 1000
            })
        ));

        // a short sequence is a mismatch too, never padded
        let mut slices = random_region_slices(1000);
        slices.sequence = one_hot_encode(&repeat_pattern(b"ACGT", 999));
        assert!(matches!(
            cpu_assembler(FillPolicy::default()).assemble(&slices),
            Err(GenofuseError::ShapeMismatch { sequence: 999, .. })
        ));
    }

    #[test]
    fn test_assemble_bad_encoding_width() {
        let mut slices = random_region_slices(10);
        slices.sequence = Array2::zeros((10, 4));
        assert!(matches!(
            cpu_assembler(FillPolicy::default()).assemble(&slices),
            Err(GenofuseError::InvalidEncodingWidth(4, 5))
        ));
    }

    #[test]
    fn test_ctcf_missing_values_zeroed() {
        let mut slices = random_region_slices(500);
        let nan_positions = [0usize, 17, 250, 499];
        for &i in &nan_positions {
            slices.ctcf[i] = f32::NAN;
        }
        let input = cpu_assembler(FillPolicy::default()).assemble(&slices).unwrap();
        let x = input.to_array().unwrap();
        let ctcf = x.slice(s![0, .., ENCODING_WIDTH]);
        for (i, (&got, &original)) in ctcf.iter().zip(slices.ctcf.iter()).enumerate() {
            if nan_positions.contains(&i) {
                assert_eq!(got, 0.0);
            } else {
                assert_eq!(got.to_bits(), original.to_bits());
            }
        }
        assert_eq!(input.track_summaries()[0].filled, nan_positions.len());
        assert_eq!(input.track_summaries()[0].remaining, 0);
    }

    #[test]
    fn test_fill_policy_per_track() {
        let mut slices = random_region_slices(20);
        slices.atac[3] = f32::NAN;
        slices.h3k27ac[4] = f32::NAN;

        // default keeps NaN in the log-normalized tracks
        let x = cpu_assembler(FillPolicy::default())
            .assemble(&slices)
            .unwrap()
            .to_array()
            .unwrap();
        assert!(x[[0, 3, ENCODING_WIDTH + 1]].is_nan());
        assert!(x[[0, 4, ENCODING_WIDTH + 2]].is_nan());

        let input = cpu_assembler(FillPolicy::all_zero()).assemble(&slices).unwrap();
        let x = input.to_array().unwrap();
        assert_eq!(x[[0, 3, ENCODING_WIDTH + 1]], 0.0);
        assert_eq!(x[[0, 4, ENCODING_WIDTH + 2]], 0.0);
        assert!(x.iter().all(|v| !v.is_nan()));
        let filled: Vec<usize> = input.track_summaries().iter().map(|s| s.filled).collect();
        assert_eq!(filled, vec![0, 1, 1]);
    }

    #[test]
    fn test_sequence_channels_untouched() {
        let slices = random_region_slices(64);
        let x = cpu_assembler(FillPolicy::default())
            .assemble(&slices)
            .unwrap()
            .to_array()
            .unwrap();
        let seq = x.slice(s![0, .., ..ENCODING_WIDTH]);
        assert_eq!(seq, slices.sequence);
        assert!(seq.sum_axis(Axis(1)).iter().all(|&v| v == 1.0));
    }
}
