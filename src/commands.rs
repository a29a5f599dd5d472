//! Command functions behind the `genofuse` command line tool.
//!
//! Each command writes its result as a NumPy `.npy` file (gzip-compressed if the output
//! path ends in `.gz`) and returns a [`CommandOutput`] with a [`Report`] for the user.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::assemble::{AssembledInput, TrackSummary};
use crate::error::GenofuseError;
use crate::io::{sanitize_path, OutputFile};
use crate::loader::{load_region, RegionSlices};
use crate::predict::Predictor;
use crate::reporting::{CommandOutput, Report};
use crate::sequences::nucleotide::NucleotideSequences;
use crate::traits::{ModelLoader, SequenceSource};
use crate::Position;

/// The inputs that locate one region and its four stores.
#[derive(Clone, Debug)]
pub struct RegionInputs {
    pub seqname: String,
    pub start: Position,
    pub window: Position,
    pub sequence_dir: PathBuf,
    pub ctcf: PathBuf,
    pub atac: PathBuf,
    pub h3k27ac: PathBuf,
}

impl RegionInputs {
    pub fn load(&self) -> Result<RegionSlices, GenofuseError> {
        load_region(
            &self.seqname,
            self.start,
            &self.sequence_dir,
            &self.ctcf,
            &self.atac,
            &self.h3k27ac,
            self.window,
        )
    }
}

fn report_tracks(summaries: &[TrackSummary], report: &mut Report) {
    for summary in summaries {
        if summary.filled > 0 {
            report.add_issue(format!(
                "{}: replaced {} missing value(s) with 0",
                summary.name, summary.filled
            ));
        }
        if summary.remaining > 0 {
            report.add_issue(format!(
                "{}: {} missing value(s) passed to the model as NaN (see --fill-all)",
                summary.name, summary.remaining
            ));
        }
    }
}

/// Load a region, assemble it and write the `(1, L, channels)` input tensor.
pub fn genofuse_assemble<L: ModelLoader>(
    region: &RegionInputs,
    predictor: &Predictor<L>,
    output: impl AsRef<Path>,
) -> Result<CommandOutput<(usize, usize, usize)>, GenofuseError> {
    let mut report = Report::new();
    let slices = region.load()?;
    let input: AssembledInput = predictor.assembler().assemble(&slices)?;
    report_tracks(input.track_summaries(), &mut report);

    OutputFile::new(output.as_ref()).write_npy(&input.to_array()?)?;
    info!("wrote input {:?} to {}", input.dims(), output.as_ref().display());
    Ok(CommandOutput::new(input.dims(), report))
}

/// Load a region, run the model at `model_path` on it and write the prediction.
pub fn genofuse_predict<L: ModelLoader>(
    region: &RegionInputs,
    predictor: &Predictor<L>,
    model_path: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<CommandOutput<Vec<usize>>, GenofuseError> {
    let mut report = Report::new();
    let slices = region.load()?;

    let loaded = predictor.load(model_path)?;
    let input = predictor.assembler().assemble_on(&slices, loaded.device())?;
    report_tracks(input.track_summaries(), &mut report);
    let prediction = loaded.forward(&input)?;

    let nan_count = prediction.iter().filter(|x| x.is_nan()).count();
    if nan_count > 0 {
        report.add_issue(format!("prediction contains {} NaN value(s)", nan_count));
    }

    OutputFile::new(output.as_ref()).write_npy(&prediction)?;
    info!(
        "wrote prediction {:?} to {}",
        prediction.shape(),
        output.as_ref().display()
    );
    Ok(CommandOutput::new(prediction.shape().to_vec(), report))
}

/// One-hot encode `[start, end)` of `seqname` from a FASTA file and write it.
pub fn genofuse_encode(
    fasta: impl AsRef<Path>,
    seqname: &str,
    start: Position,
    end: Position,
    output: impl AsRef<Path>,
) -> Result<CommandOutput<(usize, usize)>, GenofuseError> {
    let mut report = Report::new();
    let sequences = NucleotideSequences::from_fasta(sanitize_path(fasta), None)?;
    let encoded = sequences.get(seqname, start, end)?;

    let ambiguous = encoded.column(encoded.ncols() - 1).sum() as usize;
    if ambiguous > 0 {
        report.add_issue(format!("{} position(s) encoded as N", ambiguous));
    }

    OutputFile::new(output.as_ref()).write_npy(&encoded)?;
    Ok(CommandOutput::new(encoded.dim(), report))
}
