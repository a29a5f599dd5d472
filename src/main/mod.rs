use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use genofuse::{
    assemble::{Assembler, FillPolicy},
    commands::{genofuse_assemble, genofuse_encode, genofuse_predict, RegionInputs},
    device::DeviceSelector,
    models::ConvHeadLoader,
    predict::Predictor,
    prelude::GenofuseError,
    reporting::Report,
    Position, DEFAULT_WINDOW,
};
use tracing_subscriber::EnvFilter;

const INFO: &str = "\
genofuse: fuse genomic sequence and signal tracks into model inputs, and predict
usage: genofuse [--help] <subcommand>

Subcommands:

  predict: run a model on one region.
  assemble: write the assembled (1, L, 8) input tensor of one region.
  encode: write the one-hot encoding of a FASTA region.

";

#[derive(Parser)]
#[clap(name = "genofuse")]
#[clap(about = INFO)]
struct Cli {
    /// increase logging verbosity (-d info, -dd debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct RegionArgs {
    /// the chromosome name, e.g. chr2
    #[arg(long, required = true)]
    chrom: String,

    /// the 0-indexed region start
    #[arg(long, required = true)]
    start: Position,

    /// the region width in basepairs
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    window: Position,

    /// directory of per-chromosome <chrom>.fa.gz sequence files
    #[arg(long, required = true)]
    seq_dir: PathBuf,

    /// CTCF track (.npz archive or directory of <chrom>.npy files)
    #[arg(long, required = true)]
    ctcf: PathBuf,

    /// ATAC-seq track, log-normalized on load
    #[arg(long, required = true)]
    atac: PathBuf,

    /// H3K27ac track, log-normalized on load
    #[arg(long, required = true)]
    h3k27ac: PathBuf,

    /// compute device: auto, cpu, cuda[:n] or metal[:n]
    #[arg(long, default_value = "auto", value_parser = parse_device)]
    device: DeviceSelector,

    /// replace missing values with 0 in all tracks (default: CTCF only)
    #[arg(long)]
    fill_all: bool,
}

impl RegionArgs {
    fn inputs(&self) -> RegionInputs {
        RegionInputs {
            seqname: self.chrom.clone(),
            start: self.start,
            window: self.window,
            sequence_dir: self.seq_dir.clone(),
            ctcf: self.ctcf.clone(),
            atac: self.atac.clone(),
            h3k27ac: self.h3k27ac.clone(),
        }
    }

    fn predictor(&self) -> Predictor {
        let fill = if self.fill_all {
            FillPolicy::all_zero()
        } else {
            FillPolicy::default()
        };
        Predictor::new(Assembler::new(self.device, fill), ConvHeadLoader)
    }
}

fn parse_device(s: &str) -> Result<DeviceSelector, String> {
    s.parse().map_err(|e: GenofuseError| e.to_string())
}

#[derive(Subcommand)]
enum Commands {
    Predict {
        #[command(flatten)]
        region: RegionArgs,

        /// model checkpoint: a directory with config.json and model.safetensors, or a .safetensors file
        #[arg(long, required = true)]
        model: PathBuf,

        /// output .npy file (.npy.gz for gzip-compressed output)
        #[arg(long, required = true)]
        output: PathBuf,
    },
    Assemble {
        #[command(flatten)]
        region: RegionArgs,

        /// output .npy file (.npy.gz for gzip-compressed output)
        #[arg(long, required = true)]
        output: PathBuf,
    },
    Encode {
        /// a (possibly gzipped) FASTA file
        #[arg(long, required = true)]
        fasta: PathBuf,

        /// the sequence name
        #[arg(long, required = true)]
        chrom: String,

        /// the 0-indexed region start
        #[arg(long, required = true)]
        start: Position,

        /// the right-exclusive region end
        #[arg(long, required = true)]
        end: Position,

        /// output .npy file (.npy.gz for gzip-compressed output)
        #[arg(long, required = true)]
        output: PathBuf,
    },
}

fn init_logging(debug: u8) {
    let level = match debug {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &Report) {
    for entry in report.entries() {
        eprintln!("note: {}", entry);
    }
}

fn run() -> Result<(), GenofuseError> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let report = match &cli.command {
        Some(Commands::Predict {
            region,
            model,
            output,
        }) => {
            let (_shape, report) =
                genofuse_predict(&region.inputs(), &region.predictor(), model, output)?.into_parts();
            report
        }
        Some(Commands::Assemble { region, output }) => {
            let (_dims, report) =
                genofuse_assemble(&region.inputs(), &region.predictor(), output)?.into_parts();
            report
        }
        Some(Commands::Encode {
            fasta,
            chrom,
            start,
            end,
            output,
        }) => {
            let (_dims, report) = genofuse_encode(fasta, chrom, *start, *end, output)?.into_parts();
            report
        }
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    };
    print_report(&report);
    Ok(())
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
