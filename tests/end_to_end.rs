//! End-to-end runs of the region -> assembly -> prediction pipeline.

use genofuse::prelude::*;
use genofuse::test_utilities::{
    repeat_pattern, write_conv_head_checkpoint, write_region_fixture, write_region_fixture_with,
};
use ndarray::{Array1, ArrayD};
use ndarray_npy::read_npy;
use std::process::Command;

fn cpu_predictor() -> Predictor {
    Predictor::new(
        Assembler::new(DeviceSelector::Cpu, FillPolicy::default()),
        ConvHeadLoader,
    )
}

#[test]
fn test_chrt_full_window_prediction() {
    let len = DEFAULT_WINDOW as usize;
    let fixture =
        write_region_fixture_with("chrT", &repeat_pattern(b"ACGTAGCT", len), Array1::zeros(len))
            .expect("could not write chrT stores");

    let slices = fixture.load(0, DEFAULT_WINDOW).expect("could not load chrT");
    assert_eq!(slices.len(), len);
    assert_eq!(slices.ctcf.len(), len);
    assert_eq!(slices.atac.len(), len);
    assert_eq!(slices.h3k27ac.len(), len);

    let model_dir = fixture.dir.path().join("model");
    std::fs::create_dir_all(&model_dir).unwrap();
    let config = ConvHeadConfig {
        hidden_channels: 4,
        kernel_size: 1,
        output_channels: 2,
        ..Default::default()
    };
    write_conv_head_checkpoint(&model_dir, &config).unwrap();

    let pred = cpu_predictor()
        .predict(&slices, &model_dir)
        .expect("prediction failed");
    assert_eq!(pred.shape(), &[len, config.output_channels]);
    assert!(pred.iter().all(|x| !x.is_nan()));
}

#[test]
fn test_region_then_default_prediction() {
    let fixture = write_region_fixture("chr7", 1_000).unwrap();
    let model_dir = fixture.dir.path().join("model");
    std::fs::create_dir_all(&model_dir).unwrap();
    write_conv_head_checkpoint(&model_dir, &ConvHeadConfig::default()).unwrap();

    let slices = load_region(
        "chr7",
        250,
        &fixture.sequence_dir,
        &fixture.ctcf,
        &fixture.atac,
        &fixture.h3k27ac,
        500,
    )
    .unwrap();
    let pred = prediction(&slices, &model_dir).unwrap();
    assert_eq!(pred.shape(), &[500, 1]);
}

#[test]
fn test_missing_values_reach_model_only_when_kept() {
    let len = 64;
    let mut signal = Array1::from_elem(len, 1.0f32);
    signal[10] = f32::NAN;
    let fixture = write_region_fixture_with("chr1", &repeat_pattern(b"ACGT", len), signal).unwrap();
    let slices = fixture.load(0, len as Position).unwrap();

    let input = Assembler::new(DeviceSelector::Cpu, FillPolicy::default())
        .assemble(&slices)
        .unwrap()
        .to_array()
        .unwrap();
    assert_eq!(input[[0, 10, ENCODING_WIDTH]], 0.0);
    assert!(input[[0, 10, ENCODING_WIDTH + 1]].is_nan());

    let input = Assembler::new(DeviceSelector::Cpu, FillPolicy::all_zero())
        .assemble(&slices)
        .unwrap()
        .to_array()
        .unwrap();
    assert!(input.iter().all(|x| !x.is_nan()));
}

#[test]
fn test_cli_predict() {
    let fixture = write_region_fixture("chr1", 2_000).unwrap();
    let model_dir = fixture.dir.path().join("model");
    std::fs::create_dir_all(&model_dir).unwrap();
    let config = ConvHeadConfig {
        hidden_channels: 8,
        kernel_size: 3,
        output_channels: 1,
        ..Default::default()
    };
    write_conv_head_checkpoint(&model_dir, &config).unwrap();
    let output = fixture.dir.path().join("pred.npy");

    let status = Command::new(env!("CARGO_BIN_EXE_genofuse"))
        .arg("predict")
        .arg("--chrom")
        .arg("chr1")
        .arg("--start")
        .arg("100")
        .arg("--window")
        .arg("1000")
        // stray '=' characters are stripped from paths
        .arg(format!("--seq-dir=={}", fixture.sequence_dir.display()))
        .arg("--ctcf")
        .arg(&fixture.ctcf)
        .arg("--atac")
        .arg(&fixture.atac)
        .arg("--h3k27ac")
        .arg(&fixture.h3k27ac)
        .arg("--device")
        .arg("cpu")
        .arg("--model")
        .arg(&model_dir)
        .arg("--output")
        .arg(&output)
        .status()
        .expect("genofuse predict failed to run");
    assert!(status.success());

    let pred: ArrayD<f32> = read_npy(&output).unwrap();
    assert_eq!(pred.shape(), &[1000, 1]);
}

#[test]
fn test_cli_out_of_range() {
    let fixture = write_region_fixture("chr1", 100).unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_genofuse"))
        .arg("assemble")
        .arg("--chrom")
        .arg("chr1")
        .arg("--start")
        .arg("50")
        .arg("--window")
        .arg("100")
        .arg("--seq-dir")
        .arg(&fixture.sequence_dir)
        .arg("--ctcf")
        .arg(&fixture.ctcf)
        .arg("--atac")
        .arg(&fixture.atac)
        .arg("--h3k27ac")
        .arg(&fixture.h3k27ac)
        .arg("--output")
        .arg(fixture.dir.path().join("input.npy"))
        .output()
        .expect("genofuse assemble failed to run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Range [50, 150) is invalid for sequence of length 100"));
}
