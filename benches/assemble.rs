use criterion::{criterion_group, criterion_main, Criterion};
use genofuse::prelude::*;
use genofuse::test_utilities::random_region_slices;

const REGION_LENGTH: usize = 262_144;

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");

    let slices = random_region_slices(REGION_LENGTH);
    let mut with_missing = slices.clone();
    for i in (0..REGION_LENGTH).step_by(97) {
        with_missing.ctcf[i] = f32::NAN;
        with_missing.atac[i] = f32::NAN;
    }

    group.sample_size(10);

    group.bench_function("default_fill", |b| {
        let assembler = Assembler::new(DeviceSelector::Cpu, FillPolicy::default());
        b.iter(|| assembler.assemble(&slices).unwrap().dims());
    });

    group.bench_function("all_zero_fill_with_missing", |b| {
        let assembler = Assembler::new(DeviceSelector::Cpu, FillPolicy::all_zero());
        b.iter(|| assembler.assemble(&with_missing).unwrap().dims());
    });

    group.finish();
}

criterion_group!(benches, bench_assemble);
criterion_main!(benches);
