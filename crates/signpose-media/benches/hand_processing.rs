use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;

use signpose_media::hand::{AnatomicalConstraints, HandPoseProcessor, TemporalSmoother};
use signpose_models::HAND_DIM;

fn hand_sequence(frames: usize) -> Array2<f32> {
    Array2::from_shape_fn((frames, HAND_DIM), |(i, j)| ((i * 7 + j * 13) % 31) as f32 * 0.1 - 1.5)
}

fn bench_smoother(c: &mut Criterion) {
    let mut group = c.benchmark_group("smoother");
    for frames in [30, 120, 600] {
        let seq = hand_sequence(frames);
        for sigma in [0.3, 2.0] {
            let smoother = TemporalSmoother::new(sigma);
            group.bench_with_input(
                BenchmarkId::new(format!("sigma_{}", sigma), frames),
                &seq,
                |b, seq| b.iter(|| smoother.smooth(black_box(seq.view()))),
            );
        }
    }
    group.finish();
}

fn bench_constraints(c: &mut Criterion) {
    let constraints = AnatomicalConstraints::default();
    let seq = hand_sequence(120);
    c.bench_function("constraints_120_frames", |b| {
        b.iter(|| constraints.apply_sequence(black_box(seq.view())))
    });
}

fn bench_processor(c: &mut Criterion) {
    let processor = HandPoseProcessor::default();
    let seq = hand_sequence(120);
    c.bench_function("hand_processor_120_frames", |b| {
        b.iter(|| processor.process(black_box(seq.view())))
    });
}

criterion_group!(benches, bench_smoother, bench_constraints, bench_processor);
criterion_main!(benches);
