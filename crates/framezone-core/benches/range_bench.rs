//! Benchmarks for framezone-core range queries.
//!
//! Run with: cargo bench -p framezone-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use framezone_core::{FrameRate, TimeRange, VideoInfo, PixelFormat};

fn bench_containment(c: &mut Criterion) {
    let timeline = TimeRange::new(0, 200_000);
    let plain = TimeRange::new(1_000, 9_000);
    let wrapped = TimeRange::new(180_000, 20_000);

    c.bench_function("contains_plain", |bencher| {
        bencher.iter(|| black_box(plain).contains(black_box(5_000)));
    });

    c.bench_function("contains_within_wrapped", |bencher| {
        bencher.iter(|| black_box(wrapped).contains_within(black_box(190_000), black_box(timeline)));
    });
}

fn bench_frame_grid(c: &mut Criterion) {
    let info = VideoInfo {
        width: 1920,
        height: 1080,
        pixel_format: PixelFormat::Bgr24,
        frame_rate: FrameRate::FPS_29_97,
        timestamps_per_second: 30_000,
        first_timestamp: 0,
        frame_count: 108_000,
    };

    c.bench_function("timestamp_of_frame", |bencher| {
        bencher.iter(|| info.timestamp_of(black_box(86_400)));
    });

    c.bench_function("index_of_timestamp", |bencher| {
        bencher.iter(|| info.index_of(black_box(86_486_400)));
    });
}

criterion_group!(benches, bench_containment, bench_frame_grid);
criterion_main!(benches);
