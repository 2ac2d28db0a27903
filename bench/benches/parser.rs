use bench::scaled_sample;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use tacky::parser;

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for times in [1, 16, 64] {
        let input = scaled_sample(times);
        group.bench_with_input(BenchmarkId::from_parameter(times), &input, |b, input| {
            b.iter(|| {
                let output = parser::compile(black_box(input));
                black_box(output.is_ok())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
