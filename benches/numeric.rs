use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use stack_registration::{
    eigenvector, invert3, pack_rgb, reduce, solve_eigenvalues, ColorStack, Matrix3,
};

fn bench_eigen(c: &mut Criterion) {
    let scatter = Matrix3([[420.0, 130.5, -75.0], [130.5, 310.0, 42.0], [-75.0, 42.0, 150.0]]);
    c.bench_function("solve_eigenvalues", |b| b.iter(|| solve_eigenvalues(black_box(&scatter))));

    let lambda = solve_eigenvalues(&scatter).largest_absolute();
    c.bench_function("eigenvector", |b| {
        b.iter(|| eigenvector(black_box(&scatter), black_box(lambda)))
    });

    let affine = Matrix3([[50.0, 25.0, 1.0], [25.0, 75.0, 1.0], [75.0, 75.0, 1.0]]);
    c.bench_function("invert3", |b| b.iter(|| invert3(black_box(&affine))));
}

fn bench_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce");
    let image_sizes = vec![(256, 224), (512, 448), (1024, 896)];

    for (width, height) in image_sizes {
        let id = format!("{}x{}", width, height);
        let slices: Vec<Vec<u32>> = (0..4u32)
            .map(|s| {
                (0..width * height)
                    .map(|k| pack_rgb([(k % 251) as u8, ((k / 7 + s) % 253) as u8, (k % 97) as u8]))
                    .collect()
            })
            .collect();
        let stack = ColorStack::packed(width, height, slices).unwrap();
        group.bench_with_input(BenchmarkId::new("packed", &id), &stack, |b, s| {
            b.iter(|| reduce(black_box(s)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_eigen, bench_reduce);
criterion_main!(benches);
