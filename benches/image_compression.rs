use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use svd_image_compression::prelude::*;
use svd_image_compression::random_image::noisy_gradient_image;

fn bench_compression(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let image = noisy_gradient_image(128, 96, 12.0, &mut rng).unwrap();
    let decomposition = decompose_image(&image).unwrap();

    c.bench_function("decompose 128x96", |b| {
        b.iter(|| decompose_image(black_box(&image)).unwrap())
    });

    c.bench_function("compress 128x96 expvar0.975", |b| {
        b.iter(|| compress_image(black_box(&image), SelectionPolicy::default()).unwrap())
    });

    c.bench_function("reconstruct cached 128x96 rank10", |b| {
        b.iter(|| compress_decomposed(black_box(&decomposition), SelectionPolicy::FixedRank(10)).unwrap())
    });

    let reconstructed = compress_image(&image, SelectionPolicy::FixedRank(10)).unwrap().image;
    c.bench_function("evaluate 128x96", |b| {
        b.iter(|| evaluate(black_box(&image), black_box(&reconstructed), 36864, 12000).unwrap())
    });
}

criterion_group!(benches, bench_compression);
criterion_main!(benches);
