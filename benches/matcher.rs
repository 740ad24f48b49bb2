use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rand::prelude::*;
use rand::rngs::StdRng;
use vladsearch::verify::{Point, RansacOptions, knn_l2, ransac_homography};
use vladsearch::{Features, KeyPoint, Verifier, VerifyOptions};

const DIM: usize = 128;

fn bench_knn(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher");
    let mut rng = StdRng::seed_from_u64(42);

    for n in [250, 500, 1000] {
        let va = (0..n * DIM).map(|_| rng.random::<f32>()).collect::<Vec<_>>();
        let vb = (0..n * DIM).map(|_| rng.random::<f32>()).collect::<Vec<_>>();

        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("knn_l2_{n}x{n}"), |b| {
            b.iter(|| knn_l2(black_box(&va), black_box(&vb), DIM, 2))
        });
    }

    group.finish();
}

/// 70% 内点的点对
fn correspondences(rng: &mut StdRng, n: usize) -> (Vec<Point>, Vec<Point>) {
    let (s, c) = 0.3f64.sin_cos();
    let mut src = vec![];
    let mut dst = vec![];
    for i in 0..n {
        let p = [rng.random_range(0.0..320.0), rng.random_range(0.0..240.0)];
        let q = if i % 10 < 7 {
            [1.1 * (c * p[0] - s * p[1]) + 12., 1.1 * (s * p[0] + c * p[1]) - 7.]
        } else {
            [rng.random_range(0.0..320.0), rng.random_range(0.0..240.0)]
        };
        src.push(p);
        dst.push(q);
    }
    (src, dst)
}

fn bench_ransac(c: &mut Criterion) {
    let mut group = c.benchmark_group("ransac");
    let mut rng = StdRng::seed_from_u64(42);

    for n in [50, 200, 500] {
        let (src, dst) = correspondences(&mut rng, n);
        group.bench_function(format!("ransac_homography_{n}"), |b| {
            b.iter(|| ransac_homography(black_box(&src), &dst, &RansacOptions::default()))
        });
    }

    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let n = 500;
    let keypoints = (0..n)
        .map(|_| KeyPoint::new(rng.random_range(0.0..320.0), rng.random_range(0.0..240.0)))
        .collect::<Vec<_>>();
    let descriptors = (0..n * DIM).map(|_| rng.random::<f32>()).collect::<Vec<_>>();
    let features = Features::new(DIM, keypoints, descriptors).unwrap();
    let verifier = Verifier::new(VerifyOptions::default());

    c.bench_function("verify_score_500", |b| {
        b.iter(|| verifier.score(black_box(&features), &features))
    });
}

criterion_group!(benches, bench_knn, bench_ransac, bench_score);
criterion_main!(benches);
