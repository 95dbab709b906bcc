use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{DMat3, DVec2, DVec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use stereo_3d::pose::{epipolar_residuals, fundamental_8point, ransac_fundamental, RansacParams};

// rectified pair seen through a 500 px pinhole, 10% gross outliers
fn correspondences(num_points: usize) -> (Vec<DVec2>, Vec<DVec2>) {
    let mut rng = StdRng::seed_from_u64(0);
    let baseline = DVec3::new(-0.54, 0.0, 0.0);
    let project = |p: DVec3| DVec2::new(500.0 * p.x / p.z + 320.0, 500.0 * p.y / p.z + 240.0);

    (0..num_points)
        .map(|i| {
            let p = DVec3::new(
                rng.random_range(-3.0..3.0),
                rng.random_range(-2.0..2.0),
                rng.random_range(3.0..15.0),
            );
            let mut x2 = project(p + baseline);
            if i % 10 == 0 {
                x2.y += rng.random_range(5.0..40.0);
            }
            (project(p), x2)
        })
        .unzip()
}

fn bench_ransac(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fundamental");

    for num_points in [100, 500, 2000].iter() {
        let (x1, x2) = correspondences(*num_points);
        let parameter_string = format!("{num_points}");

        group.bench_with_input(
            BenchmarkId::new("fundamental_8point", &parameter_string),
            &(&x1, &x2),
            |b, (x1, x2)| b.iter(|| black_box(fundamental_8point(x1, x2))),
        );

        group.bench_with_input(
            BenchmarkId::new("ransac_fundamental", &parameter_string),
            &(&x1, &x2),
            |b, (x1, x2)| {
                b.iter(|| black_box(ransac_fundamental(x1, x2, &RansacParams::default())))
            },
        );

        let f = DMat3::from_cols(DVec3::ZERO, DVec3::Z, DVec3::NEG_Y);
        group.bench_with_input(
            BenchmarkId::new("epipolar_residuals", &parameter_string),
            &(&x1, &x2),
            |b, (x1, x2)| b.iter(|| black_box(epipolar_residuals(x1, x2, &f))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_ransac);
criterion_main!(benches);
