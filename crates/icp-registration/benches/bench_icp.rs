use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use icp_registration::{
    axis_angle_to_rotation_matrix, find_correspondences, icp, icp_trimmed, IcpParams, PointCloud,
    RigidTransform, SpatialIndex,
};

fn random_cloud(num_points: usize, max_range: f64) -> Vec<[f64; 3]> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..num_points)
        .map(|_| {
            [
                rng.random_range(0.0..max_range),
                rng.random_range(0.0..max_range),
                rng.random_range(0.0..max_range),
            ]
        })
        .collect()
}

fn bench_correspondences(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_correspondences");

    for num_points in [1_000, 10_000, 100_000] {
        let reference = random_cloud(num_points, 10.0);
        let query = reference
            .iter()
            .map(|p| [p[0] + 0.01, p[1] - 0.01, p[2] + 0.02])
            .collect::<Vec<_>>();
        let index = SpatialIndex::from_points(&reference).expect("non-empty reference");

        group.bench_with_input(
            BenchmarkId::from_parameter(num_points),
            &query,
            |b, query| b.iter(|| find_correspondences(black_box(query), black_box(&index))),
        );
    }
    group.finish();
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    let reference = PointCloud::new(random_cloud(10_000, 10.0));
    let motion = RigidTransform::from_rotation_translation(
        &axis_angle_to_rotation_matrix(&[0.0, 0.0, 1.0], 0.02).expect("valid axis"),
        &[0.05, 0.02, -0.03],
    );
    let moving = reference.transformed(&motion);

    group.bench_function("icp", |b| {
        b.iter(|| icp(black_box(&reference), moving.clone(), &IcpParams::default()))
    });

    let params = IcpParams {
        overlap_ratio: 0.8,
        ..Default::default()
    };
    group.bench_function("icp_trimmed", |b| {
        b.iter(|| icp_trimmed(black_box(&reference), moving.clone(), &params))
    });

    group.finish();
}

criterion_group!(benches, bench_correspondences, bench_registration);
criterion_main!(benches);
