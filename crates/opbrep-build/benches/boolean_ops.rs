//! Criterion benchmarks for Boolean operations on boxes and cylinders.
//! Results: by default under target/criterion.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use opbrep_build::{boolean_op, BooleanOp, BuildConfig};
use opbrep_math::Point3;
use opbrep_primitives::{make_box, make_cylinder};

fn bench_boxes(c: &mut Criterion) {
    let mut group = c.benchmark_group("boxes");
    let a = make_box(Point3::origin(), 1.0, 1.0, 1.0).unwrap();
    let b = make_box(Point3::new(0.5, 0.25, 0.25), 1.0, 0.5, 0.5).unwrap();
    for (name, op) in [("fuse", BooleanOp::Fuse), ("cut", BooleanOp::Cut), ("common", BooleanOp::Common)] {
        group.bench_with_input(BenchmarkId::new("crossing", name), &op, |bench, &op| {
            bench.iter(|| boolean_op(&a, &b, op, &BuildConfig::default()).unwrap())
        });
    }

    let far = make_box(Point3::new(3.0, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap();
    for use_kparts in [true, false] {
        let config = BuildConfig {
            use_kparts,
            ..BuildConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("disjoint_fuse", use_kparts), &config, |bench, config| {
            bench.iter(|| boolean_op(&a, &far, BooleanOp::Fuse, config).unwrap())
        });
    }
    group.finish();
}

fn bench_cylinder(c: &mut Criterion) {
    let cyl = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
    let slab = make_box(Point3::new(-2.0, -2.0, 0.75), 4.0, 4.0, 0.5).unwrap();
    c.bench_function("cylinder_cut_slab", |bench| {
        bench.iter(|| boolean_op(&cyl, &slab, BooleanOp::Cut, &BuildConfig::default()).unwrap())
    });
}

criterion_group!(benches, bench_boxes, bench_cylinder);
criterion_main!(benches);
