use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use indexmap::IndexMap;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use skellymodels::anatomy::AnatomicalStructure;
use skellymodels::biomechanics::{
    calculate_center_of_mass, enforce_rigid_bones, synthesize_virtual_markers,
};
use skellymodels::model_info::{SegmentCenterOfMass, SegmentConnection, VirtualMarkerDefinition};
use skellymodels::PointArray;

const N_TRACKED: usize = 33;
const N_FRAMES: usize = 3_000;

/// A chain of tracked markers, one virtual midpoint per consecutive pair and one segment
/// per pair, with uniform mass fractions.
fn chain_structure() -> AnatomicalStructure {
    let tracked: Vec<String> = (0..N_TRACKED).map(|i| format!("m{i:02}")).collect();

    let mut virtual_markers = IndexMap::new();
    let mut segments = IndexMap::new();
    let mut coms = IndexMap::new();
    for (i, pair) in tracked.windows(2).enumerate() {
        virtual_markers.insert(
            format!("mid{i:02}"),
            VirtualMarkerDefinition {
                marker_names: pair.to_vec(),
                marker_weights: vec![0.5, 0.5],
            },
        );
        segments.insert(
            format!("seg{i:02}"),
            SegmentConnection {
                proximal: pair[0].clone(),
                distal: pair[1].clone(),
            },
        );
        coms.insert(
            format!("seg{i:02}"),
            SegmentCenterOfMass {
                segment_com_length: 0.45,
                segment_com_percentage: 1.0 / (N_TRACKED - 1) as f64,
            },
        );
    }

    AnatomicalStructure::builder()
        .with_landmarks(tracked)
        .with_virtual_markers(virtual_markers)
        .with_segment_connections(segments)
        .with_center_of_mass(coms)
        .build()
        .unwrap()
}

/// Random walk around a rest pose, with ~1% undetected points.
fn noisy_points(rng: &mut StdRng) -> PointArray {
    PointArray::from_fn(N_FRAMES, N_TRACKED, |_, marker| {
        if rng.random::<f64>() < 0.01 {
            return Vector3::repeat(f64::NAN);
        }
        let rest = Vector3::new(0.0, 0.0, marker as f64 * 0.05);
        rest + Vector3::new(
            rng.random::<f64>() - 0.5,
            rng.random::<f64>() - 0.5,
            rng.random::<f64>() - 0.5,
        ) * 0.01
    })
}

fn bench_virtual_markers(c: &mut Criterion) {
    let structure = chain_structure();
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let points = noisy_points(&mut rng);

    c.bench_function("biomechanics/synthesize_virtual_markers", |b| {
        b.iter(|| {
            let traj = synthesize_virtual_markers(black_box(&points), &structure).unwrap();
            black_box(traj);
        })
    });
}

fn bench_center_of_mass(c: &mut Criterion) {
    let structure = chain_structure();
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let traj = synthesize_virtual_markers(&noisy_points(&mut rng), &structure).unwrap();

    c.bench_function("biomechanics/calculate_center_of_mass", |b| {
        b.iter(|| {
            let com = calculate_center_of_mass(black_box(&traj), &structure).unwrap();
            black_box(com);
        })
    });
}

fn bench_rigid_bones(c: &mut Criterion) {
    let structure = chain_structure();
    let mut rng = StdRng::seed_from_u64(0xB0E5);

    c.bench_function("biomechanics/enforce_rigid_bones", |b| {
        b.iter_batched(
            || synthesize_virtual_markers(&noisy_points(&mut rng), &structure).unwrap(),
            |traj| {
                let rigid = enforce_rigid_bones(&traj, &structure).unwrap();
                black_box(rigid);
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(30);
    targets = bench_virtual_markers, bench_center_of_mass, bench_rigid_bones
);
criterion_main!(benches);
