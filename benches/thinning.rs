use criterion::{criterion_group, criterion_main, Criterion, black_box};

use skeletree::component::ComponentImage;
use skeletree::thinning::{chamfer_distance, thin, thin_with_chamfer, threshold, ChamferMask, ThinningConfig};
use skeletree::volume::Volume;
use skeletree::voxel_tree::VoxelTree;

/// Grey cylinder along x with a branch along y, radius `r`
fn create_test_branch(size: usize, r: f32) -> Volume<u16> {
    let mut grey = Volume::new([size, size, size], 0u16).expect("volume");
    let c = size as f32 / 2.0;
    for z in 0..size {
        for y in 0..size {
            for x in 0..size {
                let (fx, fy, fz) = (x as f32, y as f32, z as f32);
                let trunk = (fy - c).hypot(fz - c);
                let branch = (fx - c).hypot(fz - c);
                let in_trunk = trunk < r && x > 1 && x < size - 2;
                let in_branch = branch < r * 0.7 && fy > c && y < size - 2;
                if in_trunk || in_branch {
                    grey.set(x, y, z, 100);
                }
            }
        }
    }
    grey
}

fn bench_chamfer_32(c: &mut Criterion) {
    let classification = threshold(&create_test_branch(32, 6.0), 1.0, 0.0);

    c.bench_function("chamfer_mask3_32", |b| {
        b.iter(|| chamfer_distance(black_box(&classification), ChamferMask::Mask3));
    });
    c.bench_function("chamfer_mask5_32", |b| {
        b.iter(|| chamfer_distance(black_box(&classification), ChamferMask::Mask5));
    });
}

fn bench_thin_32(c: &mut Criterion) {
    let grey = create_test_branch(32, 6.0);
    let classification = threshold(&grey, 1.0, 0.0);
    let priority = chamfer_distance(&classification, ChamferMask::Mask3).expect("distance");
    let config = ThinningConfig::curve();

    c.bench_function("thin_curve_32", |b| {
        b.iter(|| {
            let mut volume = classification.clone();
            thin(black_box(&mut volume), &priority, &config)
        });
    });
}

fn bench_thin_64(c: &mut Criterion) {
    let classification = threshold(&create_test_branch(64, 12.0), 1.0, 0.0);
    let config = ThinningConfig::curve();

    let mut group = c.benchmark_group("thin_64");
    group.sample_size(10);
    group.bench_function("thin_with_chamfer_64", |b| {
        b.iter(|| {
            let mut volume = classification.clone();
            thin_with_chamfer(black_box(&mut volume), ChamferMask::Mask3, &config)
        });
    });
    group.finish();
}

fn bench_tree_build(c: &mut Criterion) {
    let mut skeleton = threshold(&create_test_branch(64, 12.0), 1.0, 0.0);
    thin_with_chamfer(&mut skeleton, ChamferMask::Mask3, &ThinningConfig::curve()).expect("thin");

    c.bench_function("component_image_64", |b| {
        b.iter(|| ComponentImage::<u32>::build(black_box(&skeleton)));
    });
    c.bench_function("voxel_tree_64", |b| {
        b.iter(|| VoxelTree::from_skeleton(black_box(&skeleton), None));
    });
}

criterion_group!(
    benches,
    bench_chamfer_32,
    bench_thin_32,
    bench_thin_64,
    bench_tree_build,
);
criterion_main!(benches);
