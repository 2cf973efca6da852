//! Neighbor counting and per-family connected-component labeling

use rayon::prelude::*;

use crate::core::types::{try_reserve, Result};
use crate::topology::{Connectivity, Neighbors};
use crate::volume::Volume;

/// Number of foreground neighbors of each foreground voxel (26 in 3D, 8 in
/// 2D); background voxels get 0. Slices are counted in parallel.
pub fn count_live_neighbors(volume: &Volume<u8>) -> Volume<u8> {
    let neighbors = Neighbors::new(Connectivity::full(volume.is_planar()), volume.dims());
    let slice_len = volume.slice_len();
    let data = volume.data();

    let mut counts = volume.map(|_| 0u8);
    counts
        .data_mut()
        .par_chunks_mut(slice_len)
        .enumerate()
        .for_each(|(z, slice)| {
            for (offset, count) in slice.iter_mut().enumerate() {
                let index = z * slice_len + offset;
                if data[index] == 0 {
                    continue;
                }
                let mut n = 0u8;
                neighbors.for_each(volume.coords(index), |j| {
                    if data[j] > 0 {
                        n += 1;
                    }
                });
                *count = n;
            }
        });
    counts
}

/// Label the connected components of the voxels selected by `member`,
/// numbering them from `first_label` in scan order.
///
/// `labels` must be zero on every selected voxel. Returns the size of each
/// component, in label order.
pub fn label_family<F>(
    volume: &Volume<u8>,
    labels: &mut [u32],
    first_label: u32,
    member: F,
) -> Result<Vec<usize>>
where
    F: Fn(usize) -> bool,
{
    let neighbors = Neighbors::new(Connectivity::full(volume.is_planar()), volume.dims());
    let mut sizes = Vec::new();
    let mut stack = Vec::new();

    for seed in 0..volume.len() {
        if labels[seed] != 0 || !member(seed) {
            continue;
        }
        let label = first_label + sizes.len() as u32;
        labels[seed] = label;
        stack.push(seed);
        let mut size = 0usize;

        while let Some(i) = stack.pop() {
            size += 1;
            try_reserve(&mut stack, neighbors.len(), "labeling stack")?;
            neighbors.for_each(volume.coords(i), |j| {
                if labels[j] == 0 && member(j) {
                    labels[j] = label;
                    stack.push(j);
                }
            });
        }

        try_reserve(&mut sizes, 1, "component sizes")?;
        sizes.push(size);
        log::trace!("component {}: {} voxels", label, size);
    }
    Ok(sizes)
}
