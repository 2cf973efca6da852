//! Topological numbers (Bertrand & Malandain)
//!
//! In 3D with (26, 6) connectivity:
//! - `T26` counts the 26-connected foreground components of `N26*`,
//! - `T6` counts the 6-connected background components of `N18*` that are
//!   6-adjacent to the center.
//!
//! In 2D with (8, 4) connectivity, `T8` and `T4` are defined the same way on
//! the 3x3 square. Cell sets are handled as bit masks over the 27 cells.

use crate::topology::neighborhood::{CENTER, Neighborhood};

/// Adjacency masks of the 3x3x3 block. `max_sum` bounds the Manhattan
/// length of the offset between two cells (1: faces, 3: full).
const fn block_adjacency(max_sum: i32) -> [u32; 27] {
    let mut masks = [0u32; 27];
    let mut i = 0;
    while i < 27 {
        let (xi, yi, zi) = ((i % 3) as i32, ((i / 3) % 3) as i32, (i / 9) as i32);
        let mut j = 0;
        while j < 27 {
            let (xj, yj, zj) = ((j % 3) as i32, ((j / 3) % 3) as i32, (j / 9) as i32);
            let dx = if xi > xj { xi - xj } else { xj - xi };
            let dy = if yi > yj { yi - yj } else { yj - yi };
            let dz = if zi > zj { zi - zj } else { zj - zi };
            if i != j && dx <= 1 && dy <= 1 && dz <= 1 && dx + dy + dz <= max_sum {
                masks[i] |= 1 << j;
            }
            j += 1;
        }
        i += 1;
    }
    masks
}

/// Cells whose offset from the center has Manhattan length in `1..=max_sum`
const fn ring(max_sum: i32, planar: bool) -> u32 {
    let mut mask = 0u32;
    let mut i = 0;
    while i < 27 {
        let (x, y, z) = ((i % 3) as i32 - 1, ((i / 3) % 3) as i32 - 1, (i / 9) as i32 - 1);
        let sum = (if x < 0 { -x } else { x }) + (if y < 0 { -y } else { y }) + (if z < 0 { -z } else { z });
        if sum >= 1 && sum <= max_sum && (!planar || z == 0) {
            mask |= 1 << i;
        }
        i += 1;
    }
    mask
}

const ADJ26: [u32; 27] = block_adjacency(3);
const ADJ6: [u32; 27] = block_adjacency(1);

const N6: u32 = ring(1, false);
const N18: u32 = ring(2, false);
const N26: u32 = ring(3, false);

const N4_PLANAR: u32 = ring(1, true);
const N8_PLANAR: u32 = ring(2, true);

/// Number of connected components of `set` under the given adjacency,
/// counting only components that intersect `touching`.
fn count_components(set: u32, adjacency: &[u32; 27], touching: u32) -> u8 {
    let mut remaining = set;
    let mut count = 0;
    while remaining != 0 {
        let seed = remaining.trailing_zeros();
        let mut component = 1u32 << seed;
        let mut front = component;
        while front != 0 {
            let c = front.trailing_zeros() as usize;
            front &= front - 1;
            let grow = adjacency[c] & set & !component;
            component |= grow;
            front |= grow;
        }
        remaining &= !component;
        if component & touching != 0 {
            count += 1;
        }
    }
    count
}

/// Foreground bit mask of a neighborhood (value > 0)
#[inline]
pub fn foreground_mask(n: &Neighborhood) -> u32 {
    n.iter()
        .enumerate()
        .fold(0u32, |m, (i, &v)| if v > 0 { m | (1 << i) } else { m })
}

/// Pair of topological numbers: background (`T6`/`T4`) and foreground
/// (`T26`/`T8`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopologicalNumbers {
    pub background: u8,
    pub foreground: u8,
}

impl TopologicalNumbers {
    /// A point is simple when both numbers equal 1
    pub fn is_simple(self) -> bool {
        self.background == 1 && self.foreground == 1
    }
}

/// `T6` and `T26` of a 3D neighborhood
pub fn numbers_3d(n: &Neighborhood) -> TopologicalNumbers {
    let fg = foreground_mask(n) & !(1 << CENTER);
    let t26 = count_components(fg & N26, &ADJ26, N26);
    let bg = !fg & N18;
    let t6 = count_components(bg, &ADJ6, N6);
    TopologicalNumbers { background: t6, foreground: t26 }
}

/// `T4` and `T8` of a planar neighborhood (middle plane of the block)
pub fn numbers_2d(n: &Neighborhood) -> TopologicalNumbers {
    let fg = foreground_mask(n) & N8_PLANAR;
    let t8 = count_components(fg, &ADJ26, N8_PLANAR);
    let bg = !fg & N8_PLANAR;
    let t4 = count_components(bg, &ADJ6, N4_PLANAR);
    TopologicalNumbers { background: t4, foreground: t8 }
}

/// Topological numbers for a planar or 3D neighborhood
#[inline]
pub fn topological_numbers(n: &Neighborhood, planar: bool) -> TopologicalNumbers {
    if planar { numbers_2d(n) } else { numbers_3d(n) }
}
