//! Neighbor offsets and 3x3x3 neighborhood extraction
//!
//! Cells of an extracted neighborhood are indexed
//! `(dz+1)*9 + (dy+1)*3 + (dx+1)`:
//!
//! ```text
//!  0  1  2     9 10 11    18 19 20
//!  3  4  5    12 13 14    21 22 23
//!  6  7  8    15 16 17    24 25 26
//!   z-1          z           z+1
//! ```
//!
//! Planar volumes only populate the middle plane (cells 9..18).

use serde::{Deserialize, Serialize};

use crate::volume::Volume;

/// Number of cells in an extracted neighborhood
pub const NEIGHBORHOOD_SIZE: usize = 27;

/// Index of the center cell
pub const CENTER: usize = 13;

/// Extracted 3x3x3 neighborhood values
pub type Neighborhood = [u8; NEIGHBORHOOD_SIZE];

/// Cell index of a `(dx, dy, dz)` offset
#[inline]
pub const fn cell(dx: i64, dy: i64, dz: i64) -> usize {
    ((dz + 1) * 9 + (dy + 1) * 3 + (dx + 1)) as usize
}

/// Digital connectivity, also used as the thickness mode of the thinning
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connectivity {
    #[serde(rename = "4")]
    C4,
    #[serde(rename = "6")]
    C6,
    #[serde(rename = "8")]
    C8,
    #[serde(rename = "18")]
    C18,
    #[serde(rename = "26")]
    C26,
}

impl Connectivity {
    /// Number of neighbors of a voxel under this connectivity
    pub fn neighbor_count(self) -> usize {
        match self {
            Connectivity::C4 => 4,
            Connectivity::C6 => 6,
            Connectivity::C8 => 8,
            Connectivity::C18 => 18,
            Connectivity::C26 => 26,
        }
    }

    /// Closest connectivity available in a planar image
    pub fn planar(self) -> Self {
        match self {
            Connectivity::C4 | Connectivity::C6 => Connectivity::C4,
            _ => Connectivity::C8,
        }
    }

    /// The full connectivity used for foreground in planar or 3D volumes
    pub fn full(planar: bool) -> Self {
        if planar { Connectivity::C8 } else { Connectivity::C26 }
    }
}

/// Offset of one neighbor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NeighborOffset {
    pub delta: [i64; 3],
    /// Linear offset in a volume of the shape the table was built for
    pub stride: isize,
}

/// Neighbor offsets for a connectivity and a volume shape
///
/// Ordering: the four in-plane face neighbors, then the two z face neighbors,
/// then in-plane diagonals, then the remaining 18- and 26-neighbors.
#[derive(Clone, Debug)]
pub struct Neighbors {
    dims: [usize; 3],
    offsets: Vec<NeighborOffset>,
}

impl Neighbors {
    pub fn new(connectivity: Connectivity, dims: [usize; 3]) -> Self {
        let connectivity = if dims[2] == 1 { connectivity.planar() } else { connectivity };

        let mut deltas: Vec<[i64; 3]> = vec![[0, -1, 0], [-1, 0, 0], [1, 0, 0], [0, 1, 0]];
        let with_z = matches!(connectivity, Connectivity::C6 | Connectivity::C18 | Connectivity::C26);
        if with_z {
            deltas.extend([[0, 0, -1], [0, 0, 1]]);
        }
        if !matches!(connectivity, Connectivity::C4 | Connectivity::C6) {
            deltas.extend([[-1, -1, 0], [1, -1, 0], [-1, 1, 0], [1, 1, 0]]);
        }
        if matches!(connectivity, Connectivity::C18 | Connectivity::C26) {
            for dz in [-1, 1] {
                deltas.extend([[0, -1, dz], [-1, 0, dz], [1, 0, dz], [0, 1, dz]]);
            }
        }
        if connectivity == Connectivity::C26 {
            for dz in [-1, 1] {
                deltas.extend([[-1, -1, dz], [1, -1, dz], [-1, 1, dz], [1, 1, dz]]);
            }
        }

        debug_assert_eq!(deltas.len(), connectivity.neighbor_count());

        let sx = 1isize;
        let sy = dims[0] as isize;
        let sz = (dims[0] * dims[1]) as isize;
        let offsets = deltas
            .into_iter()
            .map(|d| NeighborOffset {
                delta: d,
                stride: d[0] as isize * sx + d[1] as isize * sy + d[2] as isize * sz,
            })
            .collect();

        Self { dims, offsets }
    }

    pub fn offsets(&self) -> &[NeighborOffset] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Call `f` with the linear index of every in-volume neighbor of `p`
    #[inline]
    pub fn for_each(&self, p: [usize; 3], mut f: impl FnMut(usize)) {
        let index = (p[2] * self.dims[1] + p[1]) * self.dims[0] + p[0];
        let planar = self.dims[2] == 1;
        let interior = (0..3).all(|a| (a == 2 && planar) || (p[a] > 0 && p[a] + 1 < self.dims[a]));
        for o in &self.offsets {
            if interior {
                f((index as isize + o.stride) as usize);
                continue;
            }
            let mut inside = true;
            for a in 0..3 {
                let c = p[a] as i64 + o.delta[a];
                if c < 0 || c >= self.dims[a] as i64 {
                    inside = false;
                    break;
                }
            }
            if inside {
                f((index as isize + o.stride) as usize);
            }
        }
    }
}

/// Extracts 3x3x3 neighborhoods, with a fast path away from the border
#[derive(Clone, Debug)]
pub struct NeighborhoodExtractor {
    dims: [usize; 3],
    planar: bool,
    strides: [isize; NEIGHBORHOOD_SIZE],
}

impl NeighborhoodExtractor {
    pub fn new(dims: [usize; 3]) -> Self {
        let sy = dims[0] as isize;
        let sz = (dims[0] * dims[1]) as isize;
        let mut strides = [0isize; NEIGHBORHOOD_SIZE];
        for dz in -1..=1i64 {
            for dy in -1..=1i64 {
                for dx in -1..=1i64 {
                    strides[cell(dx, dy, dz)] = dx as isize + dy as isize * sy + dz as isize * sz;
                }
            }
        }
        Self { dims, planar: dims[2] == 1, strides }
    }

    pub fn is_planar(&self) -> bool {
        self.planar
    }

    /// True when the full neighborhood of `p` lies inside the volume
    pub fn is_inside(&self, p: [usize; 3]) -> bool {
        let xy = p[0] > 0 && p[0] + 1 < self.dims[0] && p[1] > 0 && p[1] + 1 < self.dims[1];
        if self.planar {
            xy
        } else {
            xy && p[2] > 0 && p[2] + 1 < self.dims[2]
        }
    }

    /// Neighborhood of the voxel at `p`; cells outside the volume read 0
    pub fn extract(&self, data: &[u8], p: [usize; 3], inside: bool) -> Neighborhood {
        let mut n = [0u8; NEIGHBORHOOD_SIZE];
        let index = ((p[2] * self.dims[1] + p[1]) * self.dims[0] + p[0]) as isize;
        let planes = if self.planar { 0..=0 } else { -1..=1 };

        if inside {
            for dz in planes {
                let base = ((dz + 1) * 9) as usize;
                for c in base..base + 9 {
                    n[c] = data[(index + self.strides[c]) as usize];
                }
            }
            return n;
        }

        for dz in planes {
            let z = p[2] as i64 + dz;
            if z < 0 || z >= self.dims[2] as i64 {
                continue;
            }
            for dy in -1..=1i64 {
                let y = p[1] as i64 + dy;
                if y < 0 || y >= self.dims[1] as i64 {
                    continue;
                }
                for dx in -1..=1i64 {
                    let x = p[0] as i64 + dx;
                    if x < 0 || x >= self.dims[0] as i64 {
                        continue;
                    }
                    let c = cell(dx, dy, dz);
                    n[c] = data[(index + self.strides[c]) as usize];
                }
            }
        }
        n
    }
}

/// Extract the neighborhood of one voxel of `volume`
pub fn extract_neighborhood(volume: &Volume<u8>, p: [usize; 3]) -> Neighborhood {
    let extractor = NeighborhoodExtractor::new(volume.dims());
    extractor.extract(volume.data(), p, extractor.is_inside(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_counts() {
        let dims = [5, 5, 5];
        assert_eq!(Neighbors::new(Connectivity::C6, dims).len(), 6);
        assert_eq!(Neighbors::new(Connectivity::C18, dims).len(), 18);
        assert_eq!(Neighbors::new(Connectivity::C26, dims).len(), 26);
        assert_eq!(Neighbors::new(Connectivity::C26, [5, 5, 1]).len(), 8);
        assert_eq!(Neighbors::new(Connectivity::C6, [5, 5, 1]).len(), 4);
        for c in [Connectivity::C4, Connectivity::C6, Connectivity::C8, Connectivity::C18, Connectivity::C26] {
            assert_eq!(Neighbors::new(c, dims).len(), c.neighbor_count());
        }
    }

    #[test]
    fn test_face_neighbors_first() {
        let n = Neighbors::new(Connectivity::C26, [4, 4, 4]);
        let first: Vec<[i64; 3]> = n.offsets()[..6].iter().map(|o| o.delta).collect();
        assert_eq!(first, vec![[0, -1, 0], [-1, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, -1], [0, 0, 1]]);
        assert_eq!(n.offsets()[4].stride, -16);
    }

    #[test]
    fn test_for_each_clips_border() {
        let n = Neighbors::new(Connectivity::C26, [3, 3, 3]);
        let mut corner = 0;
        n.for_each([0, 0, 0], |_| corner += 1);
        assert_eq!(corner, 7);
        let mut center = 0;
        n.for_each([1, 1, 1], |_| center += 1);
        assert_eq!(center, 26);
    }

    #[test]
    fn test_extract_border_reads_zero() {
        let mut vol = Volume::new([3, 3, 3], 1u8).unwrap();
        vol.set(1, 1, 1, 9);
        let inner = extract_neighborhood(&vol, [1, 1, 1]);
        assert_eq!(inner[CENTER], 9);
        assert!(inner.iter().enumerate().all(|(i, &v)| i == CENTER || v == 1));

        let corner = extract_neighborhood(&vol, [0, 0, 0]);
        assert_eq!(corner.iter().filter(|&&v| v > 0).count(), 8);
        assert_eq!(corner[cell(-1, -1, -1)], 0);
        assert_eq!(corner[cell(1, 1, 1)], 9);
    }

    #[test]
    fn test_extract_planar_uses_middle_plane() {
        let vol = Volume::new([3, 3, 1], 5u8).unwrap();
        let n = extract_neighborhood(&vol, [1, 1, 0]);
        assert!(n[..9].iter().all(|&v| v == 0));
        assert!(n[9..18].iter().all(|&v| v == 5));
        assert!(n[18..].iter().all(|&v| v == 0));
    }
}
