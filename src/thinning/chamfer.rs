//! Chamfer distance maps and the chamfer-driven thinning entry point

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::logging::elapsed_ms;
use crate::core::types::Result;
use crate::thinning::config::ThinningConfig;
use crate::thinning::scheduler::{thin, ThinningReport};
use crate::volume::Volume;

/// Chamfer mask size
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChamferMask {
    /// 3x3x3 mask, weights 3/4/5
    #[default]
    Mask3,
    /// 5x5x5 mask, weights 7/10/12/16/17/21
    Mask5,
}

impl ChamferMask {
    /// Weight of the unit step, used to normalize distances
    fn unit(self) -> u32 {
        match self {
            ChamferMask::Mask3 => 3,
            ChamferMask::Mask5 => 7,
        }
    }

    /// Weight of an offset, `None` when the mask does not use it
    fn weight(self, d: [i64; 3]) -> Option<u32> {
        let mut a = [d[0].unsigned_abs(), d[1].unsigned_abs(), d[2].unsigned_abs()];
        a.sort_unstable_by(|x, y| y.cmp(x));
        match (self, a) {
            (ChamferMask::Mask3, [1, 0, 0]) => Some(3),
            (ChamferMask::Mask3, [1, 1, 0]) => Some(4),
            (ChamferMask::Mask3, [1, 1, 1]) => Some(5),
            (ChamferMask::Mask5, [1, 0, 0]) => Some(7),
            (ChamferMask::Mask5, [1, 1, 0]) => Some(10),
            (ChamferMask::Mask5, [1, 1, 1]) => Some(12),
            (ChamferMask::Mask5, [2, 1, 0]) => Some(16),
            (ChamferMask::Mask5, [2, 1, 1]) => Some(17),
            (ChamferMask::Mask5, [2, 2, 1]) => Some(21),
            _ => None,
        }
    }

    fn radius(self) -> i64 {
        match self {
            ChamferMask::Mask3 => 1,
            ChamferMask::Mask5 => 2,
        }
    }

    /// Offsets preceding the center in raster order, with their weights
    fn forward_half(self, planar: bool) -> Vec<([i64; 3], u32)> {
        let r = self.radius();
        let zr = if planar { 0 } else { r };
        let mut half = Vec::new();
        for dz in -zr..=0 {
            for dy in -r..=r {
                for dx in -r..=r {
                    let before = dz < 0 || (dz == 0 && (dy < 0 || (dy == 0 && dx < 0)));
                    if !before {
                        continue;
                    }
                    if let Some(w) = self.weight([dx, dy, dz]) {
                        half.push(([dx, dy, dz], w));
                    }
                }
            }
        }
        half
    }
}

const UNREACHED: u32 = u32::MAX / 2;

/// Normalized chamfer distance from every foreground voxel (value > 0) to
/// the nearest background voxel. Background voxels get 0.
pub fn chamfer_distance(volume: &Volume<u8>, mask: ChamferMask) -> Result<Volume<u16>> {
    let start = Instant::now();
    let dims = volume.dims();
    let mut dist: Vec<u32> = volume
        .data()
        .par_iter()
        .map(|&v| if v > 0 { UNREACHED } else { 0 })
        .collect();

    let forward = mask.forward_half(volume.is_planar());
    let backward: Vec<([i64; 3], u32)> =
        forward.iter().map(|&(d, w)| ([-d[0], -d[1], -d[2]], w)).collect();

    let sweep = |dist: &mut Vec<u32>, offsets: &[([i64; 3], u32)], index: usize| {
        if dist[index] == 0 {
            return;
        }
        let [x, y, z] = volume.coords(index);
        let mut best = dist[index];
        for &(d, w) in offsets {
            let (nx, ny, nz) = (x as i64 + d[0], y as i64 + d[1], z as i64 + d[2]);
            if nx < 0 || ny < 0 || nz < 0 {
                continue;
            }
            let (nx, ny, nz) = (nx as usize, ny as usize, nz as usize);
            if nx >= dims[0] || ny >= dims[1] || nz >= dims[2] {
                continue;
            }
            let candidate = dist[volume.index(nx, ny, nz)].saturating_add(w);
            if candidate < best {
                best = candidate;
            }
        }
        dist[index] = best;
    };

    for index in 0..dist.len() {
        sweep(&mut dist, &forward, index);
    }
    for index in (0..dist.len()).rev() {
        sweep(&mut dist, &backward, index);
    }

    let unit = mask.unit();
    let normalized: Vec<u16> = dist
        .par_iter()
        .map(|&d| ((d.saturating_add(unit / 2)) / unit).min(u16::MAX as u32) as u16)
        .collect();

    log::debug!("Chamfer {:?} distance computed in {:.1}ms", mask, elapsed_ms(start));

    Ok(Volume::from_vec(dims, normalized)?.with_voxel_size(volume.voxel_size()))
}

/// Thin `volume` using its own chamfer distance map as priority
pub fn thin_with_chamfer(
    volume: &mut Volume<u8>,
    mask: ChamferMask,
    config: &ThinningConfig,
) -> Result<ThinningReport> {
    let distance = chamfer_distance(volume, mask)?;
    thin(volume, &distance, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_sizes() {
        assert_eq!(ChamferMask::Mask3.forward_half(false).len(), 13);
        assert_eq!(ChamferMask::Mask3.forward_half(true).len(), 4);
        // 5x5x5 keeps 98 of the 124 offsets, half of them forward
        assert_eq!(ChamferMask::Mask5.forward_half(false).len(), 49);
    }

    #[test]
    fn test_distance_along_a_bar() {
        let mut vol = Volume::new([9, 3, 3], 0u8).unwrap();
        for x in 1..8 {
            vol.set(x, 1, 1, 255);
        }
        let d = chamfer_distance(&vol, ChamferMask::Mask3).unwrap();
        assert_eq!(d.get(0, 1, 1), 0);
        // the bar is one voxel thick: every voxel touches background
        for x in 1..8 {
            assert_eq!(d.get(x, 1, 1), 1);
        }
    }

    #[test]
    fn test_distance_grows_inward() {
        let mut vol = Volume::new([11, 11, 11], 0u8).unwrap();
        for z in 1..10 {
            for y in 1..10 {
                for x in 1..10 {
                    vol.set(x, y, z, 255);
                }
            }
        }
        for mask in [ChamferMask::Mask3, ChamferMask::Mask5] {
            let d = chamfer_distance(&vol, mask).unwrap();
            assert_eq!(d.get(1, 5, 5), 1);
            assert_eq!(d.get(2, 5, 5), 2);
            assert_eq!(d.get(5, 5, 5), 5);
        }
    }

    #[test]
    fn test_chamfer_thinning_keeps_component() {
        let mut vol = Volume::new([15, 7, 7], 0u8).unwrap();
        for z in 2..5 {
            for y in 2..5 {
                for x in 1..14 {
                    vol.set(x, y, z, 150);
                }
            }
        }
        vol.set(1, 3, 3, 255);
        vol.set(13, 3, 3, 255);
        let report = thin_with_chamfer(&mut vol, ChamferMask::Mask3, &ThinningConfig::curve()).unwrap();
        assert!(report.removed > 0);
        assert_eq!(vol.get(1, 3, 3), 255);
        assert_eq!(vol.get(13, 3, 3), 255);
        let left: usize = vol.data().iter().filter(|&&v| v > 0).count();
        assert!(left >= 13 && left < 3 * 3 * 13);
    }
}
