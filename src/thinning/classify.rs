//! Voxel classification values, thresholding and final binarization

use rayon::prelude::*;

use crate::thinning::config::ChangeDirection;
use crate::volume::Volume;

/// Classification of a voxel during thinning, stored as its `u8` value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VoxelState {
    Background = 0,
    /// Marked during the current direction sweep, committed at its end
    ToBeChanged = 100,
    CanBeChanged = 150,
    /// Frozen during the current direction sweep, committed to foreground
    EndPoint = 200,
    /// Protected foreground; committed voxels share this value
    Anchor = 255,
}

/// Value of committed foreground voxels
pub const FOREGROUND: u8 = VoxelState::Anchor as u8;

impl VoxelState {
    #[inline]
    pub const fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(v: u8) -> Option<Self> {
        match v {
            0 => Some(VoxelState::Background),
            100 => Some(VoxelState::ToBeChanged),
            150 => Some(VoxelState::CanBeChanged),
            200 => Some(VoxelState::EndPoint),
            255 => Some(VoxelState::Anchor),
            _ => None,
        }
    }

    /// Counted as a live point by the curve end conditions
    #[inline]
    pub fn is_live(v: u8) -> bool {
        v == VoxelState::CanBeChanged as u8 || v == VoxelState::EndPoint as u8 || v == FOREGROUND
    }
}

/// Map a grey-level volume to the 3-value classification.
///
/// Values below `low` are background, values in `[low, high)` may be
/// changed, values at or above `high` are anchors. When `high <= low` no
/// anchors are produced.
pub fn threshold<T>(grey: &Volume<T>, low: f32, high: f32) -> Volume<u8>
where
    T: Copy + Send + Sync + Into<f64>,
{
    let lo = low.round() as f64;
    let hi = high.round() as f64;
    let anchors = lo < hi;
    grey.map(move |v| {
        let v: f64 = v.into();
        if v < lo {
            VoxelState::Background as u8
        } else if !anchors || v < hi {
            VoxelState::CanBeChanged as u8
        } else {
            VoxelState::Anchor as u8
        }
    })
}

/// Merge an anchor mask (value > 0) into a classification volume
pub fn apply_anchors(classification: &mut Volume<u8>, anchors: &Volume<u8>) {
    classification
        .data_mut()
        .par_iter_mut()
        .zip(anchors.data().par_iter())
        .for_each(|(c, &a)| {
            if a > 0 && *c != VoxelState::Background as u8 {
                *c = VoxelState::Anchor as u8;
            }
        });
}

/// Final binarization after a thinning or thickening run
pub fn binarize(volume: &mut Volume<u8>, change: ChangeDirection) {
    volume.data_mut().par_iter_mut().for_each(|v| {
        *v = match change {
            ChangeDirection::ForegroundToBackground => if *v > 0 { FOREGROUND } else { 0 },
            ChangeDirection::BackgroundToForeground => if *v < FOREGROUND { 0 } else { FOREGROUND },
        };
    });
}
