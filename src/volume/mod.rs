//! Dense voxel volumes
//!
//! A [`Volume`] stores one value per voxel in x-fastest order, together with
//! the physical voxel size. Planar images are volumes with `dims[2] == 1`.

pub mod storage;
pub mod slice;

use rayon::prelude::*;

use crate::core::error::Error;
use crate::core::types::{try_reserve, Result, Vec3};

/// Dense 3D grid of voxel values
#[derive(Clone, Debug, PartialEq)]
pub struct Volume<T> {
    dims: [usize; 3],
    voxel_size: Vec3,
    data: Vec<T>,
}

impl<T: Copy> Volume<T> {
    /// Create a volume filled with `value`, failing cleanly if the buffer
    /// cannot be allocated.
    pub fn new(dims: [usize; 3], value: T) -> Result<Self> {
        let len = voxel_count(dims)?;
        let mut data = Vec::new();
        try_reserve(&mut data, len, "volume buffer")?;
        data.resize(len, value);
        Ok(Self { dims, voxel_size: Vec3::ONE, data })
    }

    /// Wrap an existing buffer
    pub fn from_vec(dims: [usize; 3], data: Vec<T>) -> Result<Self> {
        let len = voxel_count(dims)?;
        if data.len() != len {
            return Err(Error::InvalidConfig(format!(
                "buffer holds {} values, dims {:?} need {}",
                data.len(),
                dims,
                len
            )));
        }
        Ok(Self { dims, voxel_size: Vec3::ONE, data })
    }

    /// Builder-style voxel size setter
    pub fn with_voxel_size(mut self, voxel_size: Vec3) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn voxel_size(&self) -> Vec3 {
        self.voxel_size
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True for single-slice images, which use 2D connectivity
    pub fn is_planar(&self) -> bool {
        self.dims[2] == 1
    }

    /// Number of voxels in one z slice
    pub fn slice_len(&self) -> usize {
        self.dims[0] * self.dims[1]
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.dims[1] + y) * self.dims[0] + x
    }

    #[inline]
    pub fn coords(&self, index: usize) -> [usize; 3] {
        let x = index % self.dims[0];
        let y = (index / self.dims[0]) % self.dims[1];
        let z = index / self.slice_len();
        [x, y, z]
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> T {
        self.data[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: T) {
        let i = self.index(x, y, z);
        self.data[i] = value;
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Check that `other` has the same shape
    pub fn ensure_same_dims<U>(&self, other: &Volume<U>) -> Result<()> {
        if self.dims != other.dims {
            return Err(Error::ShapeMismatch { expected: self.dims, got: other.dims });
        }
        Ok(())
    }
}

impl<T: Copy + Send + Sync> Volume<T> {
    /// Per-voxel conversion, computed in parallel
    pub fn map<U, F>(&self, f: F) -> Volume<U>
    where
        U: Copy + Send,
        F: Fn(T) -> U + Sync + Send,
    {
        Volume {
            dims: self.dims,
            voxel_size: self.voxel_size,
            data: self.data.par_iter().map(|&v| f(v)).collect(),
        }
    }
}

fn voxel_count(dims: [usize; 3]) -> Result<usize> {
    if dims.iter().any(|&d| d == 0) {
        return Err(Error::InvalidConfig(format!("empty volume dims {:?}", dims)));
    }
    dims[0]
        .checked_mul(dims[1])
        .and_then(|n| n.checked_mul(dims[2]))
        .ok_or(Error::Allocation { what: "volume buffer", requested: usize::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        let vol = Volume::new([4, 3, 2], 0u8).unwrap();
        assert_eq!(vol.len(), 24);
        for i in 0..vol.len() {
            let [x, y, z] = vol.coords(i);
            assert_eq!(vol.index(x, y, z), i);
        }
    }

    #[test]
    fn test_planar_flag() {
        let mut vol = Volume::new([2, 2, 1], 0u8).unwrap();
        vol.set(1, 1, 0, 7);
        assert_eq!(vol.get(1, 1, 0), 7);
        assert!(vol.is_planar());
        assert!(!Volume::new([2, 2, 2], 0u8).unwrap().is_planar());
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Volume::from_vec([2, 2, 2], vec![0u8; 7]).is_err());
        assert!(Volume::from_vec([2, 2, 2], vec![0u8; 8]).is_ok());
        assert!(Volume::new([0, 2, 2], 0u8).is_err());
    }

    #[test]
    fn test_map_keeps_shape() {
        let vol = Volume::new([3, 3, 3], 2u8).unwrap().with_voxel_size(Vec3::new(0.5, 0.5, 2.0));
        let doubled = vol.map(|v| v as u16 * 2);
        assert_eq!(doubled.dims(), [3, 3, 3]);
        assert_eq!(doubled.voxel_size(), Vec3::new(0.5, 0.5, 2.0));
        assert!(doubled.data().iter().all(|&v| v == 4));
    }
}
