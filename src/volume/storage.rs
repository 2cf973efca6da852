//! Volume serialization and storage
//!
//! Volumes are archived with rkyv and compressed with LZ4. The payload is
//! stored as raw native-endian bytes, tagged with the voxel type.

use rkyv::{Archive, Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::core::types::Vec3;
use crate::volume::Volume;

/// Current version of the volume file format
pub const VOLUME_DATA_VERSION: u32 = 1;

/// File extension for stored volumes
pub const VOLUME_FILE_EXTENSION: &str = "skv";

/// Voxel type of a stored payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum VoxelKind {
    U8 = 0,
    U16 = 1,
}

impl VoxelKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(VoxelKind::U8),
            1 => Some(VoxelKind::U16),
            _ => None,
        }
    }
}

/// Serializable volume with metadata
#[derive(Archive, Deserialize, Serialize)]
pub struct VolumeData {
    /// Format version for compatibility
    pub version: u32,
    /// Voxel type (stored as u8 for rkyv compatibility)
    pub kind: u8,
    /// Grid dimensions
    pub dims: [u32; 3],
    /// Physical size of one voxel
    pub voxel_size: [f32; 3],
    /// Raw payload
    pub bytes: Vec<u8>,
}

impl VolumeData {
    pub fn from_u8(volume: &Volume<u8>) -> Self {
        Self::with_payload(VoxelKind::U8, volume.dims(), volume.voxel_size(), volume.data().to_vec())
    }

    pub fn from_u16(volume: &Volume<u16>) -> Self {
        let bytes = bytemuck::cast_slice::<u16, u8>(volume.data()).to_vec();
        Self::with_payload(VoxelKind::U16, volume.dims(), volume.voxel_size(), bytes)
    }

    fn with_payload(kind: VoxelKind, dims: [usize; 3], voxel_size: Vec3, bytes: Vec<u8>) -> Self {
        Self {
            version: VOLUME_DATA_VERSION,
            kind: kind as u8,
            dims: [dims[0] as u32, dims[1] as u32, dims[2] as u32],
            voxel_size: voxel_size.to_array(),
            bytes,
        }
    }

    /// Get the voxel type
    pub fn kind(&self) -> Option<VoxelKind> {
        VoxelKind::from_tag(self.kind)
    }

    fn dims_usize(&self) -> [usize; 3] {
        [self.dims[0] as usize, self.dims[1] as usize, self.dims[2] as usize]
    }

    /// Decode a `u8` volume
    pub fn to_u8(&self) -> Result<Volume<u8>, io::Error> {
        if self.kind() != Some(VoxelKind::U8) {
            return Err(invalid(format!("expected u8 payload, found kind tag {}", self.kind)));
        }
        Volume::from_vec(self.dims_usize(), self.bytes.clone())
            .map(|v| v.with_voxel_size(Vec3::from_array(self.voxel_size)))
            .map_err(|e| invalid(e.to_string()))
    }

    /// Decode a `u16` volume; a `u8` payload is widened
    pub fn to_u16(&self) -> Result<Volume<u16>, io::Error> {
        let values: Vec<u16> = match self.kind() {
            Some(VoxelKind::U16) => {
                if self.bytes.len() % 2 != 0 {
                    return Err(invalid("odd payload length for u16 volume".to_string()));
                }
                bytemuck::pod_collect_to_vec::<u8, u16>(&self.bytes)
            }
            Some(VoxelKind::U8) => self.bytes.iter().map(|&b| b as u16).collect(),
            None => return Err(invalid(format!("unknown kind tag {}", self.kind))),
        };
        Volume::from_vec(self.dims_usize(), values)
            .map(|v| v.with_voxel_size(Vec3::from_array(self.voxel_size)))
            .map_err(|e| invalid(e.to_string()))
    }

    /// Serialize to compressed bytes (rkyv + LZ4)
    pub fn to_bytes(&self) -> Result<Vec<u8>, io::Error> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(lz4_flex::compress_prepend_size(&bytes))
    }

    /// Deserialize from compressed bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, io::Error> {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|e| invalid(format!("LZ4 decompression failed: {}", e)))?;

        let archived = rkyv::access::<ArchivedVolumeData, rkyv::rancor::Error>(&decompressed)
            .map_err(|e| invalid(e.to_string()))?;

        let volume_data: VolumeData = rkyv::deserialize::<VolumeData, rkyv::rancor::Error>(archived)
            .map_err(|e| invalid(e.to_string()))?;

        if volume_data.version != VOLUME_DATA_VERSION {
            return Err(invalid(format!(
                "Volume data version mismatch: expected {}, got {}",
                VOLUME_DATA_VERSION, volume_data.version
            )));
        }

        Ok(volume_data)
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<(), io::Error> {
        let bytes = self.to_bytes()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, bytes)
    }

    /// Load from file
    pub fn load(path: &Path) -> Result<Self, io::Error> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_u16_volume_file_roundtrip() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("dist").with_extension(VOLUME_FILE_EXTENSION);

        let values: Vec<u16> = (0..60).map(|i| i * 1000).collect();
        let vol = Volume::from_vec([5, 4, 3], values)
            .unwrap()
            .with_voxel_size(Vec3::new(0.5, 0.5, 1.5));

        VolumeData::from_u16(&vol).save(&path).unwrap();
        let loaded = VolumeData::load(&path).unwrap();

        assert_eq!(loaded.kind(), Some(VoxelKind::U16));
        assert_eq!(loaded.to_u16().unwrap(), vol);
        assert!(loaded.to_u8().is_err());
    }

    #[test]
    fn test_u8_payload_widens() {
        let vol = Volume::from_vec([2, 2, 1], vec![0u8, 150, 255, 1]).unwrap();
        let data = VolumeData::from_bytes(&VolumeData::from_u8(&vol).to_bytes().unwrap()).unwrap();
        assert_eq!(data.to_u8().unwrap(), vol);
        assert_eq!(data.to_u16().unwrap().data(), &[0, 150, 255, 1]);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(VolumeData::from_bytes(&[1, 2, 3]).is_err());
    }
}
