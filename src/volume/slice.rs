//! PNG dumps of single z slices, for eyeballing intermediate results

use std::io;
use std::path::Path;

use image::ImageEncoder;

use crate::volume::Volume;

/// Encode slice `z` of an 8-bit volume as a grayscale PNG
pub fn encode_slice_png(volume: &Volume<u8>, z: usize) -> Result<Vec<u8>, io::Error> {
    let [w, h, d] = volume.dims();
    if z >= d {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("slice {} outside volume depth {}", z, d),
        ));
    }
    let start = z * volume.slice_len();
    let pixels = &volume.data()[start..start + volume.slice_len()];

    let mut png_data = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_data)
        .write_image(pixels, w as u32, h as u32, image::ExtendedColorType::L8)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    Ok(png_data)
}

/// Write slice `z` as a PNG file
pub fn save_slice_png(volume: &Volume<u8>, z: usize, path: &Path) -> Result<(), io::Error> {
    let png = encode_slice_png(volume, z)?;
    std::fs::write(path, png)
}

/// Stretch arbitrary labels to the visible 8-bit range (0 stays 0)
pub fn labels_to_gray(labels: &Volume<u32>) -> Volume<u8> {
    let max = labels.data().iter().copied().max().unwrap_or(0).max(1);
    labels.map(|v| {
        if v == 0 {
            0
        } else {
            (55 + (v as u64 * 200 / max as u64)) as u8
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_signature() {
        let vol = Volume::new([8, 4, 2], 255u8).unwrap();
        let png = encode_slice_png(&vol, 1).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert!(encode_slice_png(&vol, 2).is_err());
    }

    #[test]
    fn test_labels_to_gray() {
        let labels = Volume::from_vec([3, 1, 1], vec![0u32, 1, 4]).unwrap();
        let gray = labels_to_gray(&labels);
        assert_eq!(gray.data()[0], 0);
        assert!(gray.data()[1] > 0);
        assert_eq!(gray.data()[2], 255);
    }
}
