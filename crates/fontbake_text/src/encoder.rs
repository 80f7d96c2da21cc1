//! Atlas image output

use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::{FontError, Result};

/// Write an RGBA8 buffer as a PNG file
pub fn write_png(path: &Path, width: u32, height: u32, rgba: Vec<u8>) -> Result<()> {
    let image_error = |reason: String| FontError::Image {
        path: path.to_path_buf(),
        reason,
    };

    let expected = width as usize * height as usize * 4;
    let actual = rgba.len();
    let image = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        image_error(format!(
            "buffer holds {actual} bytes, {width}x{height} RGBA needs {expected}"
        ))
    })?;

    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| image_error(e.to_string()))?;
    tracing::debug!("Wrote {}x{} atlas to {}", width, height, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.png");
        let rgba = [7u8, 7, 7, 255].repeat(6);

        write_png(&path, 3, 2, rgba).unwrap();

        let image = image::open(&path).unwrap().into_rgba8();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [7, 7, 7, 255]);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.png");

        let err = write_png(&path, 4, 4, vec![0; 10]).unwrap_err();
        assert!(matches!(err, FontError::Image { .. }));
        assert!(!path.exists());
    }
}
