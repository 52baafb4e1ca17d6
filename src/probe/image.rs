//! Image resolution and EXIF probing

use std::path::Path;

use bytes::Bytes;

use crate::error::ProbeError;

/// EXIF data of a still image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifInfo {
    /// Raw `DateTimeOriginal` (or `DateTimeDigitized`), `YYYY:MM:DD HH:MM:SS`
    pub date: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    /// EXIF orientation tag (1..=8)
    pub orientation: Option<u16>,
    /// Embedded JPEG thumbnail
    pub thumbnail: Option<Bytes>,
}

/// Image collaborator
pub trait ImageProbe: Send + Sync {
    /// EXIF data, `Ok(None)` when the image carries none
    fn exif(&self, path: &Path) -> Result<Option<ExifInfo>, ProbeError>;

    /// Pixel dimensions of the image file
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), ProbeError>;

    /// Pixel dimensions of an in-memory image (used for EXIF thumbnails)
    fn dimensions_of(&self, data: &[u8]) -> Option<(u32, u32)>;
}

/// `ImageProbe` backed by the `image` crate. It reads dimensions only and
/// reports every file as carrying no EXIF data.
#[derive(Debug, Default, Clone)]
pub struct ImageCrateProbe;

impl ImageProbe for ImageCrateProbe {
    fn exif(&self, _path: &Path) -> Result<Option<ExifInfo>, ProbeError> {
        Ok(None)
    }

    fn dimensions(&self, path: &Path) -> Result<(u32, u32), ProbeError> {
        ::image::image_dimensions(path)
            .map_err(|e| ProbeError::Image(format!("{:?}: {}", path, e)))
    }

    fn dimensions_of(&self, data: &[u8]) -> Option<(u32, u32)> {
        let reader = ::image::ImageReader::new(std::io::Cursor::new(data))
            .with_guessed_format()
            .ok()?;
        reader.into_dimensions().ok()
    }
}
