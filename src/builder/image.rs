//! Still images

use std::path::Path;

use bytes::Bytes;

use crate::error::{Result, ScanError};
use crate::probe::{ExifInfo, ImageProbe};
use crate::profile::jpeg_profile;
use crate::record::{clean_tag, MediaRecord};

use super::{stat_source, stem_title, MetadataBuilder};

/// EXIF thumbnails up to this size are used without decoding them
const MAX_UNCHECKED_THUMBNAIL: usize = 12000;
/// Largest thumbnail edge allowed by DLNA
const MAX_THUMBNAIL_EDGE: u32 = 160;

/// `YYYY:MM:DD HH:MM:SS` to `YYYY-MM-DDTHH:MM:SS`. Date-only values are dropped.
fn exif_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() <= 10 || !raw.is_char_boundary(10) {
        return None;
    }
    let mut date: Vec<char> = raw.chars().collect();
    for (idx, c) in [(4, '-'), (7, '-'), (10, 'T')] {
        if let Some(slot) = date.get_mut(idx) {
            *slot = c;
        }
    }
    Some(date.into_iter().collect())
}

/// Camera name, the model prefixed with the make unless it already names it
fn camera(make: Option<&str>, model: Option<&str>) -> Option<String> {
    let make = make.map(str::trim).filter(|m| !m.is_empty())?;
    let model = model.map(str::trim).filter(|m| !m.is_empty())?;
    if model.to_lowercase().contains(&make.to_lowercase()) {
        clean_tag(model)
    } else {
        clean_tag(&format!("{} {}", make, model))
    }
}

fn rotation(orientation: Option<u16>) -> u32 {
    match orientation {
        Some(3) => 180,
        Some(6) => 90,
        Some(8) => 270,
        _ => 0,
    }
}

/// EXIF thumbnail, when it is small enough to serve as is
fn usable_thumbnail(probe: &dyn ImageProbe, thumb: Bytes) -> Option<Bytes> {
    if thumb.is_empty() {
        return None;
    }
    if thumb.len() <= MAX_UNCHECKED_THUMBNAIL {
        return Some(thumb);
    }
    match probe.dimensions_of(&thumb) {
        Some((w, h)) if w <= MAX_THUMBNAIL_EDGE && h <= MAX_THUMBNAIL_EDGE => Some(thumb),
        _ => None,
    }
}

impl MetadataBuilder {
    /// Read EXIF data and resolution of an image and store its record
    pub fn add_image(&self, path: &Path) -> Result<i64> {
        let stat = stat_source(path)?;
        let mut record = MediaRecord::new(path, stat.size, stat.mtime);
        record.mime = Some("image/jpeg".to_string());
        record.title = stem_title(path);

        match self.images.exif(path) {
            Ok(Some(ExifInfo {
                date,
                make,
                model,
                orientation,
                thumbnail,
            })) => {
                record.date = date.as_deref().and_then(exif_date);
                record.creator = camera(make.as_deref(), model.as_deref());
                record.rotation = Some(rotation(orientation));
                record.thumbnail =
                    thumbnail.and_then(|t| usable_thumbnail(self.images.as_ref(), t));
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("No EXIF data in {:?}: {}", path, e),
        }

        let (width, height) = self.images.dimensions(path).unwrap_or((0, 0));
        if width == 0 || height == 0 {
            return Err(ScanError::Unsupported(format!(
                "{:?}: cannot determine image resolution",
                path
            )));
        }
        record.resolution = Some(format!("{}x{}", width, height));
        record.profile =
            jpeg_profile(width, height, self.options.strict_dlna).map(|pn| pn.into_string());

        let id = self.insert(&record)?;
        tracing::debug!("Added image {:?} as detail {}", path, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::builder::BuilderOptions;
    use crate::catalog::MemoryCatalog;
    use crate::tests::fixtures::{builder, media_file, Fakes};

    #[test]
    fn test_exif_date() {
        assert_eq!(exif_date("2021:07:04 18:30:00").as_deref(), Some("2021-07-04T18:30:00"));
        assert_eq!(exif_date("2021:07:04"), None);
        assert_eq!(exif_date(""), None);
    }

    #[test]
    fn test_camera_name() {
        assert_eq!(camera(Some("Canon"), Some("Canon EOS 5D")).as_deref(), Some("Canon EOS 5D"));
        assert_eq!(camera(Some("NIKON"), Some("D750")).as_deref(), Some("NIKON D750"));
        assert_eq!(camera(Some("Apple"), Some("iphone apple edition")).as_deref(), Some("iphone apple edition"));
        assert_eq!(camera(Some("Canon"), None), None);
        assert_eq!(camera(None, Some("D750")), None);
    }

    #[test]
    fn test_rotation() {
        assert_eq!(rotation(Some(3)), 180);
        assert_eq!(rotation(Some(6)), 90);
        assert_eq!(rotation(Some(8)), 270);
        assert_eq!(rotation(Some(1)), 0);
        assert_eq!(rotation(None), 0);
    }

    #[test]
    fn test_add_image() {
        let dir = TempDir::new().unwrap();
        let path = media_file(&dir, "IMG_0001.jpg");
        let exif = ExifInfo {
            date: Some("2020:01:02 03:04:05".into()),
            make: Some("NIKON".into()),
            model: Some("D750".into()),
            orientation: Some(6),
            thumbnail: Some(Bytes::from_static(b"small thumbnail")),
        };
        let fakes = Fakes::default().with_image(&path, Some(exif), (6016, 4016));
        let catalog = Arc::new(MemoryCatalog::new());
        builder(&fakes, catalog.clone()).add_image(&path).unwrap();

        let rec = catalog.record_for(&path).unwrap();
        assert_eq!(rec.title.as_deref(), Some("IMG_0001"));
        assert_eq!(rec.date.as_deref(), Some("2020-01-02T03:04:05"));
        assert_eq!(rec.creator.as_deref(), Some("NIKON D750"));
        assert_eq!(rec.rotation, Some(90));
        assert_eq!(rec.resolution.as_deref(), Some("6016x4016"));
        assert_eq!(rec.profile.as_deref(), Some("JPEG_LRG"));
        assert_eq!(rec.mime.as_deref(), Some("image/jpeg"));
        assert!(rec.has_thumbnail());
    }

    #[test]
    fn test_add_image_strict_and_large_thumbnail() {
        let dir = TempDir::new().unwrap();
        let path = media_file(&dir, "pano.jpg");
        let exif = ExifInfo {
            thumbnail: Some(Bytes::from(vec![0u8; MAX_UNCHECKED_THUMBNAIL + 1])),
            ..Default::default()
        };
        let fakes = Fakes::default()
            .with_image(&path, Some(exif), (8000, 2000))
            .with_thumbnail_size((320, 240));
        let catalog = Arc::new(MemoryCatalog::new());
        builder(&fakes, catalog.clone())
            .with_options(BuilderOptions {
                strict_dlna: true,
                ..Default::default()
            })
            .add_image(&path)
            .unwrap();

        let rec = catalog.record_for(&path).unwrap();
        assert_eq!(rec.profile, None);
        assert!(!rec.has_thumbnail());
        assert_eq!(rec.date, None);
    }

    #[test]
    fn test_add_image_without_resolution() {
        let dir = TempDir::new().unwrap();
        let path = media_file(&dir, "broken.jpg");
        let catalog = Arc::new(MemoryCatalog::new());
        let result = builder(&Fakes::default(), catalog.clone()).add_image(&path);
        assert!(matches!(result, Err(ScanError::Unsupported(_))));
        assert!(catalog.details().is_empty());
    }
}
