//! Album art lookup

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::catalog::CatalogWriter;

/// Finds the album art of a media file and registers it with the catalog
pub trait AlbumArtLocator: Send + Sync {
    /// Album art id for `path`, preferring embedded image data
    fn find_album_art(&self, path: &Path, embedded: Option<&[u8]>) -> Option<i64>;
}

/// Locator that never finds any art
#[derive(Debug, Default, Clone)]
pub struct NoAlbumArt;

impl AlbumArtLocator for NoAlbumArt {
    fn find_album_art(&self, _path: &Path, _embedded: Option<&[u8]>) -> Option<i64> {
        None
    }
}

/// Hex SHA-256 of the image bytes
fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Write `data` to a temporary file in `dir` and rename it to `path`, so
/// concurrent scans never see a partial cover.
fn write_atomically(dir: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    fs::create_dir_all(dir)?;
    let tmp = dir.join(format!(
        ".{}.{}.tmp",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ));
    let result = fs::write(&tmp, data).and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Cannot remove partial art file {:?}: {}", tmp, e);
            }
        }
    }
    result
}

/// Looks for cover images next to the media file.
///
/// Embedded images are written to the art cache directory (when one is
/// configured) under a content hash, so identical covers share one entry.
pub struct CompanionArtLocator {
    catalog: Arc<dyn CatalogWriter>,
    art_names: Vec<String>,
    cache_dir: Option<PathBuf>,
}

impl CompanionArtLocator {
    pub fn new(
        catalog: Arc<dyn CatalogWriter>,
        art_names: Vec<String>,
        cache_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            art_names,
            cache_dir,
        }
    }

    fn cache_embedded(&self, data: &[u8]) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let path = dir.join(format!("{}.jpg", content_hash(data)));
        if !path.exists() {
            if let Err(e) = write_atomically(dir, &path, data) {
                tracing::warn!("Cannot cache embedded art at {:?}: {}", path, e);
                return None;
            }
        }
        Some(path)
    }

    /// Candidate cover files, most specific first
    fn candidates(&self, path: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let dir = if path.is_dir() {
            path
        } else {
            let Some(dir) = path.parent() else {
                return out;
            };
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                out.push(dir.join(format!("{}.cover.jpg", stem)));
                out.push(dir.join(format!("{}.jpg", stem)));
            }
            dir
        };
        out.extend(self.art_names.iter().map(|name| dir.join(name)));
        out
    }

    fn register(&self, art: &Path) -> Option<i64> {
        match self.catalog.insert_album_art(art) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Cannot register album art {:?}: {}", art, e);
                None
            }
        }
    }
}

impl AlbumArtLocator for CompanionArtLocator {
    fn find_album_art(&self, path: &Path, embedded: Option<&[u8]>) -> Option<i64> {
        if let Some(cached) = embedded.filter(|d| !d.is_empty()).and_then(|d| self.cache_embedded(d)) {
            return self.register(&cached);
        }
        let art = self
            .candidates(path)
            .into_iter()
            .find(|candidate| candidate.as_path() != path && candidate.is_file())?;
        tracing::debug!("Found album art {:?} for {:?}", art, path);
        self.register(&art)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use tempfile::TempDir;

    fn locator(catalog: Arc<MemoryCatalog>, cache: Option<PathBuf>) -> CompanionArtLocator {
        CompanionArtLocator::new(
            catalog,
            vec!["cover.jpg".to_string(), "folder.jpg".to_string()],
            cache,
        )
    }

    #[test]
    fn test_companion_files() {
        let dir = TempDir::new().unwrap();
        let song = dir.path().join("01 Intro.mp3");
        fs::write(&song, b"x").unwrap();
        let catalog = Arc::new(MemoryCatalog::new());
        let loc = locator(catalog.clone(), None);

        assert_eq!(loc.find_album_art(&song, None), None);

        fs::write(dir.path().join("folder.jpg"), b"jpeg").unwrap();
        let folder_id = loc.find_album_art(&song, None).unwrap();
        assert_eq!(loc.find_album_art(&song, None), Some(folder_id));

        fs::write(dir.path().join("01 Intro.jpg"), b"jpeg").unwrap();
        let own = loc.find_album_art(&song, None).unwrap();
        assert_ne!(own, folder_id);
        assert_eq!(catalog.album_art().len(), 2);

        // A directory looks inside itself
        assert_eq!(loc.find_album_art(dir.path(), None), Some(folder_id));
    }

    #[test]
    fn test_embedded_art_is_cached() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("art_cache");
        let catalog = Arc::new(MemoryCatalog::new());
        let loc = locator(catalog.clone(), Some(cache.clone()));

        let a = loc.find_album_art(&dir.path().join("a.mp3"), Some(b"cover-bytes")).unwrap();
        let b = loc.find_album_art(&dir.path().join("b.mp3"), Some(b"cover-bytes")).unwrap();
        assert_eq!(a, b);
        assert_eq!(fs::read_dir(&cache).unwrap().count(), 1);
    }

    #[test]
    fn test_cached_art_name_is_stable() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("art_cache");
        let loc = locator(Arc::new(MemoryCatalog::new()), Some(cache.clone()));
        loc.find_album_art(&dir.path().join("a.mp3"), Some(b"abc")).unwrap();
        let names: Vec<_> = fs::read_dir(&cache)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.jpg".to_string()]
        );
    }

    #[test]
    fn test_atomic_write_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("cover.jpg");
        write_atomically(dir.path(), &target, b"jpeg").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"jpeg");

        // Renaming onto a directory fails, the temporary file is cleaned up
        let blocked = dir.path().join("blocked.jpg");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("inner"), b"x").unwrap();
        assert!(write_atomically(dir.path(), &blocked, b"jpeg").is_err());
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_embedded_without_cache_falls_back() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("cover.jpg"), b"jpeg").unwrap();
        let loc = locator(Arc::new(MemoryCatalog::new()), None);
        assert!(loc.find_album_art(&dir.path().join("a.mp3"), Some(b"x")).is_some());
        assert_eq!(NoAlbumArt.find_album_art(&dir.path().join("a.mp3"), None), None);
    }
}
