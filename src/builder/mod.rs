//! Metadata record builder
//!
//! Turns one source file into a catalog record:
//! - `add_audio`: tag reader output, audio file profile
//! - `add_video` / `add_video_cached`: demuxer output, DLNA classification,
//!   companion `.nfo`, sidecar cache
//! - `add_image`: EXIF data and JPEG profile
//!
//! Every call owns its own buffers, so one builder can be shared between
//! threads scanning different files.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use crate::albumart::{AlbumArtLocator, NoAlbumArt};
use crate::catalog::CatalogWriter;
use crate::config::MetadataConfig;
use crate::disc::DiscReader;
use crate::error::{Result, ScanError};
use crate::probe::{Demuxer, ImageProbe, TagReader};
use crate::record::{clean_tag, MediaRecord};

mod audio;
mod image;
mod video;

pub use audio::audio_type;

/// Locale used when neither the configuration nor `LANG` names one
pub const DEFAULT_LOCALE: &str = "en_US";

/// Caption extensions, in lookup order
const CAPTION_EXTENSIONS: [&str; 2] = ["srt", "smi"];

/// Builder options
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    /// Replay and write `.meta` sidecar files
    pub cache_metadata: bool,
    /// Strict DLNA profile matching
    pub strict_dlna: bool,
    /// Tag reader locale, overrides `LANG`
    pub locale: Option<String>,
}

impl From<&MetadataConfig> for BuilderOptions {
    fn from(config: &MetadataConfig) -> Self {
        Self {
            cache_metadata: config.cache_metadata,
            strict_dlna: config.strict_dlna,
            locale: config.locale.clone(),
        }
    }
}

/// Size and modification time of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceStat {
    pub size: u64,
    pub mtime: i64,
}

pub(crate) fn stat_source(path: &Path) -> Result<SourceStat> {
    let meta = fs::metadata(path).map_err(|source| ScanError::SourceUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Ok(SourceStat {
        size: meta.len(),
        mtime,
    })
}

/// Lowercase extension without the dot
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// File name without its extension, escaped for storage
pub(crate) fn stem_title(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy())
        .and_then(|s| clean_tag(&s))
}

/// Tag reader locale: configured value, else `LANG`, else `en_US`.
/// Only the `ll_CC` part is kept.
pub fn resolve_locale(configured: Option<&str>) -> String {
    let from_env = std::env::var("LANG").ok();
    configured
        .or(from_env.as_deref())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOCALE)
        .chars()
        .take(5)
        .collect()
}

/// Builds catalog records for media files and stores them
pub struct MetadataBuilder {
    demuxer: Arc<dyn Demuxer>,
    tags: Arc<dyn TagReader>,
    images: Arc<dyn ImageProbe>,
    catalog: Arc<dyn CatalogWriter>,
    album_art: Arc<dyn AlbumArtLocator>,
    disc_reader: Option<Arc<dyn DiscReader>>,
    options: BuilderOptions,
}

impl MetadataBuilder {
    pub fn new(
        demuxer: Arc<dyn Demuxer>,
        tags: Arc<dyn TagReader>,
        images: Arc<dyn ImageProbe>,
        catalog: Arc<dyn CatalogWriter>,
    ) -> Self {
        Self {
            demuxer,
            tags,
            images,
            catalog,
            album_art: Arc::new(NoAlbumArt),
            disc_reader: None,
            options: BuilderOptions::default(),
        }
    }

    pub fn with_album_art(mut self, album_art: Arc<dyn AlbumArtLocator>) -> Self {
        self.album_art = album_art;
        self
    }

    pub fn with_disc_reader(mut self, reader: Arc<dyn DiscReader>) -> Self {
        self.disc_reader = Some(reader);
        self
    }

    pub fn with_options(mut self, options: BuilderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogWriter> {
        &self.catalog
    }

    pub(crate) fn album_art(&self) -> &dyn AlbumArtLocator {
        self.album_art.as_ref()
    }

    pub(crate) fn disc_reader(&self) -> Option<&dyn DiscReader> {
        self.disc_reader.as_deref()
    }

    pub(crate) fn locale(&self) -> String {
        resolve_locale(self.options.locale.as_deref())
    }

    /// Insert a finished record. Failures are logged and the record dropped.
    pub(crate) fn insert(&self, record: &MediaRecord) -> Result<i64> {
        self.catalog.insert_details(record).map_err(|e| {
            tracing::error!("Error inserting details for {:?}: {}", record.path, e);
            ScanError::Catalog(e)
        })
    }

    /// Insert a folder entry
    pub fn add_folder(
        &self,
        name: &str,
        path: Option<&Path>,
        artist: Option<&str>,
        genre: Option<&str>,
        album_art: Option<i64>,
    ) -> Result<i64> {
        let mut record = MediaRecord::new(path.unwrap_or(Path::new("")), 0, 0);
        record.title = clean_tag(name);
        record.artist = artist.and_then(clean_tag);
        record.creator = record.artist.clone();
        record.genre = genre.and_then(clean_tag);
        record.album_art = album_art.filter(|&id| id > 0);
        self.catalog.insert_folder(&record).map_err(|e| {
            tracing::error!("Error inserting folder {}: {}", name, e);
            ScanError::Catalog(e)
        })
    }

    /// Attach the first readable `<stem>.srt` / `<stem>.smi` to a detail row
    pub fn check_for_captions(&self, path: &Path, detail_id: i64) -> Option<PathBuf> {
        let caption = CAPTION_EXTENSIONS
            .iter()
            .map(|ext| path.with_extension(ext))
            .find(|candidate| File::open(candidate).is_ok())?;
        match self.catalog.insert_caption(detail_id, &caption) {
            Ok(()) => {
                tracing::debug!("Found caption {:?} for detail {}", caption, detail_id);
                Some(caption)
            }
            Err(e) => {
                tracing::warn!("Cannot register caption {:?}: {}", caption, e);
                None
            }
        }
    }

    /// Attach a standalone caption file to the video sharing its stem.
    /// Returns the video's detail id, `None` when there is no such video.
    pub fn register_caption_file(&self, path: &Path) -> Result<Option<i64>> {
        let stem = path.with_extension("");
        let Some(detail_id) = self.catalog.video_detail_for_stem(&stem)? else {
            tracing::debug!("No video found for caption {:?}", path);
            return Ok(None);
        };
        self.catalog.insert_caption(detail_id, path)?;
        Ok(Some(detail_id))
    }
}
