//! In-memory catalog

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;

use super::{has_stem, BrowseObject, CatalogWriter};
use crate::error::StoreError;
use crate::record::MediaRecord;

#[derive(Debug, Clone, Serialize)]
pub struct DetailRow {
    pub id: i64,
    pub folder: bool,
    pub record: MediaRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionRow {
    pub detail_id: i64,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumArtRow {
    pub id: i64,
    pub path: PathBuf,
}

#[derive(Debug, Default, Serialize)]
struct Tables {
    details: Vec<DetailRow>,
    objects: Vec<BrowseObject>,
    captions: Vec<CaptionRow>,
    album_art: Vec<AlbumArtRow>,
    #[serde(skip)]
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Catalog kept in process memory
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: Mutex<Tables>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn details(&self) -> Vec<DetailRow> {
        self.tables.lock().details.clone()
    }

    pub fn objects(&self) -> Vec<BrowseObject> {
        self.tables.lock().objects.clone()
    }

    pub fn captions(&self) -> Vec<CaptionRow> {
        self.tables.lock().captions.clone()
    }

    pub fn album_art(&self) -> Vec<AlbumArtRow> {
        self.tables.lock().album_art.clone()
    }

    /// Record stored for a path, the latest one if there are several
    pub fn record_for(&self, path: &Path) -> Option<MediaRecord> {
        self.tables
            .lock()
            .details
            .iter()
            .rev()
            .find(|row| row.record.path == path)
            .map(|row| row.record.clone())
    }

    /// Dump all tables as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&*self.tables.lock())
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl CatalogWriter for MemoryCatalog {
    fn insert_details(&self, record: &MediaRecord) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables.details.push(DetailRow {
            id,
            folder: false,
            record: record.clone(),
        });
        Ok(id)
    }

    fn insert_folder(&self, record: &MediaRecord) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables.details.push(DetailRow {
            id,
            folder: true,
            record: record.clone(),
        });
        Ok(id)
    }

    fn insert_object(&self, object: &BrowseObject) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if tables.objects.iter().any(|o| o.object_id == object.object_id) {
            return Err(StoreError::Insert {
                table: "OBJECTS",
                path: object.object_id.clone(),
                reason: "duplicate object id".to_string(),
            });
        }
        tables.objects.push(object.clone());
        Ok(())
    }

    fn insert_caption(&self, detail_id: i64, path: &Path) -> Result<(), StoreError> {
        self.tables.lock().captions.push(CaptionRow {
            detail_id,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn insert_album_art(&self, path: &Path) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock();
        if let Some(row) = tables.album_art.iter().find(|row| row.path == path) {
            return Ok(row.id);
        }
        let id = tables.next_id();
        tables.album_art.push(AlbumArtRow {
            id,
            path: path.to_path_buf(),
        });
        Ok(id)
    }

    fn video_detail_for_stem(&self, stem: &Path) -> Result<Option<i64>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .details
            .iter()
            .find(|row| {
                !row.folder
                    && has_stem(&row.record.path, stem)
                    && row
                        .record
                        .mime
                        .as_deref()
                        .is_some_and(|m| m.starts_with("video/"))
            })
            .map(|row| row.id))
    }
}
