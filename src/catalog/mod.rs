//! Catalog store
//!
//! `CatalogWriter` is the seam between the metadata engine and whatever
//! stores the catalog. Two implementations are provided:
//! - `MemoryCatalog`: in-process tables, used for dry runs and tests
//! - `SqliteCatalog`: DETAILS / OBJECTS / CAPTIONS / ALBUM_ART tables in SQLite

use std::path::Path;

use serde::Serialize;

use crate::error::StoreError;
use crate::record::MediaRecord;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCatalog;
pub use sqlite::SqliteCatalog;

/// One node of the browse graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseObject {
    pub object_id: String,
    pub parent_id: String,
    /// Object this entry is a reference to
    pub ref_id: Option<String>,
    /// UPnP class, e.g. `item.videoItem`
    pub class: String,
    pub detail_id: i64,
    pub name: String,
}

/// Insert primitives of the catalog store.
///
/// Implementations serialize their own writes; every method takes `&self`.
pub trait CatalogWriter: Send + Sync {
    /// Store a media record, returning its detail row id
    fn insert_details(&self, record: &MediaRecord) -> Result<i64, StoreError>;

    /// Store a folder record, returning its detail row id
    fn insert_folder(&self, record: &MediaRecord) -> Result<i64, StoreError>;

    fn insert_object(&self, object: &BrowseObject) -> Result<(), StoreError>;

    /// Attach a caption file to a detail row
    fn insert_caption(&self, detail_id: i64, path: &Path) -> Result<(), StoreError>;

    /// Register an album art image, returning its id. Registering the same
    /// path twice returns the existing id.
    fn insert_album_art(&self, path: &Path) -> Result<i64, StoreError>;

    /// Detail id of a video whose path is `<stem>.<any extension>`
    fn video_detail_for_stem(&self, stem: &Path) -> Result<Option<i64>, StoreError>;
}

/// Whether `candidate` is `stem` plus one extension
pub(crate) fn has_stem(candidate: &Path, stem: &Path) -> bool {
    candidate.extension().is_some() && candidate.with_extension("") == stem
}
