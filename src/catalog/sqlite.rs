//! SQLite catalog

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{named_params, Connection, OptionalExtension};

use super::{has_stem, BrowseObject, CatalogWriter};
use crate::error::StoreError;
use crate::record::MediaRecord;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS DETAILS (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    PATH TEXT,
    SIZE INTEGER,
    TIMESTAMP INTEGER,
    TITLE TEXT COLLATE NOCASE,
    DURATION TEXT,
    BITRATE INTEGER,
    SAMPLERATE INTEGER,
    CREATOR TEXT COLLATE NOCASE,
    ARTIST TEXT COLLATE NOCASE,
    ALBUM TEXT COLLATE NOCASE,
    GENRE TEXT COLLATE NOCASE,
    COMMENT TEXT,
    CHANNELS INTEGER,
    DISC INTEGER,
    TRACK INTEGER,
    DATE DATE,
    RESOLUTION TEXT,
    THUMBNAIL BOOL DEFAULT 0,
    ROTATION INTEGER,
    ALBUM_ART INTEGER DEFAULT 0,
    DLNA_PN TEXT,
    MIME TEXT,
    START_SECTOR INTEGER
);
CREATE TABLE IF NOT EXISTS OBJECTS (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    OBJECT_ID TEXT UNIQUE NOT NULL,
    PARENT_ID TEXT NOT NULL,
    REF_ID TEXT DEFAULT NULL,
    CLASS TEXT NOT NULL,
    DETAIL_ID INTEGER DEFAULT NULL,
    NAME TEXT DEFAULT NULL
);
CREATE TABLE IF NOT EXISTS CAPTIONS (
    ID INTEGER NOT NULL,
    PATH TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS ALBUM_ART (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    PATH TEXT NOT NULL UNIQUE
);
CREATE INDEX IF NOT EXISTS IDX_DETAILS_PATH ON DETAILS(PATH);
CREATE INDEX IF NOT EXISTS IDX_OBJECTS_PARENT_ID ON OBJECTS(PARENT_ID);
";

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn insert_error(table: &'static str, path: &Path, e: rusqlite::Error) -> StoreError {
    StoreError::Insert {
        table,
        path: path_text(path),
        reason: e.to_string(),
    }
}

/// Catalog stored in a SQLite database
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn count(&self, table: &str) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })?;
        Ok(n)
    }

    /// Title and profile stored for a path
    pub fn title_and_profile(
        &self,
        path: &Path,
    ) -> Result<Option<(Option<String>, Option<String>)>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT TITLE, DLNA_PN FROM DETAILS WHERE PATH = :path ORDER BY ID DESC LIMIT 1",
                named_params! { ":path": path_text(path) },
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    fn insert_detail_row(&self, record: &MediaRecord) -> rusqlite::Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO DETAILS
                (PATH, SIZE, TIMESTAMP, TITLE, DURATION, BITRATE, SAMPLERATE, CREATOR, ARTIST,
                 ALBUM, GENRE, COMMENT, CHANNELS, DISC, TRACK, DATE, RESOLUTION, THUMBNAIL,
                 ROTATION, ALBUM_ART, DLNA_PN, MIME, START_SECTOR)
             VALUES
                (:path, :size, :timestamp, :title, :duration, :bitrate, :samplerate, :creator,
                 :artist, :album, :genre, :comment, :channels, :disc, :track, :date, :resolution,
                 :thumbnail, :rotation, :album_art, :dlna_pn, :mime, :start_sector)",
            named_params! {
                ":path": path_text(&record.path),
                ":size": record.size as i64,
                ":timestamp": record.mtime,
                ":title": record.title,
                ":duration": record.duration,
                ":bitrate": record.bit_rate.map(|b| b as i64),
                ":samplerate": record.sample_rate,
                ":creator": record.creator,
                ":artist": record.artist,
                ":album": record.album,
                ":genre": record.genre,
                ":comment": record.comment,
                ":channels": record.channels,
                ":disc": record.disc,
                ":track": record.track,
                ":date": record.date,
                ":resolution": record.resolution,
                ":thumbnail": record.has_thumbnail(),
                ":rotation": record.rotation,
                ":album_art": record.album_art.unwrap_or(0),
                ":dlna_pn": record.profile,
                ":mime": record.mime,
                ":start_sector": record.start_sector,
            },
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl CatalogWriter for SqliteCatalog {
    fn insert_details(&self, record: &MediaRecord) -> Result<i64, StoreError> {
        self.insert_detail_row(record)
            .map_err(|e| insert_error("DETAILS", &record.path, e))
    }

    fn insert_folder(&self, record: &MediaRecord) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO DETAILS (PATH, TITLE, CREATOR, ARTIST, GENRE, ALBUM_ART)
             VALUES (:path, :title, :creator, :artist, :genre, :album_art)",
            named_params! {
                ":path": path_text(&record.path),
                ":title": record.title,
                ":creator": record.creator,
                ":artist": record.artist,
                ":genre": record.genre,
                ":album_art": record.album_art.unwrap_or(0),
            },
        )
        .map_err(|e| insert_error("DETAILS", &record.path, e))?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_object(&self, object: &BrowseObject) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO OBJECTS (OBJECT_ID, PARENT_ID, REF_ID, CLASS, DETAIL_ID, NAME)
             VALUES (:object_id, :parent_id, :ref_id, :class, :detail_id, :name)",
            named_params! {
                ":object_id": object.object_id,
                ":parent_id": object.parent_id,
                ":ref_id": object.ref_id,
                ":class": object.class,
                ":detail_id": object.detail_id,
                ":name": object.name,
            },
        )
        .map_err(|e| StoreError::Insert {
            table: "OBJECTS",
            path: object.object_id.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn insert_caption(&self, detail_id: i64, path: &Path) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO CAPTIONS (ID, PATH) VALUES (:id, :path)",
            named_params! { ":id": detail_id, ":path": path_text(path) },
        )
        .map_err(|e| insert_error("CAPTIONS", path, e))?;
        Ok(())
    }

    fn insert_album_art(&self, path: &Path) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        let text = path_text(path);
        let existing: Option<i64> = conn
            .query_row(
                "SELECT ID FROM ALBUM_ART WHERE PATH = :path",
                named_params! { ":path": text },
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        conn.execute(
            "INSERT INTO ALBUM_ART (PATH) VALUES (:path)",
            named_params! { ":path": text },
        )
        .map_err(|e| insert_error("ALBUM_ART", path, e))?;
        Ok(conn.last_insert_rowid())
    }

    fn video_detail_for_stem(&self, stem: &Path) -> Result<Option<i64>, StoreError> {
        let conn = self.conn.lock();
        let prefix = format!("{}.", path_text(stem));
        // Paths starting with "<stem>." sort below "<stem>/"
        let upper = format!("{}/", path_text(stem));
        let mut stmt = conn.prepare(
            "SELECT ID, PATH FROM DETAILS
             WHERE PATH >= :lower AND PATH < :upper AND MIME LIKE 'video/%'
             ORDER BY ID",
        )?;
        let rows = stmt.query_map(
            named_params! { ":lower": prefix, ":upper": upper },
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )?;
        for row in rows {
            let (id, path) = row?;
            if has_stem(&PathBuf::from(path), stem) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}
