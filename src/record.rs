//! The catalog record produced for every media file

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{Local, TimeZone};
use serde::Serialize;

/// Maximum contributor length before it is replaced by `Various Artists`
pub const MAX_CONTRIBUTOR_LEN: usize = 48;
pub const VARIOUS_ARTISTS: &str = "Various Artists";

/// Normalized metadata of one catalog entry.
///
/// String fields are trimmed and escaped before they are stored here and
/// fields that were not discovered stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaRecord {
    pub path: PathBuf,
    /// Source size in bytes
    pub size: u64,
    /// Source modification time, seconds since the epoch
    pub mtime: i64,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub creator: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    /// `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`
    pub date: Option<String>,
    /// `H:MM:SS.mmm`
    pub duration: Option<String>,
    /// `WxH`
    pub resolution: Option<String>,
    pub rotation: Option<u32>,
    pub channels: Option<u32>,
    pub sample_rate: Option<u32>,
    /// Bytes per second for video, bits per second for audio
    pub bit_rate: Option<u64>,
    pub track: Option<u32>,
    pub disc: Option<u32>,
    pub mime: Option<String>,
    pub profile: Option<String>,
    #[serde(skip)]
    pub thumbnail: Option<Bytes>,
    /// Row id of the album art entry
    pub album_art: Option<i64>,
    /// First sector of a DVD title
    pub start_sector: Option<u32>,
}

impl MediaRecord {
    pub fn new(path: &Path, size: u64, mtime: i64) -> Self {
        Self {
            path: path.to_path_buf(),
            size,
            mtime,
            ..Default::default()
        }
    }

    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail.is_some()
    }
}

/// Escape markup characters and blank out control characters
pub fn escape_tag(s: &str) -> String {
    let blanked: String = s
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    quick_xml::escape::escape(blanked).into_owned()
}

/// Decode XML entities and character references. Malformed input is kept as is.
pub fn unescape_tag(s: &str) -> String {
    match quick_xml::escape::unescape(s) {
        Ok(text) => text.into_owned(),
        Err(e) => {
            tracing::debug!("Keeping undecodable tag text {:?}: {}", s, e);
            s.to_string()
        }
    }
}

/// Trim and escape a tag value. Blank values are dropped.
pub fn clean_tag(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(escape_tag(trimmed))
    }
}

/// Trimmed contributor name, replaced by `Various Artists` when too long
pub fn clean_contributor(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() > MAX_CONTRIBUTOR_LEN {
        Some(VARIOUS_ARTISTS.to_string())
    } else {
        Some(escape_tag(trimmed))
    }
}

/// Format a duration in milliseconds as `H:MM:SS.mmm`
pub fn format_duration(ms: u64) -> String {
    format!(
        "{}:{:02}:{:02}.{:03}",
        ms / 3_600_000,
        ms / 60_000 % 60,
        ms / 1000 % 60,
        ms % 1000
    )
}

/// Local-time date of a modification time, `YYYY-MM-DDTHH:MM:SS`
pub fn format_mtime(mtime: i64) -> Option<String> {
    Local
        .timestamp_opt(mtime, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}
