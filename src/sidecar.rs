//! Sidecar metadata cache
//!
//! A finished video record is cached as a 16-line text file at
//! `<source dir>/.meta/<source file name>`. A later scan of the unchanged
//! file replays the cached fields instead of probing it again.
//!
//! Line order: size, mtime, duration, date, channels, bitrate, sample rate,
//! resolution, title, creator, artist, genre, comment, profile, mime,
//! album art id. Absent values are empty lines, except the album art id
//! which is `0` when absent.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::SidecarError;
use crate::record::MediaRecord;

/// Hidden directory holding the sidecar files of one media directory
pub const SIDECAR_DIR: &str = ".meta";

/// Number of lines in a sidecar file
pub const FIELD_COUNT: usize = 16;

/// The cached subset of a `MediaRecord`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidecarRecord {
    pub size: u64,
    pub mtime: i64,
    pub duration: Option<String>,
    pub date: Option<String>,
    pub channels: Option<u32>,
    pub bit_rate: Option<u64>,
    pub sample_rate: Option<u32>,
    pub resolution: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub profile: Option<String>,
    pub mime: Option<String>,
    pub album_art: Option<i64>,
}

impl SidecarRecord {
    pub fn from_record(record: &MediaRecord) -> Self {
        Self {
            size: record.size,
            mtime: record.mtime,
            duration: record.duration.clone(),
            date: record.date.clone(),
            channels: record.channels,
            bit_rate: record.bit_rate,
            sample_rate: record.sample_rate,
            resolution: record.resolution.clone(),
            title: record.title.clone(),
            creator: record.creator.clone(),
            artist: record.artist.clone(),
            genre: record.genre.clone(),
            comment: record.comment.clone(),
            profile: record.profile.clone(),
            mime: record.mime.clone(),
            album_art: record.album_art,
        }
    }

    /// Rebuild a record for `path`. Fields the cache does not carry stay absent.
    pub fn into_record(self, path: &Path) -> MediaRecord {
        MediaRecord {
            path: path.to_path_buf(),
            size: self.size,
            mtime: self.mtime,
            duration: self.duration,
            date: self.date,
            channels: self.channels,
            bit_rate: self.bit_rate,
            sample_rate: self.sample_rate,
            resolution: self.resolution,
            title: self.title,
            creator: self.creator,
            artist: self.artist,
            genre: self.genre,
            comment: self.comment,
            profile: self.profile,
            mime: self.mime,
            album_art: self.album_art,
            ..Default::default()
        }
    }

    /// Whether the cached size and mtime still describe the source
    pub fn matches(&self, size: u64, mtime: i64) -> bool {
        self.size == size && self.mtime == mtime
    }
}

fn text(value: &Option<String>) -> String {
    value
        .as_deref()
        .unwrap_or("")
        .replace(['\n', '\r'], " ")
}

fn number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Serialize to the 16-line text form
pub fn encode(rec: &SidecarRecord) -> String {
    let lines = [
        rec.size.to_string(),
        rec.mtime.to_string(),
        text(&rec.duration),
        text(&rec.date),
        number(rec.channels),
        number(rec.bit_rate),
        number(rec.sample_rate),
        text(&rec.resolution),
        text(&rec.title),
        text(&rec.creator),
        text(&rec.artist),
        text(&rec.genre),
        text(&rec.comment),
        text(&rec.profile),
        text(&rec.mime),
        rec.album_art.unwrap_or(0).to_string(),
    ];
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

struct Lines<'a> {
    lines: Vec<&'a str>,
}

impl<'a> Lines<'a> {
    fn text(&self, idx: usize) -> Option<String> {
        let s = self.lines[idx];
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    }

    fn required<T: FromStr>(&self, idx: usize) -> Result<T, SidecarError> {
        let s = self.lines[idx];
        s.trim().parse().map_err(|_| SidecarError::InvalidField {
            line: idx + 1,
            value: s.to_string(),
        })
    }

    fn optional<T: FromStr>(&self, idx: usize) -> Result<Option<T>, SidecarError> {
        if self.lines[idx].trim().is_empty() {
            Ok(None)
        } else {
            self.required(idx).map(Some)
        }
    }
}

/// Parse the 16-line text form
pub fn decode(content: &str) -> Result<SidecarRecord, SidecarError> {
    let lines: Vec<&str> = content
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    // A trailing newline yields one extra empty element
    let found = if content.ends_with('\n') {
        lines.len() - 1
    } else {
        lines.len()
    };
    if found < FIELD_COUNT {
        return Err(SidecarError::Truncated {
            found,
            expected: FIELD_COUNT,
        });
    }
    let l = Lines { lines };

    Ok(SidecarRecord {
        size: l.required(0)?,
        mtime: l.required(1)?,
        duration: l.text(2),
        date: l.text(3),
        channels: l.optional(4)?,
        bit_rate: l.optional(5)?,
        sample_rate: l.optional(6)?,
        resolution: l.text(7),
        title: l.text(8),
        creator: l.text(9),
        artist: l.text(10),
        genre: l.text(11),
        comment: l.text(12),
        profile: l.text(13),
        mime: l.text(14),
        album_art: l.optional::<i64>(15)?.filter(|&id| id != 0),
    })
}

/// Location of the sidecar file for `source`
pub fn sidecar_path(source: &Path) -> Result<PathBuf, SidecarError> {
    let parent = source
        .parent()
        .ok_or_else(|| SidecarError::NoParent(source.to_path_buf()))?;
    let name = source
        .file_name()
        .ok_or_else(|| SidecarError::NoParent(source.to_path_buf()))?;
    Ok(parent.join(SIDECAR_DIR).join(name))
}

fn create_sidecar_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o770);
    }
    match builder.create(dir) {
        Err(e) if e.kind() != io::ErrorKind::AlreadyExists => Err(e),
        _ => Ok(()),
    }
}

/// Write the sidecar for `source`. A partially written file is removed.
pub fn write_sidecar(source: &Path, rec: &SidecarRecord) -> Result<(), SidecarError> {
    let path = sidecar_path(source)?;
    if let Some(dir) = path.parent() {
        create_sidecar_dir(dir)?;
    }

    let content = encode(rec);
    let written = File::create(&path).and_then(|mut f| {
        f.write_all(content.as_bytes())?;
        f.flush()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&path);
        return Err(e.into());
    }
    tracing::debug!("Wrote sidecar {:?}", path);
    Ok(())
}

/// Read and decode the sidecar for `source`
pub fn read_sidecar(source: &Path) -> Result<SidecarRecord, SidecarError> {
    let path = sidecar_path(source)?;
    let content = fs::read_to_string(&path)?;
    decode(&content)
}
