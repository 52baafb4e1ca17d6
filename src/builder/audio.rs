//! Audio files

use std::path::Path;

use crate::error::{Result, ScanError};
use crate::probe::{Role, SongTags, TagKind};
use crate::profile::audio_file_profile;
use crate::record::{clean_contributor, clean_tag, format_duration, MediaRecord};

use super::{extension, stat_source, stem_title, MetadataBuilder};

/// Tag reader hint and MIME type by file extension
pub fn audio_type(ext: &str) -> Option<(TagKind, &'static str)> {
    let entry = match ext {
        "mp3" => (TagKind::Mp3, "audio/mpeg"),
        "m4a" | "mp4" | "aac" | "m4p" => (TagKind::Aac, "audio/mp4"),
        "3gp" => (TagKind::Aac, "audio/3gpp"),
        "wma" | "asf" => (TagKind::Asf, "audio/x-ms-wma"),
        "flac" | "fla" | "flc" => (TagKind::Flac, "audio/x-flac"),
        "wav" => (TagKind::Wav, "audio/x-wav"),
        "ogg" | "oga" => (TagKind::Ogg, "audio/ogg"),
        "pcm" => (TagKind::Pcm, "audio/L16"),
        _ => return None,
    };
    Some(entry)
}

/// Creator is the first contributor found. When that contributor is a
/// track-level role, an album artist or band names the artist instead.
fn apply_contributors(record: &mut MediaRecord, tags: &SongTags) {
    let Some((role, name)) = Role::ALL
        .iter()
        .find_map(|&role| tags.contributor(role).map(|name| (role, name)))
    else {
        return;
    };
    record.creator = clean_contributor(name);
    record.artist = record.creator.clone();

    if role < Role::AlbumArtist {
        if let Some(album_artist) = [Role::AlbumArtist, Role::Band]
            .iter()
            .find_map(|&role| tags.contributor(role))
        {
            record.artist = clean_contributor(album_artist);
        }
    }
}

fn non_zero(v: u32) -> Option<u32> {
    (v > 0).then_some(v)
}

impl MetadataBuilder {
    /// Read the tags of an audio file and store its record
    pub fn add_audio(&self, path: &Path) -> Result<i64> {
        let stat = stat_source(path)?;
        let (kind, mime) = extension(path)
            .as_deref()
            .and_then(audio_type)
            .ok_or_else(|| ScanError::Unsupported(format!("{:?}: unhandled audio file", path)))?;

        let locale = self.locale();
        let tags = self.tags.read_tags(path, &locale, kind).map_err(|e| {
            tracing::debug!("Cannot read tags of {:?}: {}", path, e);
            ScanError::Unsupported(format!("{:?}: {}", path, e))
        })?;

        let mut record = MediaRecord::new(path, stat.size, stat.mtime);
        record.date = tags.year.filter(|&y| y > 0).map(|y| format!("{:04}-01-01", y));
        if tags.duration_ms > 0 {
            record.duration = Some(format_duration(tags.duration_ms));
        }
        record.title = tags
            .title
            .as_deref()
            .and_then(clean_tag)
            .or_else(|| stem_title(path));
        apply_contributors(&mut record, &tags);
        record.album = tags.album.as_deref().and_then(clean_tag);
        record.genre = tags.genre.as_deref().and_then(clean_tag);
        record.comment = tags.comment.as_deref().and_then(clean_tag);
        record.channels = non_zero(tags.channels);
        record.sample_rate = non_zero(tags.sample_rate);
        record.bit_rate = non_zero(tags.bit_rate).map(u64::from);
        record.track = tags.track;
        record.disc = tags.disc;
        record.profile = audio_file_profile(kind, &tags).map(|pn| pn.into_string());
        record.mime = Some(
            tags.mime
                .as_deref()
                .and_then(clean_tag)
                .unwrap_or_else(|| mime.to_string()),
        );
        record.album_art = self.album_art().find_album_art(path, tags.image.as_deref());

        let id = self.insert(&record)?;
        tracing::debug!("Added audio {:?} as detail {}", path, id);
        Ok(id)
    }
}
