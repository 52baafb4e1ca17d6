//! Video files

use std::io;
use std::path::Path;

use crate::error::{Result, ScanError, SidecarError};
use crate::framing::{probe_packet_framing, PacketFraming};
use crate::nfo::{read_nfo, NfoInfo};
use crate::probe::{ContainerFormat, MediaInfo, Role, TagKind};
use crate::profile::{
    classify_video, fallback_mime, resolve_audio_profile, AudioProfileCategory,
    VideoClassifyInput,
};
use crate::record::{clean_tag, format_duration, format_mtime, MediaRecord};
use crate::sidecar::{read_sidecar, write_sidecar, SidecarRecord};

use super::{extension, stat_source, stem_title, MetadataBuilder};

/// Blu-ray stream directory, the title comes from the directory above `BDMV`
const BDMV_STREAM: &str = "/BDMV/STREAM/";

/// Title of a `.m2ts` stream inside a Blu-ray folder structure
fn bdmv_title(path: &Path) -> Option<String> {
    if extension(path).as_deref() != Some("m2ts") {
        return None;
    }
    let full = path.to_string_lossy();
    let idx = full.find(BDMV_STREAM)?;
    let disc_dir = full[..idx].rsplit('/').next()?;
    clean_tag(disc_dir)
}

/// Final display title: fallbacks, Blu-ray rule and the DTS marker
fn video_title(path: &Path, title: Option<String>, audio: AudioProfileCategory) -> Option<String> {
    let title = bdmv_title(path).or(title).or_else(|| stem_title(path))?;
    let mut title = title.replace('/', " - ");
    if audio == AudioProfileCategory::Dts {
        tracing::warn!("DTS audio found in {:?}", path);
        title.push_str(" [DTS]");
    }
    Some(title)
}

fn apply_nfo(record: &mut MediaRecord, nfo: NfoInfo) {
    let NfoInfo {
        title,
        comment,
        date,
        genre,
        mime,
    } = nfo;
    if title.is_some() {
        record.title = title;
    }
    if comment.is_some() {
        record.comment = comment;
    }
    if date.is_some() {
        record.date = date;
    }
    if genre.is_some() {
        record.genre = genre;
    }
    if mime.is_some() {
        record.mime = mime;
    }
}

/// MP4 container tags
fn apply_mp4_tags(record: &mut MediaRecord, info: &MediaInfo) {
    for (key, value) in &info.tags {
        let slot = match key.as_str() {
            "title" => &mut record.title,
            "genre" => &mut record.genre,
            "artist" => &mut record.artist,
            "comment" => &mut record.comment,
            _ => continue,
        };
        if let Some(value) = clean_tag(value) {
            *slot = Some(value);
        }
    }
}

impl MetadataBuilder {
    /// ASF files carry their tags in the same form as WMA audio
    fn apply_asf_tags(&self, record: &mut MediaRecord, path: &Path) {
        let tags = match self.tags.read_tags(path, &self.locale(), TagKind::Asf) {
            Ok(tags) => tags,
            Err(e) => {
                tracing::debug!("No ASF tags in {:?}: {}", path, e);
                return;
            }
        };
        if let Some(title) = tags.title.as_deref().and_then(clean_tag) {
            record.title = Some(title);
        }
        if let Some(genre) = tags.genre.as_deref().and_then(clean_tag) {
            record.genre = Some(genre);
        }
        if let Some(artist) = tags.contributor(Role::TrackArtist).and_then(clean_tag) {
            record.artist = Some(artist);
        }
        record.creator = tags
            .contributor(Role::AlbumArtist)
            .and_then(clean_tag)
            .or_else(|| record.artist.clone());
        if record.thumbnail.is_none() {
            record.thumbnail = tags.image;
        }
    }

    /// Probe a video file, classify it and store its record
    pub fn add_video(&self, path: &Path) -> Result<i64> {
        let stat = stat_source(path)?;
        let info = self.demuxer.probe(path).map_err(|e| {
            tracing::debug!("Opening {:?} failed: {}", path, e);
            ScanError::Unsupported(format!("{:?}: {}", path, e))
        })?;
        let Some(video) = info.primary_video() else {
            tracing::debug!("No video stream in {:?}", path);
            return Err(ScanError::NoVideoStream(path.to_path_buf()));
        };
        let ext = extension(path);

        let mut record = MediaRecord::new(path, stat.size, stat.mtime);
        record.thumbnail = info.thumbnail().cloned();

        let audio_profile = match info.primary_audio() {
            Some(audio) => {
                record.channels = (audio.channels > 0).then_some(audio.channels);
                record.sample_rate = (audio.sample_rate > 0).then_some(audio.sample_rate);
                resolve_audio_profile(audio)
            }
            None => AudioProfileCategory::Unknown,
        };

        record.resolution = Some(video.resolution());
        if info.bit_rate > 8 {
            record.bit_rate = Some(info.bit_rate / 8);
        }
        record.duration = info.duration_ms.filter(|&ms| ms > 0).map(format_duration);

        let framing = if info.container == ContainerFormat::MpegTs {
            probe_packet_framing(path)
        } else {
            PacketFraming::None
        };
        let class = classify_video(&VideoClassifyInput {
            container: &info.container,
            video,
            container_bit_rate: info.bit_rate,
            audio: audio_profile,
            framing,
            extension: ext.as_deref(),
        });
        tracing::debug!(
            "Classified {:?}: profile={:?}, mime={:?}",
            path,
            class.profile,
            class.mime
        );
        record.profile = class.profile.map(|pn| pn.into_string());
        record.mime = class.mime.map(str::to_string);
        record.creator = class.creator.map(str::to_string);

        if !class.non_dlna {
            match info.container {
                ContainerFormat::Asf => self.apply_asf_tags(&mut record, path),
                ContainerFormat::Mp4 => apply_mp4_tags(&mut record, &info),
                _ => {}
            }
        }

        if let Some(nfo) = read_nfo(path) {
            apply_nfo(&mut record, nfo);
        }
        if record.mime.is_none() {
            record.mime = fallback_mime(&info.container, ext.as_deref()).map(str::to_string);
        }
        if record.date.is_none() {
            record.date = format_mtime(stat.mtime);
        }
        record.title = video_title(path, record.title.take(), audio_profile);

        record.album_art = self
            .album_art()
            .find_album_art(path, record.thumbnail.as_deref());

        let id = self.insert(&record)?;
        self.check_for_captions(path, id);

        if self.options.cache_metadata {
            if let Err(e) = write_sidecar(path, &SidecarRecord::from_record(&record)) {
                tracing::warn!("Cannot write metadata cache for {:?}: {}", path, e);
            }
        }

        tracing::debug!("Added video {:?} as detail {}", path, id);
        Ok(id)
    }

    /// Like `add_video`, but replays the sidecar cache when it is still valid
    pub fn add_video_cached(&self, path: &Path) -> Result<i64> {
        if !self.options.cache_metadata {
            return self.add_video(path);
        }
        let stat = stat_source(path)?;
        match read_sidecar(path) {
            Ok(cached) if cached.matches(stat.size, stat.mtime) => {
                let record = cached.into_record(path);
                let id = self.insert(&record)?;
                self.check_for_captions(path, id);
                tracing::debug!("Using cached metadata for {:?}", path);
                Ok(id)
            }
            Ok(_) => {
                tracing::debug!("Metadata cache of {:?} is stale", path);
                self.add_video(path)
            }
            Err(SidecarError::Io(e)) if e.kind() == io::ErrorKind::NotFound => self.add_video(path),
            Err(e) => {
                tracing::warn!("Ignoring metadata cache of {:?}: {}", path, e);
                self.add_video(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use bytes::Bytes;
    use tempfile::TempDir;

    use crate::builder::BuilderOptions;
    use crate::catalog::MemoryCatalog;
    use crate::probe::{AudioCodec, AudioStream, SongTags, Stream, VideoCodec, VideoStream};
    use crate::sidecar::sidecar_path;
    use crate::tests::fixtures::{builder, media_file, ts_file, Fakes};

    fn h264_ts() -> MediaInfo {
        let mut v = VideoStream::new(VideoCodec::H264, 720, 576);
        v.profile = Some(77);
        v.bit_rate = 5_000_000;
        let mut ac3 = AudioStream::new(AudioCodec::Ac3, 48000, 6);
        ac3.bit_rate = 448_000;
        let mut info = MediaInfo::new(ContainerFormat::MpegTs);
        info.streams = vec![Stream::Video(v), Stream::Audio(ac3)];
        info.bit_rate = 6_000_000;
        info.duration_ms = Some(3_725_500);
        info
    }

    #[test]
    fn test_bdmv_title() {
        assert_eq!(
            bdmv_title(Path::new("/media/Some Movie/BDMV/STREAM/00001.m2ts")).as_deref(),
            Some("Some Movie")
        );
        assert_eq!(bdmv_title(Path::new("/media/Some Movie/00001.m2ts")), None);
        assert_eq!(bdmv_title(Path::new("/media/Movie/BDMV/STREAM/00001.ts")), None);
    }

    #[test]
    fn test_video_title() {
        let p = Path::new("/m/clip.ts");
        assert_eq!(
            video_title(p, Some("AC/DC Live".into()), AudioProfileCategory::Ac3).as_deref(),
            Some("AC - DC Live")
        );
        assert_eq!(
            video_title(p, None, AudioProfileCategory::Dts).as_deref(),
            Some("clip [DTS]")
        );
    }

    #[test]
    fn test_add_video_transport_stream() {
        let dir = TempDir::new().unwrap();
        let path = ts_file(&dir, "news.ts", true);
        let fakes = Fakes::default().with_media(&path, h264_ts());
        let catalog = Arc::new(MemoryCatalog::new());
        builder(&fakes, catalog.clone()).add_video(&path).unwrap();

        let rec = catalog.record_for(&path).unwrap();
        assert_eq!(rec.profile.as_deref(), Some("AVC_TS_MP_SD_AC3_T"));
        assert_eq!(rec.mime.as_deref(), Some("video/vnd.dlna.mpeg-tts"));
        assert_eq!(rec.resolution.as_deref(), Some("720x576"));
        assert_eq!(rec.bit_rate, Some(750_000));
        assert_eq!(rec.channels, Some(6));
        assert_eq!(rec.duration.as_deref(), Some("1:02:05.500"));
        assert_eq!(rec.title.as_deref(), Some("news"));
        assert!(rec.date.is_some());
        // Caching is off by default
        assert!(!sidecar_path(&path).unwrap().exists());
    }

    #[test]
    fn test_add_video_mp4_tags_and_nfo() {
        let dir = TempDir::new().unwrap();
        let path = media_file(&dir, "episode.mp4");
        fs::write(
            dir.path().join("episode.nfo"),
            "<episodedetails><title>Show</title><episodetitle>Pilot</episodetitle>\
             <plot>It begins.</plot></episodedetails>",
        )
        .unwrap();
        let mut info = MediaInfo::new(ContainerFormat::Mp4);
        info.streams = vec![Stream::Video(VideoStream::new(VideoCodec::Other("hevc".into()), 1920, 1080))];
        info.tags.insert("title".into(), "Container Title".into());
        info.tags.insert("artist".into(), "Studio".into());
        info.tags.insert("genre".into(), "Drama".into());

        let fakes = Fakes::default().with_media(&path, info);
        let catalog = Arc::new(MemoryCatalog::new());
        builder(&fakes, catalog.clone()).add_video(&path).unwrap();

        let rec = catalog.record_for(&path).unwrap();
        assert_eq!(rec.title.as_deref(), Some("Show - Pilot"));
        assert_eq!(rec.comment.as_deref(), Some("It begins."));
        assert_eq!(rec.artist.as_deref(), Some("Studio"));
        assert_eq!(rec.genre.as_deref(), Some("Drama"));
        assert_eq!(rec.mime.as_deref(), Some("video/mp4"));
        assert_eq!(rec.profile, None);
    }

    #[test]
    fn test_add_video_asf_tags() {
        let dir = TempDir::new().unwrap();
        let path = media_file(&dir, "clip.wmv");
        let mut info = MediaInfo::new(ContainerFormat::Asf);
        info.streams = vec![Stream::Video(VideoStream::new(VideoCodec::Wmv3, 320, 240))];
        let mut tags = SongTags {
            title: Some("Holiday".into()),
            image: Some(Bytes::from_static(b"jpeg")),
            ..Default::default()
        };
        tags.contributors.insert(Role::TrackArtist, "Me".into());

        let fakes = Fakes::default().with_media(&path, info).with_tags(&path, tags);
        let catalog = Arc::new(MemoryCatalog::new());
        builder(&fakes, catalog.clone()).add_video(&path).unwrap();

        let rec = catalog.record_for(&path).unwrap();
        assert_eq!(rec.title.as_deref(), Some("Holiday"));
        assert_eq!(rec.artist.as_deref(), Some("Me"));
        assert_eq!(rec.creator.as_deref(), Some("Me"));
        assert!(rec.has_thumbnail());
        assert_eq!(rec.mime.as_deref(), Some("video/x-ms-wmv"));
    }

    #[test]
    fn test_add_video_dts_marker() {
        let dir = TempDir::new().unwrap();
        let path = media_file(&dir, "concert.mkv");
        let mut info = MediaInfo::new(ContainerFormat::Matroska);
        info.streams = vec![
            Stream::Video(VideoStream::new(VideoCodec::H264, 1920, 1080)),
            Stream::Audio(AudioStream::new(AudioCodec::Dts, 48000, 6)),
        ];
        let fakes = Fakes::default().with_media(&path, info);
        let catalog = Arc::new(MemoryCatalog::new());
        builder(&fakes, catalog.clone()).add_video(&path).unwrap();

        let rec = catalog.record_for(&path).unwrap();
        assert_eq!(rec.title.as_deref(), Some("concert [DTS]"));
        assert_eq!(rec.mime.as_deref(), Some("video/x-matroska"));
    }

    #[test]
    fn test_add_video_errors() {
        let dir = TempDir::new().unwrap();
        let audio_only = media_file(&dir, "radio.ts");
        let mut info = MediaInfo::new(ContainerFormat::MpegTs);
        info.streams = vec![Stream::Audio(AudioStream::new(AudioCodec::Mp2, 48000, 2))];
        let fakes = Fakes::default().with_media(&audio_only, info);
        let catalog = Arc::new(MemoryCatalog::new());
        let b = builder(&fakes, catalog.clone());

        assert!(matches!(b.add_video(&audio_only), Err(ScanError::NoVideoStream(_))));
        assert!(matches!(
            b.add_video(&media_file(&dir, "garbage.avi")),
            Err(ScanError::Unsupported(_))
        ));
        assert!(matches!(
            b.add_video(&dir.path().join("missing.avi")),
            Err(ScanError::SourceUnreadable { .. })
        ));
        assert!(catalog.details().is_empty());
    }

    #[test]
    fn test_cached_video_skips_probe() {
        let dir = TempDir::new().unwrap();
        let path = ts_file(&dir, "news.ts", true);
        let fakes = Fakes::default().with_media(&path, h264_ts());
        let options = BuilderOptions {
            cache_metadata: true,
            ..Default::default()
        };

        let first = Arc::new(MemoryCatalog::new());
        builder(&fakes, first.clone())
            .with_options(options.clone())
            .add_video_cached(&path)
            .unwrap();
        assert_eq!(fakes.demuxer.calls(), 1);
        assert!(sidecar_path(&path).unwrap().exists());

        let second = Arc::new(MemoryCatalog::new());
        builder(&fakes, second.clone())
            .with_options(options)
            .add_video_cached(&path)
            .unwrap();
        assert_eq!(fakes.demuxer.calls(), 1);

        let probed = first.record_for(&path).unwrap();
        let cached = second.record_for(&path).unwrap();
        assert_eq!(cached.profile, probed.profile);
        assert_eq!(cached.title, probed.title);
        assert_eq!(cached.duration, probed.duration);
        assert_eq!(cached.mime, probed.mime);
    }

    #[test]
    fn test_stale_cache_is_reprobed() {
        let dir = TempDir::new().unwrap();
        let path = ts_file(&dir, "news.ts", true);
        let fakes = Fakes::default().with_media(&path, h264_ts());
        let b = builder(&fakes, Arc::new(MemoryCatalog::new())).with_options(BuilderOptions {
            cache_metadata: true,
            ..Default::default()
        });

        b.add_video_cached(&path).unwrap();
        // Source grows: size no longer matches the sidecar
        let mut content = fs::read(&path).unwrap();
        content.extend_from_slice(&[0u8; 16]);
        fs::write(&path, content).unwrap();

        b.add_video_cached(&path).unwrap();
        assert_eq!(fakes.demuxer.calls(), 2);
    }
}
