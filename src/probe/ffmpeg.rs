//! FFmpeg-backed demuxer and tag reader

use std::path::Path;
use std::sync::Once;

use bytes::Bytes;
use ffmpeg_next as ffmpeg;

use crate::error::ProbeError;

use super::{
    AudioCodec, AudioStream, ContainerFormat, Demuxer, MediaInfo, Role, SongTags, Stream,
    TagKind, TagReader, VideoCodec, VideoStream,
};

static INIT: Once = Once::new();

/// Initialize FFmpeg once and quiet its logging down to errors
pub fn init() -> Result<(), ProbeError> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = ffmpeg::init()
            .map_err(|e| ProbeError::OpenInput(format!("ffmpeg::init() failed: {}", e)));
        unsafe {
            ffmpeg::ffi::av_log_set_level(ffmpeg::ffi::AV_LOG_ERROR as i32);
        }
    });
    result
}

/// Demuxer and tag reader on top of libavformat
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegProbe;

impl FfmpegProbe {
    pub fn new() -> Result<Self, ProbeError> {
        init()?;
        Ok(Self)
    }

    fn open(path: &Path) -> Result<ffmpeg::format::context::Input, ProbeError> {
        ffmpeg::format::input(&path)
            .map_err(|e| ProbeError::OpenInput(format!("Failed to open {:?}: {}", path, e)))
    }
}

fn duration_ms(context: &ffmpeg::format::context::Input) -> Option<u64> {
    let duration = context.duration();
    (duration > 0).then(|| duration as u64 * 1000 / ffmpeg::ffi::AV_TIME_BASE as u64)
}

/// Packet of an attached picture stream (cover art)
fn attached_picture(stream: &ffmpeg::Stream) -> Option<Bytes> {
    if !stream
        .disposition()
        .contains(ffmpeg::format::stream::Disposition::ATTACHED_PIC)
    {
        return None;
    }
    let data = unsafe {
        let packet = &(*stream.as_ptr()).attached_pic;
        if packet.data.is_null() || packet.size <= 0 {
            return None;
        }
        std::slice::from_raw_parts(packet.data, packet.size as usize)
    };
    Some(Bytes::copy_from_slice(data))
}

fn extradata(params: *const ffmpeg::ffi::AVCodecParameters) -> Bytes {
    unsafe {
        if (*params).extradata.is_null() || (*params).extradata_size <= 0 {
            return Bytes::new();
        }
        Bytes::copy_from_slice(std::slice::from_raw_parts(
            (*params).extradata,
            (*params).extradata_size as usize,
        ))
    }
}

fn analyze_video_stream(stream: &ffmpeg::Stream) -> VideoStream {
    let params = stream.parameters();
    let codec = VideoCodec::from_name(params.id().name());
    let ptr = unsafe { params.as_ptr() };

    let (width, height, profile, level, bit_rate, codec_tag, field_order) = unsafe {
        (
            (*ptr).width.max(0) as u32,
            (*ptr).height.max(0) as u32,
            (*ptr).profile,
            (*ptr).level,
            (*ptr).bit_rate.max(0) as u64,
            (*ptr).codec_tag,
            (*ptr).field_order,
        )
    };

    let mut video = VideoStream::new(codec, width, height);
    video.codec_tag = codec_tag;
    video.bit_rate = bit_rate;
    // FF_PROFILE_UNKNOWN / FF_LEVEL_UNKNOWN
    video.profile = (profile != -99).then_some(profile);
    video.level = (level != -99).then_some(level);
    let rate = stream.avg_frame_rate();
    if rate.denominator() > 0 && rate.numerator() > 0 {
        video.frame_rate = Some((rate.numerator() / rate.denominator()) as u32);
    }
    video.interlaced = !matches!(
        field_order,
        ffmpeg::ffi::AVFieldOrder::AV_FIELD_PROGRESSIVE | ffmpeg::ffi::AVFieldOrder::AV_FIELD_UNKNOWN
    );
    video.extradata = extradata(ptr);
    video
}

fn analyze_audio_stream(stream: &ffmpeg::Stream) -> AudioStream {
    let params = stream.parameters();
    let codec = AudioCodec::from_name(params.id().name());
    let ptr = unsafe { params.as_ptr() };

    let (sample_rate, channels, bit_rate) = unsafe {
        (
            (*ptr).sample_rate.max(0) as u32,
            (*ptr).ch_layout.nb_channels.max(0) as u32,
            (*ptr).bit_rate.max(0) as u64,
        )
    };
    let mut audio = AudioStream::new(codec, sample_rate, channels);
    audio.bit_rate = bit_rate;
    audio.extradata = extradata(ptr);
    audio
}

impl Demuxer for FfmpegProbe {
    fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError> {
        let context = Self::open(path)?;
        let mut info = MediaInfo::new(ContainerFormat::from_name(context.format().name()));
        info.duration_ms = duration_ms(&context);
        info.bit_rate = context.bit_rate().max(0) as u64;
        info.tags = context
            .metadata()
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();

        for (i, stream) in context.streams().enumerate() {
            if let Some(picture) = attached_picture(&stream) {
                info.streams.push(Stream::Thumbnail(picture));
                continue;
            }
            match stream.parameters().medium() {
                ffmpeg::media::Type::Video => {
                    let video = analyze_video_stream(&stream);
                    tracing::trace!(
                        "Found video stream {}: {}x{}, codec={:?}",
                        i,
                        video.width,
                        video.height,
                        video.codec
                    );
                    info.streams.push(Stream::Video(video));
                }
                ffmpeg::media::Type::Audio => {
                    let audio = analyze_audio_stream(&stream);
                    tracing::trace!(
                        "Found audio stream {}: {}Hz, {} channels, codec={:?}",
                        i,
                        audio.sample_rate,
                        audio.channels,
                        audio.codec
                    );
                    info.streams.push(Stream::Audio(audio));
                }
                medium => {
                    tracing::trace!("Skipping stream {} (type={:?})", i, medium);
                    info.streams.push(Stream::Other);
                }
            }
        }
        Ok(info)
    }
}

/// Leading number of `"3"` or `"3/12"`
fn leading_number(value: &str) -> Option<u32> {
    value.split('/').next()?.trim().parse().ok()
}

fn role_for_key(key: &str) -> Option<Role> {
    match key {
        "artist" => Some(Role::Artist),
        "performer" | "wm/trackartist" => Some(Role::TrackArtist),
        "album_artist" | "albumartist" | "wm/albumartist" => Some(Role::AlbumArtist),
        "band" => Some(Role::Band),
        "conductor" => Some(Role::Conductor),
        "composer" => Some(Role::Composer),
        _ => None,
    }
}

fn tag_mime(kind: TagKind) -> Option<&'static str> {
    match kind {
        TagKind::Mp3 => Some("audio/mpeg"),
        TagKind::Aac => Some("audio/mp4"),
        TagKind::Asf => Some("audio/x-ms-wma"),
        TagKind::Flac => Some("audio/x-flac"),
        TagKind::Wav => Some("audio/x-wav"),
        TagKind::Ogg => Some("application/ogg"),
        TagKind::Pcm => None,
    }
}

impl TagReader for FfmpegProbe {
    /// libavformat hands back UTF-8 tags, the locale is only logged
    fn read_tags(&self, path: &Path, locale: &str, kind: TagKind) -> Result<SongTags, ProbeError> {
        tracing::trace!("Reading {} tags of {:?} ({})", kind.as_str(), path, locale);
        let context = Self::open(path)
            .map_err(|e| ProbeError::Tags(format!("{:?}: {}", path, e)))?;

        let mut tags = SongTags {
            duration_ms: duration_ms(&context).unwrap_or(0),
            bit_rate: context.bit_rate().clamp(0, u32::MAX as i64) as u32,
            mime: tag_mime(kind).map(str::to_string),
            ..Default::default()
        };

        // Container tags first, then per-stream tags (Ogg keeps them there)
        let mut dictionaries = vec![context.metadata().to_owned()];
        for stream in context.streams() {
            if let Some(picture) = attached_picture(&stream) {
                tags.image.get_or_insert(picture);
                continue;
            }
            if stream.parameters().medium() == ffmpeg::media::Type::Audio && tags.sample_rate == 0 {
                let audio = analyze_audio_stream(&stream);
                tags.sample_rate = audio.sample_rate;
                tags.channels = audio.channels;
            }
            dictionaries.push(stream.metadata().to_owned());
        }

        for dict in &dictionaries {
            for (key, value) in dict.iter() {
                let key = key.to_ascii_lowercase();
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                if let Some(role) = role_for_key(&key) {
                    tags.contributors.entry(role).or_insert_with(|| value.to_string());
                    continue;
                }
                match key.as_str() {
                    "title" => {
                        tags.title.get_or_insert_with(|| value.to_string());
                    }
                    "album" => {
                        tags.album.get_or_insert_with(|| value.to_string());
                    }
                    "genre" => {
                        tags.genre.get_or_insert_with(|| value.to_string());
                    }
                    "comment" | "description" => {
                        tags.comment.get_or_insert_with(|| value.to_string());
                    }
                    "track" | "tracknumber" => tags.track = tags.track.or(leading_number(value)),
                    "disc" | "discnumber" => tags.disc = tags.disc.or(leading_number(value)),
                    "date" | "year" => {
                        tags.year = tags.year.or_else(|| value.get(..4).and_then(|y| y.parse().ok()))
                    }
                    _ => {}
                }
            }
        }
        Ok(tags)
    }
}
