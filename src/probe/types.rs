//! Descriptors produced by the probing collaborators

use std::collections::BTreeMap;

use bytes::Bytes;

/// Container format as reported by the demuxer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerFormat {
    /// MPEG transport stream (`mpegts`)
    MpegTs,
    /// MPEG program stream (`mpeg`)
    MpegPs,
    /// ISO base media family (`mov,mp4,m4a,3gp,3g2,mj2`)
    Mp4,
    Asf,
    Avi,
    Matroska,
    Flv,
    Other(String),
}

impl ContainerFormat {
    /// Map a demuxer format name to a container
    pub fn from_name(name: &str) -> Self {
        match name {
            "mpegts" => ContainerFormat::MpegTs,
            "mpeg" => ContainerFormat::MpegPs,
            "mov,mp4,m4a,3gp,3g2,mj2" | "mp4" | "mov" => ContainerFormat::Mp4,
            "asf" => ContainerFormat::Asf,
            "avi" => ContainerFormat::Avi,
            "flv" => ContainerFormat::Flv,
            n if n.starts_with("matroska") => ContainerFormat::Matroska,
            n => ContainerFormat::Other(n.to_string()),
        }
    }

    /// Demuxer format name
    pub fn name(&self) -> &str {
        match self {
            ContainerFormat::MpegTs => "mpegts",
            ContainerFormat::MpegPs => "mpeg",
            ContainerFormat::Mp4 => "mov,mp4,m4a,3gp,3g2,mj2",
            ContainerFormat::Asf => "asf",
            ContainerFormat::Avi => "avi",
            ContainerFormat::Matroska => "matroska,webm",
            ContainerFormat::Flv => "flv",
            ContainerFormat::Other(n) => n,
        }
    }
}

/// Video codec family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoCodec {
    Mpeg1,
    Mpeg2,
    H264,
    /// MPEG-4 Part 2 (DivX, Xvid, ...)
    Mpeg4,
    Wmv3,
    Vc1,
    MsMpeg4v3,
    Other(String),
}

impl VideoCodec {
    pub fn from_name(name: &str) -> Self {
        match name {
            "mpeg1video" => VideoCodec::Mpeg1,
            "mpeg2video" => VideoCodec::Mpeg2,
            "h264" => VideoCodec::H264,
            "mpeg4" => VideoCodec::Mpeg4,
            "wmv3" => VideoCodec::Wmv3,
            "vc1" => VideoCodec::Vc1,
            "msmpeg4v3" => VideoCodec::MsMpeg4v3,
            n => VideoCodec::Other(n.to_string()),
        }
    }
}

/// Audio codec family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCodec {
    Mp3,
    Aac,
    Ac3,
    Dts,
    WmaV1,
    WmaV2,
    WmaPro,
    Mp2,
    AmrNb,
    /// Any raw PCM variant, keeps the specific sample format name
    Pcm(String),
    Other(String),
}

impl AudioCodec {
    pub fn from_name(name: &str) -> Self {
        match name {
            "mp3" => AudioCodec::Mp3,
            "aac" => AudioCodec::Aac,
            "ac3" => AudioCodec::Ac3,
            "dts" => AudioCodec::Dts,
            "wmav1" => AudioCodec::WmaV1,
            "wmav2" => AudioCodec::WmaV2,
            "wmapro" => AudioCodec::WmaPro,
            "mp2" => AudioCodec::Mp2,
            "amr_nb" => AudioCodec::AmrNb,
            n if n.starts_with("pcm_") => AudioCodec::Pcm(n.to_string()),
            n => AudioCodec::Other(n.to_string()),
        }
    }
}

/// H.264 encoder profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvcProfile {
    Baseline,
    ConstrainedBaseline,
    Main,
    High,
    Other(i32),
}

impl AvcProfile {
    /// Constraint flag OR-ed into `profile_idc` for constrained profiles
    const CONSTRAINED: i32 = 1 << 9;

    /// Map a `profile_idc` value (with the constrained flag) to a profile
    pub fn from_idc(idc: i32) -> Self {
        match idc {
            66 => AvcProfile::Baseline,
            i if i == (66 | Self::CONSTRAINED) => AvcProfile::ConstrainedBaseline,
            77 => AvcProfile::Main,
            100 => AvcProfile::High,
            other => AvcProfile::Other(other),
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, AvcProfile::Baseline | AvcProfile::ConstrainedBaseline)
    }
}

/// Video stream information
#[derive(Debug, Clone, PartialEq)]
pub struct VideoStream {
    pub codec: VideoCodec,
    /// Container codec tag (fourcc, little endian)
    pub codec_tag: u32,
    pub width: u32,
    pub height: u32,
    /// Stream bitrate in bits per second (0 if unknown)
    pub bit_rate: u64,
    /// Raw encoder profile if detected
    pub profile: Option<i32>,
    /// Raw encoder level if detected
    pub level: Option<i32>,
    /// Integer frame rate, truncated (29.97 -> 29, 59.94 -> 59)
    pub frame_rate: Option<u32>,
    pub interlaced: bool,
    pub extradata: Bytes,
}

impl VideoStream {
    pub fn new(codec: VideoCodec, width: u32, height: u32) -> Self {
        Self {
            codec,
            codec_tag: 0,
            width,
            height,
            bit_rate: 0,
            profile: None,
            level: None,
            frame_rate: None,
            interlaced: false,
            extradata: Bytes::new(),
        }
    }

    pub fn fourcc(&self) -> [u8; 4] {
        self.codec_tag.to_le_bytes()
    }

    pub fn avc_profile(&self) -> Option<AvcProfile> {
        self.profile.map(AvcProfile::from_idc)
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Audio stream information
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    pub codec: AudioCodec,
    /// Bitrate in bits per second (0 if unknown)
    pub bit_rate: u64,
    pub sample_rate: u32,
    pub channels: u32,
    pub extradata: Bytes,
}

impl AudioStream {
    pub fn new(codec: AudioCodec, sample_rate: u32, channels: u32) -> Self {
        Self {
            codec,
            bit_rate: 0,
            sample_rate,
            channels,
            extradata: Bytes::new(),
        }
    }
}

/// One demuxed stream
#[derive(Debug, Clone, PartialEq)]
pub enum Stream {
    Video(VideoStream),
    Audio(AudioStream),
    /// Attached picture (cover art) carried as a video stream
    Thumbnail(Bytes),
    Other,
}

/// Container-level description of a media file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub container: ContainerFormat,
    pub streams: Vec<Stream>,
    pub duration_ms: Option<u64>,
    /// Overall bitrate in bits per second (0 if unknown)
    pub bit_rate: u64,
    /// Container-level key/value tags
    pub tags: BTreeMap<String, String>,
}

impl MediaInfo {
    pub fn new(container: ContainerFormat) -> Self {
        Self {
            container,
            streams: Vec::new(),
            duration_ms: None,
            bit_rate: 0,
            tags: BTreeMap::new(),
        }
    }

    /// Get the primary video stream (first one if multiple)
    pub fn primary_video(&self) -> Option<&VideoStream> {
        self.streams.iter().find_map(|s| match s {
            Stream::Video(v) => Some(v),
            _ => None,
        })
    }

    /// Get the primary audio stream (first one if multiple)
    pub fn primary_audio(&self) -> Option<&AudioStream> {
        self.streams.iter().find_map(|s| match s {
            Stream::Audio(a) => Some(a),
            _ => None,
        })
    }

    pub fn audio_stream_count(&self) -> usize {
        self.streams
            .iter()
            .filter(|s| matches!(s, Stream::Audio(_)))
            .count()
    }

    /// First embedded thumbnail, if any
    pub fn thumbnail(&self) -> Option<&Bytes> {
        self.streams.iter().find_map(|s| match s {
            Stream::Thumbnail(b) => Some(b),
            _ => None,
        })
    }
}

/// Short type hint handed to the tag reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Mp3,
    Aac,
    Asf,
    Flac,
    Wav,
    Ogg,
    Pcm,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Mp3 => "mp3",
            TagKind::Aac => "aac",
            TagKind::Asf => "asf",
            TagKind::Flac => "flc",
            TagKind::Wav => "wav",
            TagKind::Ogg => "ogg",
            TagKind::Pcm => "pcm",
        }
    }
}

/// Contributor roles, in lookup priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Artist,
    TrackArtist,
    AlbumArtist,
    Band,
    Conductor,
    Composer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Artist,
        Role::TrackArtist,
        Role::AlbumArtist,
        Role::Band,
        Role::Conductor,
        Role::Composer,
    ];
}

/// Tags extracted from an audio (or ASF) file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongTags {
    pub title: Option<String>,
    pub contributors: BTreeMap<Role, String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub track: Option<u32>,
    pub disc: Option<u32>,
    pub year: Option<u32>,
    /// Bits per second
    pub bit_rate: u32,
    pub sample_rate: u32,
    pub channels: u32,
    pub duration_ms: u64,
    /// Embedded cover image
    pub image: Option<Bytes>,
    /// MIME type detected by the tag reader, overrides the extension guess
    pub mime: Option<String>,
}

impl SongTags {
    /// Non-empty contributor for a role
    pub fn contributor(&self, role: Role) -> Option<&str> {
        self.contributors
            .get(&role)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}
