//! DLNA profile classification
//!
//! Maps probed stream descriptors to a DLNA profile identifier (the
//! `DLNA.ORG_PN` value) and a MIME type. Each codec family has its own pure
//! decision tree; identifiers are assembled from static segments and a
//! branch that cannot complete a valid identifier yields `None`.

use std::fmt;

use crate::framing::PacketFraming;
use crate::probe::{ContainerFormat, VideoCodec, VideoStream};

pub mod audio;
mod avc;
pub mod image;
pub mod mime;
mod mpeg;
mod mpeg4;
mod wmv;

pub use audio::{audio_file_profile, resolve_audio_profile, AudioProfileCategory};
pub use image::jpeg_profile;
pub use mime::{container_mime, fallback_mime};

/// MIME type of DLNA transport streams with 192-byte packets
pub const MIME_MPEG_TTS: &str = "video/vnd.dlna.mpeg-tts";
pub const MIME_MPEG: &str = "video/mpeg";

/// Profile identifier family, determines the maximum identifier length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFamily {
    Mpeg1,
    Mpeg2,
    Avc,
    Mpeg4,
    Wmv,
    Jpeg,
    Audio,
}

impl ProfileFamily {
    /// Leading segment of every identifier in the family
    pub fn prefix(&self) -> &'static str {
        match self {
            ProfileFamily::Mpeg1 => "MPEG1",
            ProfileFamily::Mpeg2 => "MPEG_",
            ProfileFamily::Avc => "AVC_",
            ProfileFamily::Mpeg4 => "MPEG4_P2_",
            ProfileFamily::Wmv => "WMV",
            ProfileFamily::Jpeg => "JPEG_",
            ProfileFamily::Audio => "",
        }
    }

    /// Maximum identifier length in bytes
    pub fn capacity(&self) -> usize {
        match self {
            ProfileFamily::Avc | ProfileFamily::Mpeg4 => 128,
            _ => 64,
        }
    }
}

/// A complete DLNA profile identifier, e.g. `AVC_TS_MP_SD_AC3_T`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProfileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Accumulates identifier segments for one family
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    family: ProfileFamily,
    segments: Vec<&'static str>,
}

impl ProfileBuilder {
    pub fn new(family: ProfileFamily) -> Self {
        Self {
            family,
            segments: vec![family.prefix()],
        }
    }

    pub fn push(&mut self, segment: &'static str) -> &mut Self {
        self.segments.push(segment);
        self
    }

    /// Identifier assembled so far, used for diagnostics
    pub fn partial(&self) -> String {
        self.segments.concat()
    }

    /// Join the segments. An identifier over the family capacity is dropped.
    pub fn finish(self) -> Option<ProfileId> {
        let id = self.segments.concat();
        if id.len() > self.family.capacity() {
            tracing::warn!(
                "Profile identifier {} exceeds {} bytes, dropping it",
                id,
                self.family.capacity()
            );
            return None;
        }
        Some(ProfileId(id))
    }
}

/// Outcome of one family decision tree
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FamilyMatch {
    pub profile: Option<ProfileId>,
    pub mime: Option<&'static str>,
}

impl FamilyMatch {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn mime(mime: &'static str) -> Self {
        Self {
            profile: None,
            mime: Some(mime),
        }
    }

    pub fn with(profile: Option<ProfileId>, mime: Option<&'static str>) -> Self {
        Self { profile, mime }
    }
}

/// Everything the video classifier looks at
#[derive(Debug, Clone, Copy)]
pub struct VideoClassifyInput<'a> {
    pub container: &'a ContainerFormat,
    pub video: &'a VideoStream,
    /// Container bitrate in bits per second
    pub container_bit_rate: u64,
    pub audio: AudioProfileCategory,
    /// Only meaningful for transport streams
    pub framing: PacketFraming,
    /// Lowercase source file extension without the dot
    pub extension: Option<&'a str>,
}

impl<'a> VideoClassifyInput<'a> {
    pub(crate) fn has_extension(&self, ext: &str) -> bool {
        self.extension == Some(ext)
    }
}

/// Classifier output for one video file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoClassification {
    pub profile: Option<ProfileId>,
    pub mime: Option<&'static str>,
    /// Creator implied by the codec tag (e.g. `DiVX`)
    pub creator: Option<&'static str>,
    /// The container pre-pass decided the MIME type and skipped DLNA parsing
    pub non_dlna: bool,
}

/// Classify a video stream.
///
/// Containers the DLNA guidelines do not cover get a MIME type from the
/// pre-pass and never a profile. Everything else is routed to the decision
/// tree of its codec family.
pub fn classify_video(input: &VideoClassifyInput<'_>) -> VideoClassification {
    if let Some(pre) = container_mime(input) {
        return VideoClassification {
            profile: None,
            mime: Some(pre.mime),
            creator: pre.creator,
            non_dlna: true,
        };
    }

    let result = match &input.video.codec {
        VideoCodec::Mpeg1 => mpeg::classify_mpeg1(input),
        VideoCodec::Mpeg2 => mpeg::classify_mpeg2(input),
        VideoCodec::H264 => avc::classify_avc(input),
        VideoCodec::Mpeg4 => mpeg4::classify_mpeg4_part2(input),
        VideoCodec::Wmv3 | VideoCodec::Vc1 => wmv::classify_wmv(input),
        VideoCodec::MsMpeg4v3 => FamilyMatch::mime("video/x-msvideo"),
        VideoCodec::Other(name) => {
            tracing::debug!(
                "Video codec {} in {} has no DLNA profile",
                name,
                input.container.name()
            );
            FamilyMatch::none()
        }
    };

    VideoClassification {
        profile: result.profile,
        mime: result.mime,
        creator: None,
        non_dlna: false,
    }
}
