//! Audio profile categories
//!
//! `resolve_audio_profile` reduces the primary audio stream of a video file
//! to a small set of categories that the video decision trees key on.
//! `audio_file_profile` gives the DLNA profile of a standalone audio file.

use crate::probe::{AudioCodec, AudioStream, SongTags, TagKind};

use super::{ProfileBuilder, ProfileFamily, ProfileId};

/// AAC audio object types accepted by the DLNA AAC profiles
const AAC_LC: u8 = 2;
const AAC_LC_ER: u8 = 17;

/// Audio category of the primary audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioProfileCategory {
    #[default]
    Unknown,
    Mp3,
    Ac3,
    WmaBase,
    WmaFull,
    WmaPro,
    Mp2,
    Pcm,
    Aac,
    AacMulti5,
    Amr,
    Dts,
}

fn aac_category(stream: &AudioStream) -> AudioProfileCategory {
    let Some(&first) = stream.extradata.first() else {
        tracing::debug!("No AAC object type");
        return AudioProfileCategory::Unknown;
    };
    let object_type = first >> 3;
    if object_type != AAC_LC && object_type != AAC_LC_ER {
        tracing::debug!("Unhandled AAC object type [{}]", object_type);
        return AudioProfileCategory::Unknown;
    }
    if !(8000..=48000).contains(&stream.sample_rate) {
        tracing::debug!(
            "Unsupported AAC: sample rate {} outside 8000..=48000",
            stream.sample_rate
        );
        return AudioProfileCategory::Unknown;
    }
    if stream.channels <= 2 && stream.bit_rate <= 576_000 {
        AudioProfileCategory::Aac
    } else if stream.channels <= 6 && stream.bit_rate <= 1_440_000 {
        AudioProfileCategory::AacMulti5
    } else {
        tracing::debug!(
            "Unhandled AAC: {} channels, {} bitrate",
            stream.channels,
            stream.bit_rate
        );
        AudioProfileCategory::Unknown
    }
}

/// Map an audio stream descriptor to its category
pub fn resolve_audio_profile(stream: &AudioStream) -> AudioProfileCategory {
    match &stream.codec {
        AudioCodec::Mp3 => AudioProfileCategory::Mp3,
        AudioCodec::Aac => aac_category(stream),
        AudioCodec::Ac3 => AudioProfileCategory::Ac3,
        AudioCodec::Dts => AudioProfileCategory::Dts,
        AudioCodec::WmaV1 | AudioCodec::WmaV2 => {
            if stream.bit_rate <= 193_000 {
                AudioProfileCategory::WmaBase
            } else if stream.bit_rate <= 385_000 {
                AudioProfileCategory::WmaFull
            } else {
                AudioProfileCategory::Unknown
            }
        }
        AudioCodec::WmaPro => AudioProfileCategory::WmaPro,
        AudioCodec::Mp2 => AudioProfileCategory::Mp2,
        AudioCodec::AmrNb => AudioProfileCategory::Amr,
        AudioCodec::Pcm(_) => AudioProfileCategory::Pcm,
        AudioCodec::Other(name) => {
            tracing::debug!("Unhandled audio codec [{}]", name);
            AudioProfileCategory::Unknown
        }
    }
}

/// DLNA profile of a standalone audio file, from its tag type and the
/// stream parameters the tag reader reported.
pub fn audio_file_profile(kind: TagKind, tags: &SongTags) -> Option<ProfileId> {
    let segment = match kind {
        TagKind::Mp3 => "MP3",
        TagKind::Aac => {
            if tags.sample_rate > 48000 {
                return None;
            }
            match (tags.channels, tags.bit_rate) {
                (0..=2, 0..=320_000) => "AAC_ISO_320",
                (0..=2, 0..=576_000) => "AAC_ISO",
                (3.., 0..=1_440_000) => "AAC_MULT5_ISO",
                _ => return None,
            }
        }
        TagKind::Asf => match tags.bit_rate {
            0..=193_000 => "WMABASE",
            0..=385_000 => "WMAFULL",
            _ => return None,
        },
        TagKind::Pcm => "LPCM",
        TagKind::Flac | TagKind::Wav | TagKind::Ogg => return None,
    };
    let mut pn = ProfileBuilder::new(ProfileFamily::Audio);
    pn.push(segment);
    pn.finish()
}
