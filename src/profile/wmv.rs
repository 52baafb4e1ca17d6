//! Windows Media Video (WMV3 / VC-1 in ASF) profiles

use crate::probe::{ContainerFormat, VideoCodec, VideoStream};

use super::{AudioProfileCategory, FamilyMatch, ProfileBuilder, ProfileFamily, VideoClassifyInput};

const MIME_WMV: &str = "video/x-ms-wmv";

/// Effective (profile, level) of a stream. WMV3 sequence headers carry the
/// simple-profile and low-level flags in the first extradata byte.
fn profile_and_level(v: &VideoStream) -> (Option<i32>, Option<i32>) {
    let (mut profile, mut level) = (v.profile, v.level);
    if v.codec == VideoCodec::Wmv3 {
        if let Some(&b) = v.extradata.first() {
            if (b >> 3) & 1 == 0 {
                level = Some(0);
            }
            if (b >> 6) & 1 == 0 {
                profile = Some(0);
            }
        }
    }
    (profile, level)
}

pub(crate) fn classify_wmv(input: &VideoClassifyInput<'_>) -> FamilyMatch {
    if *input.container != ContainerFormat::Asf {
        tracing::debug!("Skipping DLNA parsing for non-ASF VC1 in {}", input.container.name());
        return FamilyMatch::none();
    }

    let v = input.video;
    let (profile, level) = profile_and_level(v);
    // ASF limits are expressed in bytes per second
    let rate = input.container_bit_rate / 8;
    let audio = input.audio;

    let (tier, suffix) = if v.width <= 176 && v.height <= 144 && level == Some(0) {
        ("SPLL_", simple_audio(audio))
    } else if v.width <= 352 && v.height <= 288 && profile == Some(0) && rate <= 384_000 {
        ("SPML_", simple_audio(audio))
    } else if v.width <= 720 && v.height <= 576 && rate <= 10_000_000 {
        let suffix = match audio {
            AudioProfileCategory::WmaPro => Some("PRO"),
            AudioProfileCategory::WmaFull => Some("FULL"),
            AudioProfileCategory::WmaBase => Some("BASE"),
            _ => None,
        };
        ("MED_", suffix)
    } else if v.width <= 1920 && v.height <= 1080 && rate <= 20_000_000 {
        let suffix = match audio {
            AudioProfileCategory::WmaPro => Some("PRO"),
            AudioProfileCategory::WmaFull => Some("FULL"),
            _ => None,
        };
        ("HIGH_", suffix)
    } else {
        tracing::debug!("No DLNA profile for WMV {} at {} bytes/s", v.resolution(), rate);
        return FamilyMatch::mime(MIME_WMV);
    };

    let Some(suffix) = suffix else {
        tracing::debug!("No DLNA profile found for WMV{} with {:?} audio", tier, audio);
        return FamilyMatch::mime(MIME_WMV);
    };
    let mut pn = ProfileBuilder::new(ProfileFamily::Wmv);
    pn.push(tier).push(suffix);
    FamilyMatch::with(pn.finish(), Some(MIME_WMV))
}

fn simple_audio(audio: AudioProfileCategory) -> Option<&'static str> {
    match audio {
        AudioProfileCategory::Mp3 => Some("MP3"),
        AudioProfileCategory::WmaBase => Some("BASE"),
        _ => None,
    }
}
