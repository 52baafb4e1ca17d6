//! MPEG-1 and MPEG-2 video profiles

use crate::framing::PacketFraming;
use crate::probe::ContainerFormat;

use super::{FamilyMatch, ProfileBuilder, ProfileFamily, VideoClassifyInput, MIME_MPEG, MIME_MPEG_TTS};

/// PAL frame heights (full and half resolution)
fn is_pal_height(height: u32) -> bool {
    height == 576 || height == 288
}

pub(crate) fn classify_mpeg1(input: &VideoClassifyInput<'_>) -> FamilyMatch {
    if *input.container != ContainerFormat::MpegPs {
        return FamilyMatch::none();
    }
    let v = input.video;
    let profile = if v.width == 352 && v.height <= 288 {
        ProfileBuilder::new(ProfileFamily::Mpeg1).finish()
    } else {
        None
    };
    FamilyMatch::with(profile, Some(MIME_MPEG))
}

pub(crate) fn classify_mpeg2(input: &VideoClassifyInput<'_>) -> FamilyMatch {
    let v = input.video;
    let mut pn = ProfileBuilder::new(ProfileFamily::Mpeg2);

    match input.container {
        ContainerFormat::MpegTs => {
            tracing::debug!(
                "MPEG2 TS {} with {:?} packets",
                v.resolution(),
                input.framing
            );
            pn.push("TS_");
            if v.width >= 1280 && v.height >= 720 {
                pn.push("HD_NA");
            } else if is_pal_height(v.height) {
                pn.push("SD_EU");
            } else {
                pn.push("SD_NA");
            }
            match input.framing {
                PacketFraming::Ts188 => {
                    pn.push("_ISO");
                    FamilyMatch::with(pn.finish(), Some(MIME_MPEG))
                }
                PacketFraming::Ts192Valid => {
                    pn.push("_T");
                    FamilyMatch::with(pn.finish(), Some(MIME_MPEG_TTS))
                }
                PacketFraming::Ts192Empty => FamilyMatch::with(pn.finish(), Some(MIME_MPEG_TTS)),
                PacketFraming::None => {
                    tracing::debug!("Unsupported TS packet size for {}", pn.partial());
                    FamilyMatch::mime(MIME_MPEG)
                }
            }
        }
        ContainerFormat::MpegPs => {
            pn.push("PS_");
            pn.push(if is_pal_height(v.height) { "PAL" } else { "NTSC" });
            FamilyMatch::with(pn.finish(), Some(MIME_MPEG))
        }
        other => {
            tracing::debug!("Non-DLNA MPEG2 in {} ({})", other.name(), v.resolution());
            FamilyMatch::none()
        }
    }
}
