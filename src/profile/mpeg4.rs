//! MPEG-4 Part 2 profiles

use crate::probe::ContainerFormat;

use super::{AudioProfileCategory, FamilyMatch, ProfileBuilder, ProfileFamily, VideoClassifyInput};

pub(crate) fn classify_mpeg4_part2(input: &VideoClassifyInput<'_>) -> FamilyMatch {
    let v = input.video;
    let tag = v.fourcc();
    tracing::debug!(
        "MPEG4 stream [{}/0x{:X}]",
        tag.iter()
            .map(|&c| if c.is_ascii_graphic() { c as char } else { '_' })
            .collect::<String>(),
        v.codec_tag
    );

    if *input.container != ContainerFormat::Mp4 {
        return FamilyMatch::none();
    }

    let mut pn = ProfileBuilder::new(ProfileFamily::Mpeg4);
    if input.has_extension("3gp") {
        let profile = match input.audio {
            AudioProfileCategory::Aac => Some("3GPP_SP_L0B_AAC"),
            AudioProfileCategory::Amr => Some("3GPP_SP_L0B_AMR"),
            other => {
                tracing::debug!("No DLNA profile for MPEG4-P2 3GP with {:?} audio", other);
                None
            }
        };
        let profile = profile.and_then(|seg| {
            pn.push(seg);
            pn.finish()
        });
        return FamilyMatch::with(profile, Some("video/3gpp"));
    }

    let rate = input.container_bit_rate;
    let aac = input.audio == AudioProfileCategory::Aac;
    let segment = if rate <= 1_000_000 && aac {
        "MP4_ASP_AAC"
    } else if rate <= 4_000_000 && v.width <= 640 && v.height <= 480 && aac {
        "MP4_SP_VGA_AAC"
    } else {
        tracing::debug!(
            "Unsupported MPEG4-P2 video [{}, {}bps]",
            v.resolution(),
            rate
        );
        return FamilyMatch::none();
    };
    pn.push(segment);
    FamilyMatch::with(pn.finish(), None)
}
