//! H.264 (AVC) profiles for transport streams and MP4

use crate::framing::PacketFraming;
use crate::probe::{AvcProfile, ContainerFormat, VideoStream};

use super::{
    AudioProfileCategory, FamilyMatch, ProfileBuilder, ProfileFamily, ProfileId,
    VideoClassifyInput, MIME_MPEG_TTS,
};

pub(crate) fn classify_avc(input: &VideoClassifyInput<'_>) -> FamilyMatch {
    match input.container {
        ContainerFormat::MpegTs => classify_ts(input),
        ContainerFormat::Mp4 => FamilyMatch::with(classify_mp4(input), None),
        other => {
            tracing::debug!("No DLNA profile for h.264 in {}", other.name());
            FamilyMatch::none()
        }
    }
}

/// Broadcast HD tier (`HD_60_` / `HD_50_`) for the frame sizes and rates
/// that the DLNA guidelines single out.
fn broadcast_tier(v: &VideoStream) -> Option<&'static str> {
    let fps = v.frame_rate.unwrap_or(0);
    let dims = (v.width, v.height);
    let hd60 = (matches!(dims, (1920, 1080) | (1440, 1080) | (720, 480)) && fps == 59 && v.interlaced)
        || (dims == (1280, 720) && fps == 59 && !v.interlaced);
    if hd60 {
        return Some("HD_60_");
    }
    let hd50 = matches!(dims, (1920, 1080) | (1440, 1080) | (1280, 720) | (720, 576))
        && v.interlaced
        && fps == 50;
    hd50.then_some("HD_50_")
}

fn classify_ts(input: &VideoClassifyInput<'_>) -> FamilyMatch {
    let v = input.video;
    let profile = v.avc_profile();
    let mut pn = ProfileBuilder::new(ProfileFamily::Avc);
    pn.push("TS_");

    let main_or_high = matches!(profile, Some(AvcProfile::Main | AvcProfile::High));
    let broadcast = broadcast_tier(v)
        .filter(|_| main_or_high && input.audio == AudioProfileCategory::Ac3);

    let high = match broadcast {
        Some(tier) => {
            pn.push(tier);
            false
        }
        None => {
            let tier = match profile {
                Some(p) if p.is_baseline() => ts_baseline_tier(v).or_else(|| ts_main_tier(v)),
                Some(AvcProfile::High) => ts_high_tier(v, input.audio),
                other => {
                    if !matches!(other, Some(AvcProfile::Main)) {
                        tracing::debug!("Unknown AVC profile {:?}, assuming main profile", other);
                    }
                    ts_main_tier(v)
                }
            };
            match tier {
                Some(tier) => pn.push(tier),
                None => {
                    tracing::debug!(
                        "Unsupported h.264 video profile {} ({}, {}bps)",
                        pn.partial(),
                        v.resolution(),
                        v.bit_rate
                    );
                    return FamilyMatch::none();
                }
            };
            profile == Some(AvcProfile::High)
        }
    };

    match input.audio {
        AudioProfileCategory::Mp3 => pn.push("MPEG1_L3"),
        AudioProfileCategory::Ac3 => pn.push("AC3"),
        AudioProfileCategory::Aac | AudioProfileCategory::AacMulti5 => pn.push("AAC_MULT5"),
        other => {
            tracing::debug!("No DLNA profile for {} with {:?} audio", pn.partial(), other);
            return FamilyMatch::none();
        }
    };

    match input.framing {
        PacketFraming::Ts192Valid | PacketFraming::Ts192Empty => {
            if high || input.framing.has_valid_timestamp() {
                pn.push("_T");
            }
            FamilyMatch::with(pn.finish(), Some(MIME_MPEG_TTS))
        }
        PacketFraming::Ts188 => {
            pn.push("_ISO");
            FamilyMatch::with(pn.finish(), None)
        }
        PacketFraming::None => {
            tracing::debug!("Unsupported TS packet size for {}", pn.partial());
            FamilyMatch::none()
        }
    }
}

fn ts_baseline_tier(v: &VideoStream) -> Option<&'static str> {
    if v.width > 352 || v.height > 288 {
        return None;
    }
    if v.bit_rate <= 384_000 {
        Some("BL_CIF15_")
    } else if v.bit_rate <= 3_000_000 {
        Some("BL_CIF30_")
    } else {
        None
    }
}

fn ts_main_tier(v: &VideoStream) -> Option<&'static str> {
    if v.width <= 720 && v.height <= 576 && v.bit_rate <= 10_000_000 {
        Some("MP_SD_")
    } else if v.width <= 1920 && v.height <= 1152 && v.bit_rate <= 20_000_000 {
        Some("MP_HD_")
    } else {
        None
    }
}

fn ts_high_tier(v: &VideoStream, audio: AudioProfileCategory) -> Option<&'static str> {
    (v.width <= 1920
        && v.height <= 1152
        && v.bit_rate <= 30_000_000
        && audio == AudioProfileCategory::Ac3)
        .then_some("HP_HD_")
}

fn classify_mp4(input: &VideoClassifyInput<'_>) -> Option<ProfileId> {
    let v = input.video;
    let mut pn = ProfileBuilder::new(ProfileFamily::Avc);
    pn.push("MP4_");

    let body: Option<&'static [&'static str]> = match v.avc_profile() {
        Some(p) if p.is_baseline() => mp4_baseline(input).or_else(|| mp4_main(input)),
        Some(AvcProfile::Main) => mp4_main(input),
        Some(AvcProfile::High) => {
            let ok = v.width <= 1920
                && v.height <= 1080
                && v.bit_rate <= 25_000_000
                && input.audio == AudioProfileCategory::Aac;
            if ok {
                Some(&["HP_HD_AAC"])
            } else {
                None
            }
        }
        other => {
            tracing::debug!("AVC profile {:?} not recognized", other);
            None
        }
    };

    match body {
        Some(segments) => {
            for &s in segments {
                pn.push(s);
            }
            pn.finish()
        }
        None => {
            tracing::debug!("No DLNA profile found for {} ({})", pn.partial(), v.resolution());
            None
        }
    }
}

/// Level check that passes when the level is unknown
fn level_at_most(v: &VideoStream, max: i32) -> bool {
    v.level.map_or(true, |l| l <= max)
}

fn mp4_baseline(input: &VideoClassifyInput<'_>) -> Option<&'static [&'static str]> {
    let v = input.video;
    let rate = input.container_bit_rate;
    let aac = input.audio == AudioProfileCategory::Aac;

    if v.width <= 352 && v.height <= 288 {
        let cif15 = if rate < 600_000 {
            true
        } else if rate < 5_000_000 {
            false
        } else {
            return None;
        };
        return match (cif15, input.audio) {
            (true, AudioProfileCategory::Amr) => Some(&["BL_CIF15_", "AMR"]),
            (false, AudioProfileCategory::Amr) => Some(&["BL_CIF30_", "AMR"]),
            (true, AudioProfileCategory::Aac) if rate < 520_000 => Some(&["BL_CIF15_", "AAC_520"]),
            (true, AudioProfileCategory::Aac) if rate < 940_000 => Some(&["BL_CIF15_", "AAC_940"]),
            (false, AudioProfileCategory::Aac) if rate < 520_000 => Some(&["BL_CIF30_", "AAC_520"]),
            (false, AudioProfileCategory::Aac) if rate < 940_000 => Some(&["BL_CIF30_", "AAC_940"]),
            _ => None,
        };
    }
    if v.width <= 720 && v.height <= 576 {
        if v.level == Some(30) && aac && rate <= 5_000_000 {
            return Some(&["BL_L3L_SD_AAC"]);
        }
        if level_at_most(v, 31) && aac && rate <= 15_000_000 {
            return Some(&["BL_L31_HD_AAC"]);
        }
        return None;
    }
    if v.width <= 1280 && v.height <= 720 {
        if level_at_most(v, 31) && aac && rate <= 15_000_000 {
            return Some(&["BL_L31_HD_AAC"]);
        }
        if level_at_most(v, 32) && aac && rate <= 21_000_000 {
            return Some(&["BL_L32_HD_AAC"]);
        }
    }
    None
}

fn mp4_main(input: &VideoClassifyInput<'_>) -> Option<&'static [&'static str]> {
    let v = input.video;
    if v.width <= 720 && v.height <= 576 && v.bit_rate <= 10_000_000 {
        return match input.audio {
            AudioProfileCategory::Ac3 => Some(&["MP_SD_", "AC3"]),
            AudioProfileCategory::Aac | AudioProfileCategory::AacMulti5 => {
                Some(&["MP_SD_", "AAC_MULT5"])
            }
            AudioProfileCategory::Mp3 => Some(&["MP_SD_", "MPEG1_L3"]),
            _ => None,
        };
    }
    let aac = input.audio == AudioProfileCategory::Aac;
    if v.width <= 1280 && v.height <= 720 && v.bit_rate <= 15_000_000 && aac {
        Some(&["MP_HD_720p_AAC"])
    } else if v.width <= 1920 && v.height <= 1080 && v.bit_rate <= 21_000_000 && aac {
        Some(&["MP_HD_1080i_AAC"])
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::probe::VideoCodec;
    use crate::profile::tests::classify;

    /// Every identifier the AVC trees can produce
    pub fn known_avc_identifiers() -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        for tier in ["HD_60_", "HD_50_", "BL_CIF15_", "BL_CIF30_", "MP_SD_", "MP_HD_", "HP_HD_"] {
            for audio in ["MPEG1_L3", "AC3", "AAC_MULT5"] {
                for ts in ["", "_T", "_ISO"] {
                    set.insert(format!("AVC_TS_{}{}{}", tier, audio, ts));
                }
            }
        }
        for body in [
            "BL_CIF15_AMR",
            "BL_CIF15_AAC_520",
            "BL_CIF15_AAC_940",
            "BL_CIF30_AMR",
            "BL_CIF30_AAC_520",
            "BL_CIF30_AAC_940",
            "BL_L3L_SD_AAC",
            "BL_L31_HD_AAC",
            "BL_L32_HD_AAC",
            "MP_SD_AC3",
            "MP_SD_AAC_MULT5",
            "MP_SD_MPEG1_L3",
            "MP_HD_720p_AAC",
            "MP_HD_1080i_AAC",
            "HP_HD_AAC",
        ] {
            set.insert(format!("AVC_MP4_{}", body));
        }
        set
    }

    fn h264(width: u32, height: u32, profile: i32, bit_rate: u64) -> VideoStream {
        let mut v = VideoStream::new(VideoCodec::H264, width, height);
        v.profile = Some(profile);
        v.bit_rate = bit_rate;
        v
    }

    fn ts(v: &VideoStream, audio: AudioProfileCategory, framing: PacketFraming) -> Option<ProfileId> {
        classify(ContainerFormat::MpegTs, v, v.bit_rate, audio, framing, "ts").profile
    }

    fn mp4(v: &VideoStream, rate: u64, audio: AudioProfileCategory) -> Option<ProfileId> {
        classify(ContainerFormat::Mp4, v, rate, audio, PacketFraming::None, "mp4").profile
    }

    fn s(p: Option<ProfileId>) -> Option<String> {
        p.map(ProfileId::into_string)
    }

    #[test]
    fn test_ts_hd_60_broadcast() {
        let mut v = h264(1920, 1080, 100, 18_000_000);
        v.frame_rate = Some(59);
        v.interlaced = true;
        assert_eq!(
            s(ts(&v, AudioProfileCategory::Ac3, PacketFraming::Ts192Empty)),
            Some("AVC_TS_HD_60_AC3".into())
        );
        // High profile replaced by the broadcast tier no longer forces a timestamp
        let c = classify(ContainerFormat::MpegTs, &v, 0, AudioProfileCategory::Ac3, PacketFraming::Ts192Empty, "ts");
        assert_eq!(c.mime, Some(MIME_MPEG_TTS));

        // AAC audio skips the special case and takes the regular High tier
        assert_eq!(s(ts(&v, AudioProfileCategory::Aac, PacketFraming::Ts188)), None);
    }

    #[test]
    fn test_ts_hd_50_broadcast() {
        let mut v = h264(1440, 1080, 77, 15_000_000);
        v.frame_rate = Some(50);
        v.interlaced = true;
        assert_eq!(
            s(ts(&v, AudioProfileCategory::Ac3, PacketFraming::Ts188)),
            Some("AVC_TS_HD_50_AC3_ISO".into())
        );
        v.interlaced = false;
        assert_eq!(
            s(ts(&v, AudioProfileCategory::Ac3, PacketFraming::Ts188)),
            Some("AVC_TS_MP_HD_AC3_ISO".into())
        );
    }

    #[test]
    fn test_ts_baseline_and_fallback() {
        let v = h264(352, 288, 66, 300_000);
        assert_eq!(
            s(ts(&v, AudioProfileCategory::Aac, PacketFraming::Ts188)),
            Some("AVC_TS_BL_CIF15_AAC_MULT5_ISO".into())
        );
        let v = h264(352, 288, 578, 2_000_000);
        assert_eq!(
            s(ts(&v, AudioProfileCategory::Mp3, PacketFraming::Ts188)),
            Some("AVC_TS_BL_CIF30_MPEG1_L3_ISO".into())
        );
        let v = h264(640, 480, 66, 2_000_000);
        assert_eq!(
            s(ts(&v, AudioProfileCategory::Ac3, PacketFraming::Ts188)),
            Some("AVC_TS_MP_SD_AC3_ISO".into())
        );
    }

    #[test]
    fn test_ts_high_profile_forces_timestamp() {
        let v = h264(1920, 1080, 100, 25_000_000);
        assert_eq!(
            s(ts(&v, AudioProfileCategory::Ac3, PacketFraming::Ts192Empty)),
            Some("AVC_TS_HP_HD_AC3_T".into())
        );
        assert_eq!(s(ts(&v, AudioProfileCategory::Mp3, PacketFraming::Ts192Empty)), None);
    }

    #[test]
    fn test_ts_discards() {
        let v = h264(720, 576, 77, 5_000_000);
        assert_eq!(s(ts(&v, AudioProfileCategory::Ac3, PacketFraming::None)), None);
        assert_eq!(s(ts(&v, AudioProfileCategory::Mp2, PacketFraming::Ts188)), None);
        let v = h264(3840, 2160, 77, 5_000_000);
        assert_eq!(s(ts(&v, AudioProfileCategory::Ac3, PacketFraming::Ts188)), None);
    }

    #[test]
    fn test_mp4_baseline() {
        let v = h264(320, 240, 66, 400_000);
        assert_eq!(s(mp4(&v, 500_000, AudioProfileCategory::Aac)), Some("AVC_MP4_BL_CIF15_AAC_520".into()));
        assert_eq!(s(mp4(&v, 800_000, AudioProfileCategory::Aac)), Some("AVC_MP4_BL_CIF30_AAC_940".into()));
        assert_eq!(s(mp4(&v, 500_000, AudioProfileCategory::Amr)), Some("AVC_MP4_BL_CIF15_AMR".into()));
        // AAC over 940 kbps falls back to main profile
        assert_eq!(s(mp4(&v, 2_000_000, AudioProfileCategory::Aac)), Some("AVC_MP4_MP_SD_AAC_MULT5".into()));

        let mut v = h264(720, 576, 66, 3_000_000);
        v.level = Some(30);
        assert_eq!(s(mp4(&v, 4_000_000, AudioProfileCategory::Aac)), Some("AVC_MP4_BL_L3L_SD_AAC".into()));
        v.level = Some(31);
        assert_eq!(s(mp4(&v, 4_000_000, AudioProfileCategory::Aac)), Some("AVC_MP4_BL_L31_HD_AAC".into()));

        let mut v = h264(1280, 720, 66, 12_000_000);
        v.level = Some(32);
        assert_eq!(s(mp4(&v, 18_000_000, AudioProfileCategory::Aac)), Some("AVC_MP4_BL_L32_HD_AAC".into()));
    }

    #[test]
    fn test_mp4_main_and_high() {
        let v = h264(720, 480, 77, 4_000_000);
        assert_eq!(s(mp4(&v, 4_500_000, AudioProfileCategory::Ac3)), Some("AVC_MP4_MP_SD_AC3".into()));
        assert_eq!(s(mp4(&v, 4_500_000, AudioProfileCategory::Mp3)), Some("AVC_MP4_MP_SD_MPEG1_L3".into()));
        assert_eq!(s(mp4(&v, 4_500_000, AudioProfileCategory::Mp2)), None);

        let v = h264(1280, 720, 77, 8_000_000);
        assert_eq!(s(mp4(&v, 8_500_000, AudioProfileCategory::Aac)), Some("AVC_MP4_MP_HD_720p_AAC".into()));
        let v = h264(1920, 1080, 77, 18_000_000);
        assert_eq!(s(mp4(&v, 18_500_000, AudioProfileCategory::Aac)), Some("AVC_MP4_MP_HD_1080i_AAC".into()));
        assert_eq!(s(mp4(&v, 18_500_000, AudioProfileCategory::Ac3)), None);

        let v = h264(1920, 1080, 100, 20_000_000);
        assert_eq!(s(mp4(&v, 20_500_000, AudioProfileCategory::Aac)), Some("AVC_MP4_HP_HD_AAC".into()));
        assert_eq!(s(mp4(&v, 20_500_000, AudioProfileCategory::Ac3)), None);

        let v = h264(1920, 1080, 244, 20_000_000);
        assert_eq!(s(mp4(&v, 20_500_000, AudioProfileCategory::Aac)), None);
    }

    #[test]
    fn test_other_container_has_no_profile() {
        let v = h264(1920, 1080, 100, 20_000_000);
        let c = classify(ContainerFormat::Asf, &v, 0, AudioProfileCategory::Aac, PacketFraming::None, "wmv");
        assert_eq!(c.profile, None);
        assert_eq!(c.mime, None);
    }

    #[test]
    fn test_exhaustive_identifiers_are_known_and_bounded() {
        let known = known_avc_identifiers();
        let sizes = [
            (176, 144),
            (320, 240),
            (352, 288),
            (640, 480),
            (720, 480),
            (720, 576),
            (1280, 720),
            (1440, 1080),
            (1920, 1080),
            (1920, 1152),
            (3840, 2160),
        ];
        let profiles = [66, 578, 77, 100, 110];
        let rates = [
            300_000u64, 500_000, 700_000, 2_000_000, 4_500_000, 9_000_000, 14_000_000,
            19_000_000, 24_000_000, 29_000_000, 40_000_000,
        ];
        let levels = [None, Some(30), Some(31), Some(32), Some(40)];
        let fps = [(None, false), (Some(59), true), (Some(59), false), (Some(50), true)];
        let audio = [
            AudioProfileCategory::Unknown,
            AudioProfileCategory::Mp3,
            AudioProfileCategory::Ac3,
            AudioProfileCategory::Aac,
            AudioProfileCategory::AacMulti5,
            AudioProfileCategory::Amr,
            AudioProfileCategory::Dts,
        ];
        let framings = [
            PacketFraming::None,
            PacketFraming::Ts188,
            PacketFraming::Ts192Valid,
            PacketFraming::Ts192Empty,
        ];

        let mut seen = 0usize;
        for &(w, h) in &sizes {
            for &profile in &profiles {
                for &rate in &rates {
                    for &level in &levels {
                        for &(frame_rate, interlaced) in &fps {
                            let mut v = h264(w, h, profile, rate);
                            v.level = level;
                            v.frame_rate = frame_rate;
                            v.interlaced = interlaced;
                            for &a in &audio {
                                for &f in &framings {
                                    for (container, ext) in
                                        [(ContainerFormat::MpegTs, "ts"), (ContainerFormat::Mp4, "mp4")]
                                    {
                                        let c = classify(container, &v, rate + 64_000, a, f, ext);
                                        if let Some(p) = c.profile {
                                            assert!(p.as_str().len() <= 128);
                                            assert!(known.contains(p.as_str()), "unexpected {}", p);
                                            seen += 1;
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        assert!(seen > 0);
    }
}
