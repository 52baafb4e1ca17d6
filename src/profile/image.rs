//! JPEG image profiles

use super::{ProfileBuilder, ProfileFamily, ProfileId};

/// Profile of a JPEG image by resolution.
///
/// Images larger than 4096x4096 are still labelled `JPEG_LRG` unless
/// `strict` is set, in which case they get no profile.
pub fn jpeg_profile(width: u32, height: u32, strict: bool) -> Option<ProfileId> {
    let tier = if width <= 640 && height <= 480 {
        "SM"
    } else if width <= 1024 && height <= 768 {
        "MED"
    } else if (width <= 4096 && height <= 4096) || !strict {
        "LRG"
    } else {
        return None;
    };
    let mut pn = ProfileBuilder::new(ProfileFamily::Jpeg);
    pn.push(tier);
    pn.finish()
}
