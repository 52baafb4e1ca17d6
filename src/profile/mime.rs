//! Container MIME types

use crate::probe::{ContainerFormat, VideoCodec};

use super::VideoClassifyInput;

/// Fourcc tags identifying DivX-compatible MPEG-4 Part 2 streams
const DIVX_FOURCCS: [&[u8; 4]; 3] = [b"XVID", b"DX50", b"DIVX"];

/// Result of the container pre-pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerMime {
    pub mime: &'static str,
    pub creator: Option<&'static str>,
}

/// MIME type for containers outside the DLNA guidelines (AVI, QuickTime,
/// Matroska, FLV). `Some` means DLNA classification is skipped.
pub fn container_mime(input: &VideoClassifyInput<'_>) -> Option<ContainerMime> {
    let mime = match input.container {
        ContainerFormat::Avi => {
            let divx = input.video.codec == VideoCodec::Mpeg4
                && DIVX_FOURCCS.contains(&&input.video.fourcc());
            return Some(ContainerMime {
                mime: "video/x-msvideo",
                creator: divx.then_some("DiVX"),
            });
        }
        ContainerFormat::Mp4 if input.has_extension("mov") => "video/quicktime",
        ContainerFormat::Matroska => "video/x-matroska",
        ContainerFormat::Flv => "video/x-flv",
        _ => return None,
    };
    Some(ContainerMime {
        mime,
        creator: None,
    })
}

/// MIME type by container when no classifier produced one
pub fn fallback_mime(container: &ContainerFormat, extension: Option<&str>) -> Option<&'static str> {
    match container {
        ContainerFormat::Avi => Some("video/x-msvideo"),
        ContainerFormat::MpegTs | ContainerFormat::MpegPs => Some("video/mpeg"),
        ContainerFormat::Other(name) if name.starts_with("mpeg") => Some("video/mpeg"),
        ContainerFormat::Asf => Some("video/x-ms-wmv"),
        ContainerFormat::Mp4 if extension == Some("mov") => Some("video/quicktime"),
        ContainerFormat::Mp4 => Some("video/mp4"),
        ContainerFormat::Matroska => Some("video/x-matroska"),
        ContainerFormat::Flv => Some("video/x-flv"),
        ContainerFormat::Other(name) => {
            tracing::warn!("Unhandled container format {}, no MIME type", name);
            None
        }
    }
}
