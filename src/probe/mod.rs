//! Probing collaborators
//!
//! This module defines the seams to the libraries that actually read media:
//! - `Demuxer`: container and per-stream codec descriptors
//! - `TagReader`: audio tags and embedded cover art
//! - `ImageProbe`: image resolution and EXIF data
//!
//! The engine only consumes the structured output of these traits.

use std::path::Path;

use crate::error::ProbeError;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod image;
mod types;

pub use image::{ExifInfo, ImageCrateProbe, ImageProbe};
pub use types::*;

/// Demultiplexer: opens a file and describes its streams
pub trait Demuxer: Send + Sync {
    /// Probe a media file. An error means "not this media type".
    fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError>;
}

/// Tag extraction for audio files (and ASF video)
pub trait TagReader: Send + Sync {
    /// Read tags using a locale (e.g. `en_US`) for text decoding and a type hint
    fn read_tags(&self, path: &Path, locale: &str, kind: TagKind) -> Result<SongTags, ProbeError>;
}
