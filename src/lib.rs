//! DLNA media catalog engine
//!
//! Classifies media files into DLNA profiles, caches computed metadata in
//! `.meta` sidecar files and expands DVD structures into one catalog entry
//! per title.
//!
//! Module overview:
//! - `probe`: demuxer, tag reader and image probe seams
//! - `framing`: transport stream packet framing detection
//! - `profile`: DLNA profile identifiers and MIME types
//! - `record`: catalog record and tag text helpers
//! - `sidecar` / `nfo`: metadata cache and companion info files
//! - `builder`: per-file record construction
//! - `disc`: DVD title expansion
//! - `catalog` / `albumart`: record storage and cover art
//! - `config` / `config_file`: scanner configuration

pub mod albumart;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod config_file;
pub mod disc;
pub mod error;
pub mod framing;
pub mod nfo;
pub mod probe;
pub mod profile;
pub mod record;
pub mod sidecar;

#[cfg(test)]
mod tests;

pub use builder::{BuilderOptions, MetadataBuilder};
pub use error::{Result, ScanError};
pub use record::MediaRecord;
