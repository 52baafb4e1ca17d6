use std::path::PathBuf;

use thiserror::Error;

/// Outcome of scanning one source file (or one disc).
///
/// Every variant is local to the file that produced it; callers log it and
/// move on to the next file.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot stat source {path:?}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported media: {0}")]
    Unsupported(String),

    #[error("No video stream found in {0:?}")]
    NoVideoStream(PathBuf),

    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Disc error: {0}")]
    Disc(#[from] DiscError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] StoreError),

    #[error("Sidecar error: {0}")]
    Sidecar(#[from] SidecarError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors reported by the probing collaborators
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to open input file: {0}")]
    OpenInput(String),

    #[error("Failed to find stream info: {0}")]
    FindStreamInfo(String),

    #[error("Failed to read tags: {0}")]
    Tags(String),

    #[error("Failed to read image: {0}")]
    Image(String),
}

/// Errors reported while opening a disc structure
#[derive(Error, Debug)]
pub enum DiscError {
    #[error("Can't open disc {0}")]
    OpenDisc(String),

    #[error("Can't open main ifo of {0}")]
    OpenManager(String),

    #[error("Can't open ifo nr {number} of {path}")]
    OpenTitleSet { number: u32, path: String },

    #[error("Can't get file infos from title set {number} of {path}")]
    TitleVobs { number: u32, path: String },

    #[error("No titles found in {0}")]
    NoTitles(String),
}

/// Catalog store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Error inserting {table} row for '{path}': {reason}")]
    Insert {
        table: &'static str,
        path: String,
        reason: String,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Sidecar cache codec failures
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Sidecar file has {found} lines, expected {expected}")]
    Truncated { found: usize, expected: usize },

    #[error("Invalid value on sidecar line {line}: {value:?}")]
    InvalidField { line: usize, value: String },

    #[error("Sidecar IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source {0:?} has no parent directory")]
    NoParent(PathBuf),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ScanError>;
