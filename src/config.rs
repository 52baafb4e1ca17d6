//! Scanner configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Metadata extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Write `.meta` sidecar files and replay them on later scans
    pub cache_metadata: bool,

    /// Refuse DLNA profiles outside the guidelines (e.g. JPEG over 4096x4096)
    pub strict_dlna: bool,

    /// Locale handed to the tag reader, falls back to `LANG`
    pub locale: Option<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            cache_metadata: true,
            strict_dlna: false,
            locale: None,
        }
    }
}

/// Catalog storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Directory where embedded cover art is stored
    pub art_cache_dir: Option<PathBuf>,

    /// File names searched for cover art next to media files
    pub album_art_names: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("files.db"),
            art_cache_dir: None,
            album_art_names: vec![
                "Cover.jpg".to_string(),
                "cover.jpg".to_string(),
                "AlbumArtSmall.jpg".to_string(),
                "albumartsmall.jpg".to_string(),
                "AlbumArt.jpg".to_string(),
                "albumart.jpg".to_string(),
                "Album.jpg".to_string(),
                "album.jpg".to_string(),
                "Folder.jpg".to_string(),
                "folder.jpg".to_string(),
                "Thumb.jpg".to_string(),
                "thumb.jpg".to_string(),
            ],
        }
    }
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directories to scan
    pub media_dirs: Vec<PathBuf>,

    pub metadata: MetadataConfig,

    pub catalog: CatalogConfig,

    /// Maximum number of files probed at the same time
    pub max_concurrent_scans: usize,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            media_dirs: Vec::new(),
            metadata: MetadataConfig::default(),
            catalog: CatalogConfig::default(),
            max_concurrent_scans: 4,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ScanConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ScanConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
