//! On-disk scanner configuration
//!
//! Optional fields fall back to the `ScanConfig` defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{CatalogConfig, MetadataConfig, ScanConfig};

/// `config.toml` layout: `[scan]`, `[catalog]` and an optional `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Scan settings
    pub scan: ScanSettings,
    /// Catalog settings
    pub catalog: CatalogSettings,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Directories to scan
    pub media_dirs: Vec<PathBuf>,
    /// Write and replay `.meta` sidecar files
    pub cache_metadata: Option<bool>,
    /// Strict DLNA profile matching
    pub strict_dlna: Option<bool>,
    /// Tag reader locale
    pub locale: Option<String>,
    /// Maximum concurrent probes
    pub max_concurrent_scans: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Embedded cover art directory
    pub art_cache_dir: Option<PathBuf>,
    /// Cover art file names
    pub album_art_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Parse a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write this configuration as TOML
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Configuration written by `--generate-config`
    pub fn default_config() -> Self {
        let catalog = CatalogConfig::default();
        Self {
            scan: ScanSettings {
                media_dirs: vec![PathBuf::from("/srv/media")],
                cache_metadata: Some(true),
                strict_dlna: Some(false),
                locale: None,
                max_concurrent_scans: Some(4),
            },
            catalog: CatalogSettings {
                db_path: catalog.db_path,
                art_cache_dir: Some(PathBuf::from("art_cache")),
                album_art_names: Some(catalog.album_art_names),
            },
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Resolve into the runtime configuration, filling unset fields
    pub fn into_scan_config(self) -> ScanConfig {
        let defaults = ScanConfig::default();
        ScanConfig {
            media_dirs: self.scan.media_dirs,
            metadata: MetadataConfig {
                cache_metadata: self
                    .scan
                    .cache_metadata
                    .unwrap_or(defaults.metadata.cache_metadata),
                strict_dlna: self.scan.strict_dlna.unwrap_or(defaults.metadata.strict_dlna),
                locale: self.scan.locale,
            },
            catalog: CatalogConfig {
                db_path: self.catalog.db_path,
                art_cache_dir: self.catalog.art_cache_dir,
                album_art_names: self
                    .catalog
                    .album_art_names
                    .unwrap_or(defaults.catalog.album_art_names),
            },
            max_concurrent_scans: self
                .scan
                .max_concurrent_scans
                .unwrap_or(defaults.max_concurrent_scans)
                .max(1),
            log_level: self
                .logging
                .as_ref()
                .map(|l| l.level.clone())
                .unwrap_or(defaults.log_level),
            log_format: self
                .logging
                .and_then(|l| l.format)
                .unwrap_or(defaults.log_format),
        }
    }
}

/// Write `ConfigFile::default_config()` to `path`
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
