//! DLNA catalog scanner
//!
//! Walks media directories, probes every file with FFmpeg and writes the
//! resulting records into a SQLite catalog (or dumps them as JSON with
//! `--dry-run`).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Semaphore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

use dlna_catalog::albumart::CompanionArtLocator;
use dlna_catalog::builder::{audio_type, BuilderOptions, MetadataBuilder};
use dlna_catalog::catalog::{CatalogWriter, MemoryCatalog, SqliteCatalog};
use dlna_catalog::config::ScanConfig;
use dlna_catalog::config_file::{generate_default_config, ConfigFile};
use dlna_catalog::disc::{DiscPlacement, VIDEO_MANAGER_IFO};
use dlna_catalog::error::{Result, ScanError};
use dlna_catalog::probe::ffmpeg::FfmpegProbe;
use dlna_catalog::probe::ImageCrateProbe;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const APP_NAME: &str = "dlna-catalog";

/// Extensions handed to the demuxer as video
const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "divx", "xvid", "asf", "wmv", "mkv", "mka", "mp4", "m4v", "mov", "3gp", "mpg", "mpeg",
    "vob", "ts", "m2ts", "mts", "m2t", "tp", "trp", "flv",
];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Media directories, override the configured ones
    #[arg(value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// SQLite database path
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// Neither read nor write `.meta` sidecar files
    #[arg(long)]
    no_cache: bool,

    /// Write a default configuration file to the config path and exit
    #[arg(long)]
    generate_config: bool,

    /// Scan into memory and print the catalog as JSON
    #[arg(long)]
    dry_run: bool,
}

/// What a walked file is scanned as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Audio,
    Video,
    Image,
    Disc,
}

fn classify(path: &Path) -> Option<FileKind> {
    if path.file_name().and_then(|n| n.to_str()) == Some(VIDEO_MANAGER_IFO) {
        return Some(FileKind::Disc);
    }
    // Disc contents are reached through the video manager only
    if path
        .parent()
        .and_then(|p| p.file_name())
        .is_some_and(|n| n == "VIDEO_TS")
    {
        return None;
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if audio_type(&ext).is_some() {
        Some(FileKind::Audio)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Video)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Image)
    } else {
        None
    }
}

fn load_config(args: &Args) -> ScanConfig {
    let mut config = if args.config.exists() {
        match ConfigFile::from_file(&args.config) {
            Ok(cf) => cf.into_scan_config(),
            Err(e) => {
                eprintln!(
                    "Failed to load config file {:?}: {}. Using defaults.",
                    args.config, e
                );
                ScanConfig::default()
            }
        }
    } else {
        ScanConfig::default()
    };
    if !args.dirs.is_empty() {
        config.media_dirs = args.dirs.clone();
    }
    if let Some(db) = &args.db {
        config.catalog.db_path = db.clone();
    }
    if args.no_cache {
        config.metadata.cache_metadata = false;
    }
    config
}

/// Initialize logging with tracing
fn init_logging(config: &ScanConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("dlna_catalog={}", config.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Scan one file, returns how many records it produced
fn scan_file(builder: &MetadataBuilder, path: &Path, kind: FileKind, disc_ordinal: u32) -> Result<usize> {
    match kind {
        FileKind::Audio => builder.add_audio(path).map(|_| 1),
        FileKind::Video => builder.add_video_cached(path).map(|_| 1),
        FileKind::Image => builder.add_image(path).map(|_| 1),
        FileKind::Disc => {
            let placement = DiscPlacement {
                browse_dir_id: "64".to_string(),
                base: "2$8".to_string(),
                class: "item.videoItem".to_string(),
                parent_id: format!("${:X}", disc_ordinal),
                first_object: 0,
            };
            builder.add_disc(path, &placement).map(|ids| ids.len())
        }
    }
}

async fn run(config: ScanConfig, dry_run: bool) -> Result<()> {
    if config.media_dirs.is_empty() {
        return Err(ScanError::Config("no media directories configured".to_string()));
    }

    let memory = dry_run.then(|| Arc::new(MemoryCatalog::new()));
    let catalog: Arc<dyn CatalogWriter> = match &memory {
        Some(memory) => memory.clone(),
        None => {
            tracing::info!("Opening catalog {:?}", config.catalog.db_path);
            Arc::new(SqliteCatalog::open(&config.catalog.db_path)?)
        }
    };

    let probe = Arc::new(FfmpegProbe::new()?);
    let album_art = Arc::new(CompanionArtLocator::new(
        catalog.clone(),
        config.catalog.album_art_names.clone(),
        config.catalog.art_cache_dir.clone(),
    ));
    let builder = Arc::new(
        MetadataBuilder::new(probe.clone(), probe, Arc::new(ImageCrateProbe), catalog)
            .with_album_art(album_art)
            .with_options(BuilderOptions::from(&config.metadata)),
    );

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_scans.max(1)));
    let added = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let discs = AtomicU32::new(0);
    let mut tasks = Vec::new();

    for dir in &config.media_dirs {
        tracing::info!("Scanning {:?}", dir);
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path().to_path_buf();
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name != "VIDEO_TS" {
                    if let Err(e) = builder.add_folder(&name, Some(&path), None, None, None) {
                        tracing::warn!("Cannot add folder {:?}: {}", path, e);
                    }
                }
                continue;
            }
            let Some(kind) = classify(&path) else {
                tracing::trace!("Ignoring {:?}", path);
                continue;
            };
            let disc_ordinal = match kind {
                FileKind::Disc => discs.fetch_add(1, Ordering::Relaxed),
                _ => 0,
            };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let builder = builder.clone();
            let added = added.clone();
            let failed = failed.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                match scan_file(&builder, &path, kind, disc_ordinal) {
                    Ok(n) => {
                        tracing::debug!("Added {:?}", path);
                        added.fetch_add(n, Ordering::Relaxed);
                    }
                    Err(e @ (ScanError::Unsupported(_) | ScanError::NoVideoStream(_))) => {
                        tracing::debug!("Skipping {:?}: {}", path, e);
                    }
                    Err(e) => {
                        tracing::warn!("Error scanning {:?}: {}", path, e);
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }));
        }
    }

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!("Scan task panicked: {}", e);
            failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    tracing::info!(
        "Scan finished: {} records added, {} files failed",
        added.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed)
    );

    if let Some(memory) = memory {
        println!("{}", memory.to_json()?);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.generate_config {
        match generate_default_config(&args.config) {
            Ok(()) => println!("Wrote default configuration to {:?}", args.config),
            Err(e) => {
                eprintln!("Cannot write {:?}: {}", args.config, e);
                std::process::exit(1);
            }
        }
        return;
    }

    let config = load_config(&args);
    init_logging(&config);
    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    tracing::debug!("Configuration loaded: {:?}", config);

    if let Err(e) = run(config, args.dry_run).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(Path::new("/m/song.MP3")), Some(FileKind::Audio));
        assert_eq!(classify(Path::new("/m/clip.mkv")), Some(FileKind::Video));
        assert_eq!(classify(Path::new("/m/photo.jpeg")), Some(FileKind::Image));
        assert_eq!(
            classify(Path::new("/m/Film/VIDEO_TS/VIDEO_TS.IFO")),
            Some(FileKind::Disc)
        );
        assert_eq!(classify(Path::new("/m/Film/VIDEO_TS/VTS_01_1.VOB")), None);
        assert_eq!(classify(Path::new("/m/clip.meta")), None);
        assert_eq!(classify(Path::new("/m/README")), None);
    }

    #[test]
    fn test_load_config_overrides() {
        let args = Args::parse_from([
            "dlna-catalog",
            "--config",
            "/nonexistent/config.toml",
            "--db",
            "/tmp/catalog.db",
            "--no-cache",
            "/srv/music",
        ]);
        let config = load_config(&args);
        assert_eq!(config.media_dirs, vec![PathBuf::from("/srv/music")]);
        assert_eq!(config.catalog.db_path, PathBuf::from("/tmp/catalog.db"));
        assert!(!config.metadata.cache_metadata);
    }
}
