//! DVD title expansion
//!
//! One `VIDEO_TS/VIDEO_TS.IFO` source fans out into a catalog record per
//! playable title. Each title is linked into the browse graph twice: a
//! primary object under the browse directory and a reference object under
//! the caller's base container.

use std::path::{Path, PathBuf};

use crate::builder::{stat_source, MetadataBuilder};
use crate::catalog::BrowseObject;
use crate::error::{DiscError, Result, ScanError};
use crate::profile::{AudioProfileCategory, ProfileBuilder, ProfileFamily, MIME_MPEG};
use crate::record::{clean_tag, format_duration, format_mtime, MediaRecord};

pub mod ifo;

pub use ifo::{
    AudioAttributes, CellPlayback, Disc, DiscReader, DvdAudioFormat, DvdTime, ManagerIfo,
    ProgramChain, TitleEntry, TitleSetAttributes, TitleSetIfo, VideoAttributes, DVD_BLOCK_LEN,
};

/// File name of the video manager
pub const VIDEO_MANAGER_IFO: &str = "VIDEO_TS.IFO";
const VIDEO_TS_MARKER: &str = "/VIDEO_TS/";
/// DVD audio is always sampled at 48 kHz
const DVD_SAMPLE_RATE: u32 = 48000;

/// Where the titles of a disc go in the browse graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscPlacement {
    /// Browse directory prefix of the primary objects
    pub browse_dir_id: String,
    /// Container prefix of the reference objects
    pub base: String,
    /// UPnP class of both objects
    pub class: String,
    pub parent_id: String,
    /// Ordinal of the first title, title `n` gets `first_object + n`
    pub first_object: u32,
}

impl DiscPlacement {
    fn primary_id(&self, ordinal: u32) -> String {
        format!("{}{}${:X}", self.browse_dir_id, self.parent_id, ordinal)
    }

    fn reference_id(&self, ordinal: u32) -> String {
        format!("{}{}${:X}", self.base, self.parent_id, ordinal)
    }
}

/// One usable title
#[derive(Debug, Clone, PartialEq)]
pub struct DiscTitle {
    /// 0-based position in the manager's title table
    pub index: u32,
    pub chapters: u32,
    pub start_sector: u32,
    pub end_sector: u32,
    /// Bytes
    pub size: u64,
    pub duration_ms: u64,
    pub width: u32,
    pub height: u32,
    pub pal: bool,
    pub audio: AudioProfileCategory,
    pub channels: u32,
}

/// Directory the disc reader expects: the IFO path without `VIDEO_TS.IFO`
pub fn disc_dir(ifo_path: &Path) -> PathBuf {
    match ifo_path.file_name() {
        Some(name) if name == VIDEO_MANAGER_IFO => {
            ifo_path.parent().map(Path::to_path_buf).unwrap_or_default()
        }
        _ => ifo_path.to_path_buf(),
    }
}

/// Title derived from the disc location: the directory holding `VIDEO_TS`,
/// else the disc directory's own name
fn disc_title(path: &Path) -> Option<String> {
    let full = path.with_extension("").to_string_lossy().into_owned();
    let title = match full.find(VIDEO_TS_MARKER) {
        Some(idx) => full[..idx].rsplit('/').next().unwrap_or_default().to_string(),
        None => full.trim_start_matches('/').to_string(),
    };
    clean_tag(&title)
        .or_else(|| {
            disc_dir(path)
                .file_name()
                .and_then(|name| clean_tag(&name.to_string_lossy()))
        })
        .map(|t| t.replace('/', " - "))
}

fn audio_category(attr: &AudioAttributes) -> Option<AudioProfileCategory> {
    match attr.format() {
        DvdAudioFormat::Ac3 => Some(AudioProfileCategory::Ac3),
        DvdAudioFormat::Dts => Some(AudioProfileCategory::Dts),
        DvdAudioFormat::Mpeg1 => {
            tracing::info!("MPEG1 audio detected, handling as MPEG2");
            Some(AudioProfileCategory::Mp2)
        }
        DvdAudioFormat::Mpeg2 => Some(AudioProfileCategory::Mp2),
        DvdAudioFormat::Lpcm => Some(AudioProfileCategory::Pcm),
        DvdAudioFormat::Sdds | DvdAudioFormat::Unknown(_) => None,
    }
}

/// Read the title layout of a disc.
///
/// Every title set is opened before any title is analyzed; a failure there
/// aborts the whole disc. Titles without audio, with unsupported audio or
/// with a broken program chain are skipped.
pub fn read_titles(reader: &dyn DiscReader, dir: &Path) -> std::result::Result<Vec<DiscTitle>, DiscError> {
    let dir_name = dir.display().to_string();
    let disc = reader.open(dir)?;
    tracing::debug!("Accessing main ifo of {}", dir_name);
    let manager = disc.open_manager()?;

    let title_sets = (1..=manager.title_set_count())
        .map(|number| {
            tracing::debug!("Accessing ifo {} of {}", number, dir_name);
            disc.open_title_set(number)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let entries = manager.titles();
    if entries.is_empty() {
        return Err(DiscError::NoTitles(dir_name));
    }
    let vob_blocks = disc.title_vobs_blocks(1).map_err(|e| {
        tracing::warn!("Can't get file infos from title set 1 of {}: {}", dir_name, e);
        e
    })?;
    let title_count = entries.len();
    tracing::debug!("{} titles in {}", title_count, dir_name);

    let mut titles = Vec::new();
    for (index, entry) in (0u32..).zip(entries) {
        let Some(title_set) = entry
            .title_set
            .checked_sub(1)
            .and_then(|i| title_sets.get(i as usize))
        else {
            tracing::warn!("Title {} refers to missing title set {}", index + 1, entry.title_set);
            continue;
        };
        let Some(attributes) = title_set.attributes() else {
            continue;
        };
        let Some(pgc) = title_set
            .first_part_pgcn(entry.vts_ttn)
            .and_then(|pgcn| title_set.program_chain(pgcn))
        else {
            tracing::warn!("No program chain for title {} of {}", index + 1, dir_name);
            continue;
        };
        let Some((start_sector, end_sector)) = pgc.sector_range() else {
            tracing::warn!("No cells in title {} of {}", index + 1, dir_name);
            continue;
        };

        let Some(audio_attr) = attributes.audio.first() else {
            tracing::warn!("Ignoring title {} without audio in {}", index + 1, dir_name);
            continue;
        };
        let Some(audio) = audio_category(audio_attr) else {
            tracing::warn!(
                "Unhandled audio format [0x{:X}], ignoring title {}",
                audio_attr.audio_format,
                index + 1
            );
            continue;
        };

        let size = if title_count == 1 {
            vob_blocks * DVD_BLOCK_LEN
        } else {
            u64::from(end_sector.saturating_sub(start_sector)) * DVD_BLOCK_LEN
        };
        let (width, height) = attributes.video.resolution();
        tracing::debug!(
            "Title {}: chapters={}, sectors={}..{}, size={}",
            index + 1,
            entry.chapters,
            start_sector,
            end_sector,
            size
        );

        titles.push(DiscTitle {
            index,
            chapters: entry.chapters,
            start_sector,
            end_sector,
            size,
            duration_ms: pgc.playback_time.to_millis(),
            width,
            height,
            pal: attributes.video.is_pal(),
            audio,
            channels: u32::from(audio_attr.channels) + 1,
        });
    }
    Ok(titles)
}

impl MetadataBuilder {
    /// Catalog every usable title of a DVD.
    ///
    /// `path` is the `VIDEO_TS.IFO` file. Returns the detail ids of the
    /// stored titles.
    pub fn add_disc(&self, path: &Path, placement: &DiscPlacement) -> Result<Vec<i64>> {
        let stat = stat_source(path)?;
        let reader = self
            .disc_reader()
            .ok_or_else(|| ScanError::Unsupported(format!("{:?}: no disc reader", path)))?;
        let titles = read_titles(reader, &disc_dir(path)).map_err(|e| {
            tracing::warn!("Skipping disc {:?}: {}", path, e);
            ScanError::Disc(e)
        })?;

        let base_title = disc_title(path);
        let numbered = titles.len() > 1;
        let date = format_mtime(stat.mtime);
        let album_art = self.album_art().find_album_art(path, None);

        let mut ids = Vec::with_capacity(titles.len());
        for title in &titles {
            let dts = title.audio == AudioProfileCategory::Dts;
            if dts {
                tracing::warn!("DTS audio found in {:?}", path);
            }
            let name = base_title.as_ref().map(|base| {
                let mut name = base.clone();
                if numbered {
                    name.push_str(&format!(" - {}", title.index + 1));
                }
                if dts {
                    name.push_str(" [DTS]");
                }
                name
            });

            let mut pn = ProfileBuilder::new(ProfileFamily::Mpeg2);
            pn.push("PS_").push(if title.pal { "PAL" } else { "NTSC" });

            let mut record = MediaRecord::new(path, title.size, stat.mtime);
            record.title = name.clone();
            record.date = date.clone();
            record.duration = (title.duration_ms > 0).then(|| format_duration(title.duration_ms));
            record.resolution = Some(format!("{}x{}", title.width, title.height));
            record.channels = Some(title.channels);
            record.sample_rate = Some(DVD_SAMPLE_RATE);
            record.mime = Some(MIME_MPEG.to_string());
            record.profile = pn.finish().map(|pn| pn.into_string());
            record.album_art = album_art;
            record.start_sector = Some(title.start_sector);

            let Ok(detail_id) = self.insert(&record) else {
                continue;
            };
            self.check_for_captions(path, detail_id);

            let ordinal = placement.first_object + title.index;
            let primary = BrowseObject {
                object_id: placement.primary_id(ordinal),
                parent_id: format!("{}{}", placement.browse_dir_id, placement.parent_id),
                ref_id: None,
                class: placement.class.clone(),
                detail_id,
                name: name.clone().unwrap_or_default(),
            };
            let reference = BrowseObject {
                object_id: placement.reference_id(ordinal),
                parent_id: format!("{}{}", placement.base, placement.parent_id),
                ref_id: Some(primary.object_id.clone()),
                class: placement.class.clone(),
                detail_id,
                name: name.unwrap_or_default(),
            };
            for object in [&primary, &reference] {
                if let Err(e) = self.catalog().insert_object(object) {
                    tracing::warn!("Error inserting object {}: {}", object.object_id, e);
                }
            }
            ids.push(detail_id);
        }
        tracing::info!("Added {} titles of disc {:?}", ids.len(), path);
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::catalog::MemoryCatalog;
    use crate::tests::fixtures::{builder, disc_source, FakeDiscReader, FakeTitleSet, Fakes};

    fn placement() -> DiscPlacement {
        DiscPlacement {
            browse_dir_id: "64".into(),
            base: "2$8".into(),
            class: "item.videoItem".into(),
            parent_id: "$3".into(),
            first_object: 10,
        }
    }

    #[test]
    fn test_disc_dir_and_title() {
        let ifo = Path::new("/media/Movie/VIDEO_TS/VIDEO_TS.IFO");
        assert_eq!(disc_dir(ifo), PathBuf::from("/media/Movie/VIDEO_TS"));
        assert_eq!(disc_title(ifo).as_deref(), Some("Movie"));
        assert_eq!(
            disc_title(Path::new("/media/rip/VIDEO_TS.IFO")).as_deref(),
            Some("media - rip - VIDEO_TS")
        );
    }

    #[test]
    fn test_disc_title_falls_back_to_disc_dir() {
        let ifo = Path::new("/VIDEO_TS/VIDEO_TS.IFO");
        assert_eq!(disc_title(ifo).as_deref(), Some("VIDEO_TS"));
        assert_eq!(disc_title(Path::new("/")), None);
    }

    #[test]
    fn test_read_titles_skips_unusable() {
        let reader = FakeDiscReader::new(vec![FakeTitleSet::pal(0), FakeTitleSet::pal(5)])
            .with_titles(vec![
                TitleEntry { title_set: 1, vts_ttn: 1, chapters: 12 },
                TitleEntry { title_set: 2, vts_ttn: 1, chapters: 1 },
                TitleEntry { title_set: 3, vts_ttn: 1, chapters: 1 },
            ]);
        let titles = read_titles(&reader, Path::new("/disc")).unwrap();
        assert_eq!(titles.len(), 1);
        let t = &titles[0];
        assert_eq!(t.index, 0);
        assert_eq!(t.chapters, 12);
        assert_eq!((t.width, t.height), (720, 576));
        assert_eq!(t.audio, AudioProfileCategory::Ac3);
        assert_eq!(t.channels, 6);
        assert_eq!(t.size, u64::from(t.end_sector - t.start_sector) * DVD_BLOCK_LEN);
        assert_eq!(reader.open_handles.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_single_title_uses_vob_size() {
        let reader = FakeDiscReader::new(vec![FakeTitleSet::pal(0)]).with_vob_blocks(4096);
        let titles = read_titles(&reader, Path::new("/disc")).unwrap();
        assert_eq!(titles[0].size, 4096 * DVD_BLOCK_LEN);
    }

    #[test]
    fn test_abort_releases_handles() {
        let failing = FakeDiscReader::new(vec![FakeTitleSet::pal(0), FakeTitleSet::pal(0)])
            .failing_title_set(2);
        assert!(matches!(
            read_titles(&failing, Path::new("/disc")),
            Err(DiscError::OpenTitleSet { number: 2, .. })
        ));
        assert_eq!(failing.open_handles.load(Ordering::SeqCst), 0);
        assert!(failing.max_open_handles.load(Ordering::SeqCst) >= 3);

        let empty = FakeDiscReader::new(vec![FakeTitleSet::pal(0)]).with_titles(Vec::new());
        assert!(matches!(
            read_titles(&empty, Path::new("/disc")),
            Err(DiscError::NoTitles(_))
        ));
        assert_eq!(empty.open_handles.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_add_disc_objects() {
        let dir = TempDir::new().unwrap();
        let ifo = disc_source(&dir, "Holiday");
        let reader = FakeDiscReader::new(vec![FakeTitleSet::pal(0), FakeTitleSet::ntsc(6)]);
        let catalog = Arc::new(MemoryCatalog::new());
        let b = builder(&Fakes::default(), catalog.clone()).with_disc_reader(Arc::new(reader));

        let ids = b.add_disc(&ifo, &placement()).unwrap();
        assert_eq!(ids.len(), 2);

        let details = catalog.details();
        let first = &details[0].record;
        assert_eq!(first.title.as_deref(), Some("Holiday - 1"));
        assert_eq!(first.profile.as_deref(), Some("MPEG_PS_PAL"));
        assert_eq!(first.mime.as_deref(), Some("video/mpeg"));
        assert_eq!(first.sample_rate, Some(48000));
        assert!(first.start_sector.is_some());
        let second = &details[1].record;
        assert_eq!(second.title.as_deref(), Some("Holiday - 2 [DTS]"));
        assert_eq!(second.profile.as_deref(), Some("MPEG_PS_NTSC"));
        assert_eq!(second.resolution.as_deref(), Some("720x480"));

        let objects = catalog.objects();
        assert_eq!(objects.len(), 4);
        assert_eq!(objects[0].object_id, "64$3$A");
        assert_eq!(objects[0].parent_id, "64$3");
        assert_eq!(objects[1].object_id, "2$8$3$A");
        assert_eq!(objects[1].parent_id, "2$8$3");
        assert_eq!(objects[1].ref_id.as_deref(), Some("64$3$A"));
        assert_eq!(objects[2].object_id, "64$3$B");
        assert_eq!(objects[3].detail_id, ids[1]);
    }

    #[test]
    fn test_add_disc_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let ifo = disc_source(&dir, "Holiday");
        let scan = || {
            let reader = FakeDiscReader::new(vec![FakeTitleSet::pal(0), FakeTitleSet::pal(4)]);
            let catalog = Arc::new(MemoryCatalog::new());
            builder(&Fakes::default(), catalog.clone())
                .with_disc_reader(Arc::new(reader))
                .add_disc(&ifo, &placement())
                .unwrap();
            catalog
        };
        let (a, b) = (scan(), scan());
        assert_eq!(a.objects(), b.objects());
        let records = |c: &MemoryCatalog| c.details().into_iter().map(|r| r.record).collect::<Vec<_>>();
        assert_eq!(records(&a), records(&b));
    }

    #[test]
    fn test_single_usable_title_has_no_ordinal() {
        let dir = TempDir::new().unwrap();
        let ifo = disc_source(&dir, "Trip");
        // Second title set has SDDS audio and is skipped
        let reader = FakeDiscReader::new(vec![FakeTitleSet::pal(0), FakeTitleSet::pal(5)]);
        let catalog = Arc::new(MemoryCatalog::new());
        builder(&Fakes::default(), catalog.clone())
            .with_disc_reader(Arc::new(reader))
            .add_disc(&ifo, &placement())
            .unwrap();
        let details = catalog.details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].record.title.as_deref(), Some("Trip"));
        assert_eq!(catalog.objects().len(), 2);
    }

    #[test]
    fn test_add_disc_without_reader() {
        let dir = TempDir::new().unwrap();
        let ifo = disc_source(&dir, "Trip");
        let b = builder(&Fakes::default(), Arc::new(MemoryCatalog::new()));
        assert!(matches!(b.add_disc(&ifo, &placement()), Err(ScanError::Unsupported(_))));
    }
}
