//! DVD structure collaborators
//!
//! A `DiscReader` opens a `VIDEO_TS` directory. The returned handles borrow
//! the disc and release their resources when dropped.

use std::path::Path;

use crate::error::DiscError;

/// Sector (logical block) size of a DVD
pub const DVD_BLOCK_LEN: u64 = 2048;

/// Frame rate by the top two bits of the BCD frame byte
const FRAMES_PER_SECOND: [Option<f64>; 4] = [None, Some(25.0), None, Some(29.97)];

/// Opens DVD structures
pub trait DiscReader: Send + Sync {
    /// Open the disc rooted at `dir` (the directory holding the IFO files)
    fn open(&self, dir: &Path) -> Result<Box<dyn Disc>, DiscError>;
}

/// An open disc
pub trait Disc {
    /// Open the video manager (`VIDEO_TS.IFO`)
    fn open_manager(&self) -> Result<Box<dyn ManagerIfo + '_>, DiscError>;

    /// Open title set `number` (1-based, `VTS_nn_0.IFO`)
    fn open_title_set(&self, number: u32) -> Result<Box<dyn TitleSetIfo + '_>, DiscError>;

    /// Size of the title VOBs of a title set, in blocks
    fn title_vobs_blocks(&self, title_set: u32) -> Result<u64, DiscError>;
}

/// Video manager information
pub trait ManagerIfo {
    /// Number of title sets on the disc
    fn title_set_count(&self) -> u32;

    /// Title search pointer table
    fn titles(&self) -> &[TitleEntry];
}

/// Title set information
pub trait TitleSetIfo {
    /// Video and audio attributes, `None` when the IFO has no attribute table
    fn attributes(&self) -> Option<&TitleSetAttributes>;

    /// Program chain number of the first part of title `vts_ttn` (1-based)
    fn first_part_pgcn(&self, vts_ttn: u32) -> Option<u32>;

    /// Program chain `pgcn` (1-based)
    fn program_chain(&self, pgcn: u32) -> Option<&ProgramChain>;
}

/// One entry of the manager's title table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleEntry {
    /// Title set holding this title (1-based)
    pub title_set: u32,
    /// Title number inside the title set (1-based)
    pub vts_ttn: u32,
    /// Number of parts (chapters)
    pub chapters: u32,
}

/// BCD encoded playback time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DvdTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Top two bits: frame rate code. Low six bits: BCD frame count.
    pub frame_u: u8,
}

fn bcd(v: u8) -> u64 {
    u64::from(v >> 4) * 10 + u64::from(v & 0x0f)
}

impl DvdTime {
    pub fn frame_rate(&self) -> Option<f64> {
        FRAMES_PER_SECOND[usize::from(self.frame_u >> 6)]
    }

    /// Playback time in milliseconds. Frames count only when the frame rate
    /// code is known.
    pub fn to_millis(&self) -> u64 {
        let mut ms = bcd(self.hour) * 3_600_000 + bcd(self.minute) * 60_000 + bcd(self.second) * 1000;
        if let Some(fps) = self.frame_rate() {
            let frames = bcd(self.frame_u & 0x3f);
            ms += (frames as f64 * 1000.0 / fps) as u64;
        }
        ms
    }
}

/// Physical sector range of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPlayback {
    pub first_sector: u32,
    pub last_sector: u32,
}

/// Program chain: playback order of a title
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramChain {
    pub playback_time: DvdTime,
    /// Entry cell of each program (1-based cell numbers)
    pub program_map: Vec<u32>,
    pub cells: Vec<CellPlayback>,
}

impl ProgramChain {
    /// First sector of the first program and last sector of the last cell
    pub fn sector_range(&self) -> Option<(u32, u32)> {
        let start_cell = *self.program_map.first()?;
        let start = self.cells.get(start_cell.checked_sub(1)? as usize)?;
        let end = self.cells.last()?;
        Some((start.first_sector, end.last_sector))
    }
}

/// Video attributes of a title set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoAttributes {
    /// 0 = NTSC, 1 = PAL
    pub video_format: u8,
    /// 0 = 720, 1 = 704, 2 = 352, 3 = 352 pixels wide
    pub picture_size: u8,
}

impl VideoAttributes {
    const WIDTH: [u32; 4] = [720, 704, 352, 352];
    const HEIGHT: [u32; 4] = [480, 576, 0, 576];

    pub fn is_pal(&self) -> bool {
        self.video_format == 1
    }

    pub fn resolution(&self) -> (u32, u32) {
        (
            Self::WIDTH[usize::from(self.picture_size & 3)],
            Self::HEIGHT[usize::from(self.video_format & 3)],
        )
    }
}

/// Audio coding of a DVD audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DvdAudioFormat {
    Ac3,
    Mpeg1,
    Mpeg2,
    Lpcm,
    Sdds,
    Dts,
    Unknown(u8),
}

impl DvdAudioFormat {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => DvdAudioFormat::Ac3,
            2 => DvdAudioFormat::Mpeg1,
            3 => DvdAudioFormat::Mpeg2,
            4 => DvdAudioFormat::Lpcm,
            5 => DvdAudioFormat::Sdds,
            6 => DvdAudioFormat::Dts,
            other => DvdAudioFormat::Unknown(other),
        }
    }
}

/// Audio attributes of one title set audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioAttributes {
    pub audio_format: u8,
    /// Channel count minus one
    pub channels: u8,
}

impl AudioAttributes {
    pub fn format(&self) -> DvdAudioFormat {
        DvdAudioFormat::from_code(self.audio_format)
    }
}

/// Attribute table of a title set (`vtsi_mat`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleSetAttributes {
    pub video: VideoAttributes,
    pub audio: Vec<AudioAttributes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dvd_time() {
        let t = DvdTime {
            hour: 0x01,
            minute: 0x32,
            second: 0x10,
            frame_u: 0x40 | 0x12,
        };
        assert_eq!(t.frame_rate(), Some(25.0));
        // 1:32:10 plus 12 frames at 25 fps
        assert_eq!(t.to_millis(), 5_530_000 + 480);

        let ntsc = DvdTime {
            frame_u: 0xc0 | 0x15,
            ..Default::default()
        };
        assert_eq!(ntsc.to_millis(), (15.0 * 1000.0 / 29.97) as u64);

        let unknown_rate = DvdTime {
            second: 0x59,
            frame_u: 0x25,
            ..Default::default()
        };
        assert_eq!(unknown_rate.to_millis(), 59_000);
    }

    #[test]
    fn test_sector_range() {
        let pgc = ProgramChain {
            program_map: vec![2, 3],
            cells: vec![
                CellPlayback { first_sector: 0, last_sector: 9 },
                CellPlayback { first_sector: 10, last_sector: 99 },
                CellPlayback { first_sector: 100, last_sector: 499 },
            ],
            ..Default::default()
        };
        assert_eq!(pgc.sector_range(), Some((10, 499)));
        assert_eq!(ProgramChain::default().sector_range(), None);

        let bad_map = ProgramChain {
            program_map: vec![0],
            ..pgc
        };
        assert_eq!(bad_map.sector_range(), None);
    }

    #[test]
    fn test_video_attributes() {
        let pal = VideoAttributes { video_format: 1, picture_size: 0 };
        assert!(pal.is_pal());
        assert_eq!(pal.resolution(), (720, 576));
        let ntsc_half = VideoAttributes { video_format: 0, picture_size: 2 };
        assert_eq!(ntsc_half.resolution(), (352, 480));
    }

    #[test]
    fn test_audio_format_codes() {
        assert_eq!(DvdAudioFormat::from_code(0), DvdAudioFormat::Ac3);
        assert_eq!(DvdAudioFormat::from_code(6), DvdAudioFormat::Dts);
        assert_eq!(DvdAudioFormat::from_code(1), DvdAudioFormat::Unknown(1));
    }
}
