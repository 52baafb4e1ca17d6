//! Transport-stream packet framing detection
//!
//! DLNA transport streams may prefix every 188-byte packet with a 4-byte
//! timestamp, giving 192-byte packets. The classifier needs to know which
//! layout a file uses and whether the timestamps are filled in.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// MPEG-TS sync byte
pub const SYNC_BYTE: u8 = 0x47;

/// Plain transport-stream packet length
pub const PACKET_LENGTH: usize = 188;

/// DLNA packet length (4-byte timestamp prefix)
pub const PACKET_LENGTH_DLNA: usize = 192;

/// Number of bytes inspected at the start of a file
pub const PROBE_WINDOW: usize = 3 * PACKET_LENGTH_DLNA;

/// Packet layout of a transport stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFraming {
    /// No recurring sync pattern found
    None,
    /// 188-byte packets, no timestamp prefix
    Ts188,
    /// 192-byte packets with a non-zero timestamp prefix
    Ts192Valid,
    /// 192-byte packets whose timestamp prefix is zero
    Ts192Empty,
}

impl PacketFraming {
    /// Packet size in bytes, 0 when no framing was found
    pub fn packet_size(&self) -> usize {
        match self {
            PacketFraming::None => 0,
            PacketFraming::Ts188 => PACKET_LENGTH,
            PacketFraming::Ts192Valid | PacketFraming::Ts192Empty => PACKET_LENGTH_DLNA,
        }
    }

    pub fn has_valid_timestamp(&self) -> bool {
        matches!(self, PacketFraming::Ts192Valid)
    }
}

/// Classify the framing of a byte window taken from the start of a file
pub fn detect_framing(buf: &[u8]) -> PacketFraming {
    let is_sync = |at: usize| buf.get(at) == Some(&SYNC_BYTE);

    for i in 0..PACKET_LENGTH_DLNA {
        if !is_sync(i) {
            continue;
        }
        if is_sync(i + PACKET_LENGTH_DLNA) && is_sync(i + 2 * PACKET_LENGTH_DLNA) {
            let prefix = &buf[i + PACKET_LENGTH..i + PACKET_LENGTH_DLNA];
            return if prefix.iter().all(|&b| b == 0) {
                PacketFraming::Ts192Empty
            } else {
                PacketFraming::Ts192Valid
            };
        }
        if is_sync(i + PACKET_LENGTH) && is_sync(i + 2 * PACKET_LENGTH) {
            return PacketFraming::Ts188;
        }
    }
    PacketFraming::None
}

/// Read the start of `path` and classify its framing.
///
/// A file that cannot be opened or read yields `PacketFraming::None`.
pub fn probe_packet_framing(path: &Path) -> PacketFraming {
    let mut buf = Vec::with_capacity(PROBE_WINDOW);
    let read = File::open(path).and_then(|f| f.take(PROBE_WINDOW as u64).read_to_end(&mut buf));
    match read {
        Ok(_) => detect_framing(&buf),
        Err(e) => {
            tracing::debug!("Cannot read {:?} for TS framing: {}", path, e);
            PacketFraming::None
        }
    }
}
