use std::path::Path;

use log::warn;
use pcap::{Capture, Linktype, Offline};

use crate::error::{ExtractError, ExtractResult};

/// Link-layer framing of every packet in a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLayer {
    /// DLT_EN10MB
    Ethernet,
    /// BSD loopback: 4-byte address family, host order (NULL) or big-endian (LOOP)
    Null,
    /// Bare IP packet, no link header
    RawIp,
    /// Linux cooked capture v1 (16-byte header)
    LinuxSll,
    Unsupported(i32),
}

impl LinkLayer {
    pub fn from_dlt(dlt: i32) -> Self {
        match dlt {
            0 | 108 => LinkLayer::Null,
            1 => LinkLayer::Ethernet,
            // DLT_RAW differs across platforms; 101 and 228 are the file-format values
            12 | 14 | 101 | 228 => LinkLayer::RawIp,
            113 => LinkLayer::LinuxSll,
            other => LinkLayer::Unsupported(other),
        }
    }
}

/// One captured packet, borrowed from the source until the next read
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Capture timestamp in microseconds since epoch
    pub timestamp_us: i64,
    pub data: &'a [u8],
}

/// Sequential, non-restartable packet reader
pub trait PacketSource {
    fn link_layer(&self) -> LinkLayer;

    /// Returns None once the capture is exhausted or can no longer be read
    fn next_frame(&mut self) -> ExtractResult<Option<Frame<'_>>>;
}

/// Offline capture file read through libpcap (pcap and pcapng)
pub struct PcapSource {
    capture: Capture<Offline>,
    link: LinkLayer,
}

impl PcapSource {
    pub fn open<P: AsRef<Path>>(path: P) -> ExtractResult<Self> {
        let path = path.as_ref();
        let capture = Capture::from_file(path).map_err(|source| ExtractError::OpenCapture {
            path: path.to_path_buf(),
            source,
        })?;
        let Linktype(dlt) = capture.get_datalink();

        Ok(Self {
            capture,
            link: LinkLayer::from_dlt(dlt),
        })
    }
}

impl PacketSource for PcapSource {
    fn link_layer(&self) -> LinkLayer {
        self.link
    }

    fn next_frame(&mut self) -> ExtractResult<Option<Frame<'_>>> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                Ok(Some(Frame {
                    timestamp_us: ts.tv_sec as i64 * 1_000_000 + ts.tv_usec as i64,
                    data: packet.data,
                }))
            }
            Err(pcap::Error::NoMorePackets) => Ok(None),
            // Typically a record cut short by an interrupted capture; keep what was read
            Err(e) => {
                warn!("Capture ends early: {e}");
                Ok(None)
            }
        }
    }
}

/// In-memory capture, used to drive the pipeline in tests
#[cfg(test)]
pub struct MemorySource {
    link: LinkLayer,
    frames: Vec<Vec<u8>>,
    next: usize,
}

#[cfg(test)]
impl MemorySource {
    pub fn new(link: LinkLayer, frames: Vec<Vec<u8>>) -> Self {
        Self { link, frames, next: 0 }
    }
}

#[cfg(test)]
impl PacketSource for MemorySource {
    fn link_layer(&self) -> LinkLayer {
        self.link
    }

    fn next_frame(&mut self) -> ExtractResult<Option<Frame<'_>>> {
        let idx = self.next;
        if idx >= self.frames.len() {
            return Ok(None);
        }
        self.next += 1;
        Ok(Some(Frame {
            timestamp_us: 1_700_000_000_000_000 + idx as i64 * 1_000,
            data: &self.frames[idx],
        }))
    }
}
