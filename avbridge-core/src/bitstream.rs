//! Packet-level bitstream helpers: payload format guessing, packet classification by stream and
//! the keyframe index used for seeking.

use serde::{Deserialize, Serialize};

/// NAL units larger than this are treated as a misread length prefix.
const MAX_PREFIXED_UNIT: u64 = 1_000_000_000;

// ============================================================================
// Packet Data Format
// ============================================================================

/// How the payload of a video packet is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketDataFormat {
    Unknown,
    /// Annex-B: units separated by `00 00 01` or `00 00 00 01` start codes.
    RawNal,
    /// ISO/IEC 14496-15: every unit preceded by its 32-bit big-endian size.
    Mp4,
    /// AV1 open bitstream units.
    Obu,
}

impl PacketDataFormat {
    /// Guesses the framing from one payload. A stream keeps its framing, so guessing from the
    /// first video packet is enough.
    pub fn guess(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }
        if has_start_code(data, 4) {
            Self::RawNal
        } else if is_length_prefixed(data) {
            Self::Mp4
        } else if is_obu_sequence(data) {
            Self::Obu
        } else if has_start_code(data, 3) {
            Self::RawNal
        } else {
            Self::Unknown
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::RawNal => "Annex-B",
            Self::Mp4 => "MP4",
            Self::Obu => "OBU",
        }
    }
}

fn has_start_code(data: &[u8], len: usize) -> bool {
    data.len() > len && data[..len - 1].iter().all(|b| *b == 0) && data[len - 1] == 1
}

fn is_length_prefixed(data: &[u8]) -> bool {
    let total = data.len() as u64;
    let mut pos: u64 = 0;
    while pos + 4 <= total {
        let at = pos as usize;
        let size = u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]) as u64;
        pos += 4;
        if size > MAX_PREFIXED_UNIT || pos + size > total {
            return false;
        }
        pos += size;
    }
    true
}

/// Walks OBU headers. Fails on a set forbidden bit, a reserved OBU type, a set reserved bit,
/// or a size that runs past the end.
fn is_obu_sequence(data: &[u8]) -> bool {
    let mut pos = 0usize;
    while pos + 2 <= data.len() {
        let header = data[pos];
        if header & 0x80 != 0 {
            return false;
        }
        let obu_type = (header >> 3) & 0x0F;
        if obu_type == 0 || (9..=14).contains(&obu_type) {
            return false;
        }
        let extension = header & 0x04 != 0;
        let has_size = header & 0x02 != 0;
        if header & 0x01 != 0 {
            return false;
        }

        let mut read = 1usize;
        if extension {
            match data.get(pos + read) {
                Some(ext) if ext & 0x07 == 0 => read += 1,
                _ => return false,
            }
        }

        let size = if has_size {
            match read_leb128(&data[pos + read..]) {
                Some((value, len)) => {
                    read += len;
                    value
                }
                None => return false,
            }
        } else {
            (data.len() - pos - read) as u64
        };

        let next = (pos + read) as u64 + size;
        if next > data.len() as u64 {
            return false;
        }
        pos = next as usize;
    }
    true
}

/// Unsigned LEB128 as used by AV1: at most eight bytes.
fn read_leb128(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, byte) in data.iter().take(8).enumerate() {
        value |= ((byte & 0x7F) as u64) << (i * 7);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

// ============================================================================
// Packet Type
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketType {
    Video,
    Audio,
    SubtitleDvb,
    Subtitle608,
    Other,
}

/// Stream indices of an input grouped by what their packets carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamIndices {
    pub video: Option<usize>,
    pub audio: Vec<usize>,
    pub subtitle_dvb: Vec<usize>,
    pub subtitle_608: Vec<usize>,
    pub subtitle_other: Vec<usize>,
}

impl StreamIndices {
    pub fn packet_type(&self, stream_index: i32) -> PacketType {
        let Ok(index) = usize::try_from(stream_index) else {
            return PacketType::Other;
        };
        if self.video == Some(index) {
            PacketType::Video
        } else if self.audio.contains(&index) {
            PacketType::Audio
        } else if self.subtitle_dvb.contains(&index) {
            PacketType::SubtitleDvb
        } else if self.subtitle_608.contains(&index) {
            PacketType::Subtitle608
        } else {
            PacketType::Other
        }
    }
}

// ============================================================================
// Keyframe Index
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Position of the frame among all video packets, in decode order.
    pub frame_number: u64,
    pub dts: i64,
}

/// Keyframes of the video stream, collected by one pass over all packets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyframeIndex {
    pub keyframes: Vec<Keyframe>,
    pub frame_count: u64,
}

impl KeyframeIndex {
    pub fn push(&mut self, is_key: bool, dts: i64) {
        if is_key {
            self.keyframes.push(Keyframe {
                frame_number: self.frame_count,
                dts,
            });
        }
        self.frame_count += 1;
    }

    /// The last keyframe at or before `frame_number`. Falls back to the first keyframe, since
    /// the start of the input is always seekable.
    pub fn closest_before(&self, frame_number: u64) -> Option<Keyframe> {
        let first = *self.keyframes.first()?;
        Some(
            self.keyframes
                .iter()
                .take_while(|k| k.frame_number <= frame_number)
                .last()
                .copied()
                .unwrap_or(first),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }
}
