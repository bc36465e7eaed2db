//! Native FFmpeg types and constants that are stable across every supported major version.
//!
//! Nothing in here depends on a struct layout. Layout-dependent definitions live in
//! [`crate::abi`], one shadow struct per version family.

use serde::{Deserialize, Serialize};
use std::ffi::{c_char, c_int, c_void};
use std::fmt;

// ============================================================================
// Opaque native objects
// ============================================================================

macro_rules! opaque {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            pub struct $name {
                _private: [u8; 0],
            }
        )*
    };
}

opaque!(
    AVFormatContext,
    AVInputFormat,
    AVStream,
    AVCodec,
    AVCodecContext,
    AVCodecParameters,
    AVPacket,
    AVFrame,
    AVFrameSideData,
    AVDictionary,
    AVPixFmtDescriptor,
);

/// `AVDictionaryEntry` has had the same two-pointer layout in every release.
#[repr(C)]
#[derive(Debug)]
pub struct AVDictionaryEntry {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AVRational {
    pub num: c_int,
    pub den: c_int,
}

impl AVRational {
    pub const fn new(num: c_int, den: c_int) -> Self {
        Self { num, den }
    }

    pub fn is_valid(&self) -> bool {
        self.num != 0 && self.den != 0
    }

    pub fn as_f64(&self) -> Option<f64> {
        if self.den == 0 {
            None
        } else {
            Some(self.num as f64 / self.den as f64)
        }
    }
}

impl fmt::Display for AVRational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Native log callback: `void (*)(void *avcl, int level, const char *fmt, va_list vl)`.
///
/// `va_list` is passed as a pointer-sized value on every target we load on.
pub type AvLogCallback = unsafe extern "C" fn(*mut c_void, c_int, *const c_char, *mut c_void);

// ============================================================================
// Return codes
// ============================================================================

const fn fferrtag(a: u8, b: u8, c: u8, d: u8) -> c_int {
    -((a as c_int) | ((b as c_int) << 8) | ((c as c_int) << 16) | ((d as c_int) << 24))
}

pub const AVERROR_EOF: c_int = fferrtag(b'E', b'O', b'F', b' ');
pub const AVERROR_DECODER_NOT_FOUND: c_int = fferrtag(0xF8, b'D', b'E', b'C');
pub const AVERROR_INVALIDDATA: c_int = fferrtag(b'I', b'N', b'D', b'A');

/// `AVERROR(EAGAIN)` on Linux and Windows builds.
pub const AVERROR_EAGAIN: c_int = -11;
/// `AVERROR(EAGAIN)` on macOS builds.
pub const AVERROR_EAGAIN_DARWIN: c_int = -35;

/// True for the "output not available in this state, send more input" code.
pub fn is_again(code: c_int) -> bool {
    code == AVERROR_EAGAIN || code == AVERROR_EAGAIN_DARWIN
}

pub fn is_eof(code: c_int) -> bool {
    code == AVERROR_EOF
}

/// Short name for a native return code, for log lines.
pub fn describe_error(code: c_int) -> String {
    match code {
        0 => "success".to_string(),
        c if is_again(c) => "EAGAIN".to_string(),
        AVERROR_EOF => "EOF".to_string(),
        AVERROR_DECODER_NOT_FOUND => "decoder not found".to_string(),
        AVERROR_INVALIDDATA => "invalid data".to_string(),
        c => format!("error {}", c),
    }
}

// ============================================================================
// Constants
// ============================================================================

pub const AV_NOPTS_VALUE: i64 = i64::MIN;
pub const AV_TIME_BASE: c_int = 1_000_000;
pub const AV_TIME_BASE_Q: AVRational = AVRational::new(1, AV_TIME_BASE);
pub const AV_NUM_DATA_POINTERS: usize = 8;
/// Extra zeroed bytes the decoders may over-read past extradata and packet payloads.
pub const AV_INPUT_BUFFER_PADDING_SIZE: usize = 64;

pub const AVSEEK_FLAG_BACKWARD: c_int = 1;

pub const AV_PKT_FLAG_KEY: c_int = 0x0001;
pub const AV_PKT_FLAG_CORRUPT: c_int = 0x0002;
pub const AV_PKT_FLAG_DISCARD: c_int = 0x0004;

pub const AV_DICT_MATCH_CASE: c_int = 1;
pub const AV_DICT_IGNORE_SUFFIX: c_int = 2;

pub const AVFMTCTX_NOHEADER: c_int = 0x0001;
pub const AVFMTCTX_UNSEEKABLE: c_int = 0x0002;

pub const AV_CODEC_ID_NONE: c_int = 0;
pub const AV_PIX_FMT_NONE: c_int = -1;

pub const AV_LOG_QUIET: c_int = -8;
pub const AV_LOG_PANIC: c_int = 0;
pub const AV_LOG_FATAL: c_int = 8;
pub const AV_LOG_ERROR: c_int = 16;
pub const AV_LOG_WARNING: c_int = 24;
pub const AV_LOG_INFO: c_int = 32;
pub const AV_LOG_VERBOSE: c_int = 40;
pub const AV_LOG_DEBUG: c_int = 48;
pub const AV_LOG_TRACE: c_int = 56;

pub const AV_FRAME_DATA_MOTION_VECTORS: c_int = 8;

pub const AVCOL_SPC_RGB: c_int = 0;
pub const AVCOL_SPC_BT709: c_int = 1;
pub const AVCOL_SPC_UNSPECIFIED: c_int = 2;
pub const AVCOL_SPC_BT470BG: c_int = 5;
pub const AVCOL_SPC_SMPTE170M: c_int = 6;
pub const AVCOL_SPC_BT2020_NCL: c_int = 9;
pub const AVCOL_SPC_BT2020_CL: c_int = 10;

// ============================================================================
// Enumerations
// ============================================================================

/// `enum AVMediaType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Unknown,
    Video,
    Audio,
    Data,
    Subtitle,
    Attachment,
}

impl MediaType {
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            0 => Self::Video,
            1 => Self::Audio,
            2 => Self::Data,
            3 => Self::Subtitle,
            4 => Self::Attachment,
            _ => Self::Unknown,
        }
    }

    pub fn to_raw(self) -> c_int {
        match self {
            Self::Unknown => -1,
            Self::Video => 0,
            Self::Audio => 1,
            Self::Data => 2,
            Self::Subtitle => 3,
            Self::Attachment => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Data => "Data",
            Self::Subtitle => "Subtitle",
            Self::Attachment => "Attachment",
        }
    }
}

/// `enum AVPictureType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PictureType {
    None,
    I,
    P,
    B,
    S,
    Si,
    Sp,
    Bi,
}

impl PictureType {
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            1 => Self::I,
            2 => Self::P,
            3 => Self::B,
            4 => Self::S,
            5 => Self::Si,
            6 => Self::Sp,
            7 => Self::Bi,
            _ => Self::None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Self::None => '?',
            Self::I => 'I',
            Self::P => 'P',
            Self::B => 'B',
            Self::S => 'S',
            Self::Si => 'i',
            Self::Sp => 'p',
            Self::Bi => 'b',
        }
    }
}

/// Stream disposition bits, in the order of `AV_DISPOSITION_*`.
pub const DISPOSITION_NAMES: [&str; 16] = [
    "Default",
    "Dub",
    "Original",
    "Comment",
    "Lyrics",
    "Karaoke",
    "Forced",
    "Hearing_Impaired",
    "Visual_Impaired",
    "Clean_Effects",
    "Attached_Pic",
    "Timed_Thumbnails",
    "Captions",
    "Descriptions",
    "Metadata",
    "Dependent",
];

pub fn disposition_names(disposition: c_int) -> Vec<&'static str> {
    DISPOSITION_NAMES
        .iter()
        .enumerate()
        .filter(|(bit, _)| disposition & (1 << bit) != 0)
        .map(|(_, name)| *name)
        .collect()
}

/// Packs the `AV_VERSION_INT` layout: major in bits 16.., minor in 8..16, micro in 0..8.
pub const fn av_version_int(major: u32, minor: u32, micro: u32) -> u32 {
    (major << 16) | (minor << 8) | micro
}

/// Formats a timestamp in `time_base` units as `h:mm:ss.mmm`.
pub fn format_timestamp(ts: i64, time_base: AVRational) -> String {
    if ts == AV_NOPTS_VALUE {
        return "none".to_string();
    }
    let seconds = match time_base.as_f64() {
        Some(tb) => ts as f64 * tb,
        None => return format!("{} (no time base)", ts),
    };
    let negative = seconds < 0.0;
    let total_ms = (seconds.abs() * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let ms = total_ms % 1000;
    format!(
        "{}{}:{:02}:{:02}.{:03}",
        if negative { "-" } else { "" },
        hours,
        minutes,
        secs,
        ms
    )
}

// ============================================================================
// Tests
// ============================================================================
