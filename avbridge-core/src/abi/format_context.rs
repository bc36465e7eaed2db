//! `AVFormatContext`, owned by libavformat. Keyed on the avformat major.
//!
//! 57 widened `bit_rate` to 64 bits, 58 added `url` after `filename` and widened the probe
//! limits, 59 removed `filename`.

#![allow(dead_code, non_camel_case_types)]

use std::ffi::{c_char, c_int, c_uint, c_void};

use super::{c_array_string, c_string, copy_bytes, unsupported, VersionedView};
use crate::error::AbiError;
use crate::ffi::{AVDictionary, AVFormatContext, AVInputFormat, AVStream};
use crate::version::Library;

#[repr(C)]
pub(crate) struct AVFormatContext56 {
    pub av_class: *const c_void,
    pub iformat: *const AVInputFormat,
    pub oformat: *const c_void,
    pub priv_data: *mut c_void,
    pub pb: *mut c_void,
    pub ctx_flags: c_int,
    pub nb_streams: c_uint,
    pub streams: *mut *mut AVStream,
    pub filename: [c_char; 1024],
    pub start_time: i64,
    pub duration: i64,
    pub bit_rate: c_int,
    pub packet_size: c_uint,
    pub max_delay: c_int,
    pub flags: c_int,
    pub probesize: c_uint,
    pub max_analyze_duration: c_int,
    pub key: *const u8,
    pub keylen: c_int,
    pub nb_programs: c_uint,
    pub programs: *mut *mut c_void,
    pub video_codec_id: c_int,
    pub audio_codec_id: c_int,
    pub subtitle_codec_id: c_int,
    pub max_index_size: c_uint,
    pub max_picture_buffer: c_uint,
    pub nb_chapters: c_uint,
    pub chapters: *mut *mut c_void,
    pub metadata: *mut AVDictionary,
}

#[repr(C)]
pub(crate) struct AVFormatContext57 {
    pub av_class: *const c_void,
    pub iformat: *const AVInputFormat,
    pub oformat: *const c_void,
    pub priv_data: *mut c_void,
    pub pb: *mut c_void,
    pub ctx_flags: c_int,
    pub nb_streams: c_uint,
    pub streams: *mut *mut AVStream,
    pub filename: [c_char; 1024],
    pub start_time: i64,
    pub duration: i64,
    pub bit_rate: i64,
    pub packet_size: c_uint,
    pub max_delay: c_int,
    pub flags: c_int,
    pub probesize: c_uint,
    pub max_analyze_duration: c_int,
    pub key: *const u8,
    pub keylen: c_int,
    pub nb_programs: c_uint,
    pub programs: *mut *mut c_void,
    pub video_codec_id: c_int,
    pub audio_codec_id: c_int,
    pub subtitle_codec_id: c_int,
    pub max_index_size: c_uint,
    pub max_picture_buffer: c_uint,
    pub nb_chapters: c_uint,
    pub chapters: *mut *mut c_void,
    pub metadata: *mut AVDictionary,
}

#[repr(C)]
pub(crate) struct AVFormatContext58 {
    pub av_class: *const c_void,
    pub iformat: *const AVInputFormat,
    pub oformat: *const c_void,
    pub priv_data: *mut c_void,
    pub pb: *mut c_void,
    pub ctx_flags: c_int,
    pub nb_streams: c_uint,
    pub streams: *mut *mut AVStream,
    pub filename: [c_char; 1024],
    pub url: *mut c_char,
    pub start_time: i64,
    pub duration: i64,
    pub bit_rate: i64,
    pub packet_size: c_uint,
    pub max_delay: c_int,
    pub flags: c_int,
    pub probesize: i64,
    pub max_analyze_duration: i64,
    pub key: *const u8,
    pub keylen: c_int,
    pub nb_programs: c_uint,
    pub programs: *mut *mut c_void,
    pub video_codec_id: c_int,
    pub audio_codec_id: c_int,
    pub subtitle_codec_id: c_int,
    pub max_index_size: c_uint,
    pub max_picture_buffer: c_uint,
    pub nb_chapters: c_uint,
    pub chapters: *mut *mut c_void,
    pub metadata: *mut AVDictionary,
}

#[repr(C)]
pub(crate) struct AVFormatContext59_60 {
    pub av_class: *const c_void,
    pub iformat: *const AVInputFormat,
    pub oformat: *const c_void,
    pub priv_data: *mut c_void,
    pub pb: *mut c_void,
    pub ctx_flags: c_int,
    pub nb_streams: c_uint,
    pub streams: *mut *mut AVStream,
    pub url: *mut c_char,
    pub start_time: i64,
    pub duration: i64,
    pub bit_rate: i64,
    pub packet_size: c_uint,
    pub max_delay: c_int,
    pub flags: c_int,
    pub probesize: i64,
    pub max_analyze_duration: i64,
    pub key: *const u8,
    pub keylen: c_int,
    pub nb_programs: c_uint,
    pub programs: *mut *mut c_void,
    pub video_codec_id: c_int,
    pub audio_codec_id: c_int,
    pub subtitle_codec_id: c_int,
    pub max_index_size: c_uint,
    pub max_picture_buffer: c_uint,
    pub nb_chapters: c_uint,
    pub chapters: *mut *mut c_void,
    pub metadata: *mut AVDictionary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatContextFields {
    pub iformat: *const AVInputFormat,
    pub ctx_flags: i32,
    pub nb_streams: u32,
    pub streams: *mut *mut AVStream,
    /// `filename` before avformat 58, `url` after. Both name the opened input.
    pub url: String,
    pub start_time: i64,
    pub duration: i64,
    pub bit_rate: i64,
    pub packet_size: u32,
    pub max_delay: i32,
    pub flags: i32,
    pub probesize: i64,
    pub max_analyze_duration: i64,
    pub key: Vec<u8>,
    pub nb_programs: u32,
    pub video_codec_id: i32,
    pub audio_codec_id: i32,
    pub subtitle_codec_id: i32,
    pub max_index_size: u32,
    pub max_picture_buffer: u32,
    pub nb_chapters: u32,
    pub metadata: *mut AVDictionary,
}

pub type FormatContextView = dyn VersionedView<Native = AVFormatContext, Fields = FormatContextFields>;

struct FormatContext56;
struct FormatContext57;
struct FormatContext58;
struct FormatContext59_60;

static FORMAT_CONTEXT_56: FormatContext56 = FormatContext56;
static FORMAT_CONTEXT_57: FormatContext57 = FormatContext57;
static FORMAT_CONTEXT_58: FormatContext58 = FormatContext58;
static FORMAT_CONTEXT_59_60: FormatContext59_60 = FormatContext59_60;

pub fn format_context_view(avformat_major: u32) -> Result<&'static FormatContextView, AbiError> {
    match avformat_major {
        56 => Ok(&FORMAT_CONTEXT_56),
        57 => Ok(&FORMAT_CONTEXT_57),
        58 => Ok(&FORMAT_CONTEXT_58),
        59 | 60 => Ok(&FORMAT_CONTEXT_59_60),
        major => Err(unsupported("AVFormatContext", Library::AvFormat, major)),
    }
}

/// Every family names these fields the same; only widths differ.
macro_rules! read_fields {
    ($p:expr, $url:expr) => {{
        let p = $p;
        FormatContextFields {
            iformat: p.iformat,
            ctx_flags: p.ctx_flags,
            nb_streams: p.nb_streams,
            streams: p.streams,
            url: $url,
            start_time: p.start_time,
            duration: p.duration,
            bit_rate: p.bit_rate as i64,
            packet_size: p.packet_size,
            max_delay: p.max_delay,
            flags: p.flags,
            probesize: p.probesize as i64,
            max_analyze_duration: p.max_analyze_duration as i64,
            key: copy_bytes(p.key, p.keylen as i64),
            nb_programs: p.nb_programs,
            video_codec_id: p.video_codec_id,
            audio_codec_id: p.audio_codec_id,
            subtitle_codec_id: p.subtitle_codec_id,
            max_index_size: p.max_index_size,
            max_picture_buffer: p.max_picture_buffer,
            nb_chapters: p.nb_chapters,
            metadata: p.metadata,
        }
    }};
}

impl VersionedView for FormatContext56 {
    type Native = AVFormatContext;
    type Fields = FormatContextFields;

    fn family(&self) -> &'static str {
        "56"
    }

    unsafe fn read(&self, ptr: *const AVFormatContext) -> FormatContextFields {
        let p = &*(ptr as *const AVFormatContext56);
        read_fields!(p, c_array_string(&p.filename))
    }
}

impl VersionedView for FormatContext57 {
    type Native = AVFormatContext;
    type Fields = FormatContextFields;

    fn family(&self) -> &'static str {
        "57"
    }

    unsafe fn read(&self, ptr: *const AVFormatContext) -> FormatContextFields {
        let p = &*(ptr as *const AVFormatContext57);
        read_fields!(p, c_array_string(&p.filename))
    }
}

impl VersionedView for FormatContext58 {
    type Native = AVFormatContext;
    type Fields = FormatContextFields;

    fn family(&self) -> &'static str {
        "58"
    }

    unsafe fn read(&self, ptr: *const AVFormatContext) -> FormatContextFields {
        let p = &*(ptr as *const AVFormatContext58);
        // `filename` is deprecated in 58 and may be left empty by demuxers that set `url`.
        let url = if p.url.is_null() {
            c_array_string(&p.filename)
        } else {
            c_string(p.url)
        };
        read_fields!(p, url)
    }
}

impl VersionedView for FormatContext59_60 {
    type Native = AVFormatContext;
    type Fields = FormatContextFields;

    fn family(&self) -> &'static str {
        "59_60"
    }

    unsafe fn read(&self, ptr: *const AVFormatContext) -> FormatContextFields {
        let p = &*(ptr as *const AVFormatContext59_60);
        read_fields!(p, c_string(p.url))
    }
}
