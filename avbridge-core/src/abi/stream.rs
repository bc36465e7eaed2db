//! `AVStream`, owned by libavformat. Keyed on the avformat major.
//!
//! The 57 generation kept `codecpar` behind a block of fields that were never public, so that
//! block is declared here in full; nothing in it is read.

#![allow(dead_code, non_camel_case_types)]

use std::ffi::{c_char, c_int, c_uint, c_void};

use super::packet::{AVPacket56, AVPacket57_58, AVPacket59_60};
use super::{unsupported, VersionedView};
use crate::error::AbiError;
use crate::ffi::{AVCodecContext, AVCodecParameters, AVDictionary, AVRational, AVStream};
use crate::version::Library;

/// `struct AVFrac`, removed from the public struct in 58.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct AVFrac {
    pub val: i64,
    pub num: i64,
    pub den: i64,
}

#[repr(C)]
pub(crate) struct AVStream56 {
    pub index: c_int,
    pub id: c_int,
    pub codec: *mut AVCodecContext,
    pub priv_data: *mut c_void,
    pub pts: AVFrac,
    pub time_base: AVRational,
    pub start_time: i64,
    pub duration: i64,
    pub nb_frames: i64,
    pub disposition: c_int,
    pub discard: c_int,
    pub sample_aspect_ratio: AVRational,
    pub metadata: *mut AVDictionary,
    pub avg_frame_rate: AVRational,
    pub attached_pic: AVPacket56,
    pub side_data: *mut c_void,
    pub nb_side_data: c_int,
    pub event_flags: c_int,
}

#[repr(C)]
pub(crate) struct AVProbeData57 {
    pub filename: *const c_char,
    pub buf: *mut u8,
    pub buf_size: c_int,
    pub mime_type: *const c_char,
}

const MAX_REORDER_DELAY: usize = 16;

#[repr(C)]
pub(crate) struct AVStream57 {
    pub index: c_int,
    pub id: c_int,
    pub codec: *mut AVCodecContext,
    pub priv_data: *mut c_void,
    pub pts: AVFrac,
    pub time_base: AVRational,
    pub start_time: i64,
    pub duration: i64,
    pub nb_frames: i64,
    pub disposition: c_int,
    pub discard: c_int,
    pub sample_aspect_ratio: AVRational,
    pub metadata: *mut AVDictionary,
    pub avg_frame_rate: AVRational,
    pub attached_pic: AVPacket57_58,
    pub side_data: *mut c_void,
    pub nb_side_data: c_int,
    pub event_flags: c_int,
    // Not public in 57, still in front of `codecpar`.
    pub info: *mut c_void,
    pub pts_wrap_bits: c_int,
    pub first_dts: i64,
    pub cur_dts: i64,
    pub last_ip_pts: i64,
    pub last_ip_duration: c_int,
    pub probe_packets: c_int,
    pub codec_info_nb_frames: c_int,
    pub need_parsing: c_int,
    pub parser: *mut c_void,
    pub last_in_packet_buffer: *mut c_void,
    pub probe_data: AVProbeData57,
    pub pts_buffer: [i64; MAX_REORDER_DELAY + 1],
    pub index_entries: *mut c_void,
    pub nb_index_entries: c_int,
    pub index_entries_allocated_size: c_uint,
    pub r_frame_rate: AVRational,
    pub stream_identifier: c_int,
    pub interleaver_chunk_size: i64,
    pub interleaver_chunk_duration: i64,
    pub request_probe: c_int,
    pub skip_to_keyframe: c_int,
    pub skip_samples: c_int,
    pub start_skip_samples: i64,
    pub first_discard_sample: i64,
    pub last_discard_sample: i64,
    pub nb_decoded_frames: c_int,
    pub mux_ts_offset: i64,
    pub pts_wrap_reference: i64,
    pub pts_wrap_behavior: c_int,
    pub update_initial_durations_done: c_int,
    pub pts_reorder_error: [i64; MAX_REORDER_DELAY + 1],
    pub pts_reorder_error_count: [u8; MAX_REORDER_DELAY + 1],
    pub last_dts_for_order_check: i64,
    pub dts_ordered: u8,
    pub dts_misordered: u8,
    pub inject_global_side_data: c_int,
    // Public again from here.
    pub recommended_encoder_configuration: *mut c_char,
    pub display_aspect_ratio: AVRational,
    pub priv_pts: *mut c_void,
    pub internal: *mut c_void,
    pub codecpar: *mut AVCodecParameters,
}

#[repr(C)]
pub(crate) struct AVStream58 {
    pub index: c_int,
    pub id: c_int,
    pub codec: *mut AVCodecContext,
    pub priv_data: *mut c_void,
    pub time_base: AVRational,
    pub start_time: i64,
    pub duration: i64,
    pub nb_frames: i64,
    pub disposition: c_int,
    pub discard: c_int,
    pub sample_aspect_ratio: AVRational,
    pub metadata: *mut AVDictionary,
    pub avg_frame_rate: AVRational,
    pub attached_pic: AVPacket57_58,
    pub side_data: *mut c_void,
    pub nb_side_data: c_int,
    pub event_flags: c_int,
    pub r_frame_rate: AVRational,
    pub recommended_encoder_configuration: *mut c_char,
    pub codecpar: *mut AVCodecParameters,
}

#[repr(C)]
pub(crate) struct AVStream59_60 {
    pub index: c_int,
    pub id: c_int,
    pub priv_data: *mut c_void,
    pub time_base: AVRational,
    pub start_time: i64,
    pub duration: i64,
    pub nb_frames: i64,
    pub disposition: c_int,
    pub discard: c_int,
    pub sample_aspect_ratio: AVRational,
    pub metadata: *mut AVDictionary,
    pub avg_frame_rate: AVRational,
    pub attached_pic: AVPacket59_60,
    pub side_data: *mut c_void,
    pub nb_side_data: c_int,
    pub event_flags: c_int,
    pub r_frame_rate: AVRational,
    pub codecpar: *mut AVCodecParameters,
    pub pts_wrap_bits: c_int,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFields {
    pub index: i32,
    pub id: i32,
    /// The stream's own codec context. Gone from avformat 59.
    pub codec: Option<*mut AVCodecContext>,
    pub time_base: AVRational,
    pub start_time: i64,
    pub duration: i64,
    pub nb_frames: i64,
    pub disposition: i32,
    pub discard: i32,
    pub sample_aspect_ratio: AVRational,
    pub metadata: *mut AVDictionary,
    pub avg_frame_rate: AVRational,
    /// Not declared by the 56 shadow.
    pub r_frame_rate: Option<AVRational>,
    pub nb_side_data: i32,
    pub event_flags: i32,
    /// From avformat 57.
    pub codecpar: Option<*mut AVCodecParameters>,
}

pub type StreamView = dyn VersionedView<Native = AVStream, Fields = StreamFields>;

struct Stream56;
struct Stream57;
struct Stream58;
struct Stream59_60;

static STREAM_56: Stream56 = Stream56;
static STREAM_57: Stream57 = Stream57;
static STREAM_58: Stream58 = Stream58;
static STREAM_59_60: Stream59_60 = Stream59_60;

pub fn stream_view(avformat_major: u32) -> Result<&'static StreamView, AbiError> {
    match avformat_major {
        56 => Ok(&STREAM_56),
        57 => Ok(&STREAM_57),
        58 => Ok(&STREAM_58),
        59 | 60 => Ok(&STREAM_59_60),
        major => Err(unsupported("AVStream", Library::AvFormat, major)),
    }
}

macro_rules! read_fields {
    ($p:expr, codec: $codec:expr, r_frame_rate: $rfr:expr, codecpar: $par:expr) => {{
        let p = $p;
        StreamFields {
            index: p.index,
            id: p.id,
            codec: $codec,
            time_base: p.time_base,
            start_time: p.start_time,
            duration: p.duration,
            nb_frames: p.nb_frames,
            disposition: p.disposition,
            discard: p.discard,
            sample_aspect_ratio: p.sample_aspect_ratio,
            metadata: p.metadata,
            avg_frame_rate: p.avg_frame_rate,
            r_frame_rate: $rfr,
            nb_side_data: p.nb_side_data,
            event_flags: p.event_flags,
            codecpar: $par,
        }
    }};
}

impl VersionedView for Stream56 {
    type Native = AVStream;
    type Fields = StreamFields;

    fn family(&self) -> &'static str {
        "56"
    }

    unsafe fn read(&self, ptr: *const AVStream) -> StreamFields {
        let p = &*(ptr as *const AVStream56);
        read_fields!(p, codec: Some(p.codec), r_frame_rate: None, codecpar: None)
    }
}

impl VersionedView for Stream57 {
    type Native = AVStream;
    type Fields = StreamFields;

    fn family(&self) -> &'static str {
        "57"
    }

    unsafe fn read(&self, ptr: *const AVStream) -> StreamFields {
        let p = &*(ptr as *const AVStream57);
        read_fields!(
            p,
            codec: Some(p.codec),
            r_frame_rate: Some(p.r_frame_rate),
            codecpar: Some(p.codecpar)
        )
    }
}

impl VersionedView for Stream58 {
    type Native = AVStream;
    type Fields = StreamFields;

    fn family(&self) -> &'static str {
        "58"
    }

    unsafe fn read(&self, ptr: *const AVStream) -> StreamFields {
        let p = &*(ptr as *const AVStream58);
        read_fields!(
            p,
            codec: Some(p.codec),
            r_frame_rate: Some(p.r_frame_rate),
            codecpar: Some(p.codecpar)
        )
    }
}

impl VersionedView for Stream59_60 {
    type Native = AVStream;
    type Fields = StreamFields;

    fn family(&self) -> &'static str {
        "59_60"
    }

    unsafe fn read(&self, ptr: *const AVStream) -> StreamFields {
        let p = &*(ptr as *const AVStream59_60);
        read_fields!(
            p,
            codec: None,
            r_frame_rate: Some(p.r_frame_rate),
            codecpar: Some(p.codecpar)
        )
    }
}
