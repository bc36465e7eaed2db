//! `AVFrame`, owned by libavutil. Keyed on the avutil major.

#![allow(dead_code, non_camel_case_types)]

use std::ffi::{c_int, c_void};

use super::{unsupported, VersionedView};
use crate::error::AbiError;
use crate::ffi::{AVDictionary, AVFrame, AVFrameSideData, AVRational, AV_NUM_DATA_POINTERS};
use crate::version::Library;

#[repr(C)]
pub(crate) struct AVFrame54 {
    pub data: [*mut u8; AV_NUM_DATA_POINTERS],
    pub linesize: [c_int; AV_NUM_DATA_POINTERS],
    pub extended_data: *mut *mut u8,
    pub width: c_int,
    pub height: c_int,
    pub nb_samples: c_int,
    pub format: c_int,
    pub key_frame: c_int,
    pub pict_type: c_int,
    pub base: [*mut u8; AV_NUM_DATA_POINTERS],
    pub sample_aspect_ratio: AVRational,
    pub pts: i64,
    pub pkt_pts: i64,
    pub pkt_dts: i64,
    pub coded_picture_number: c_int,
    pub display_picture_number: c_int,
    pub quality: c_int,
}

#[repr(C)]
pub(crate) struct AVFrame55_56 {
    pub data: [*mut u8; AV_NUM_DATA_POINTERS],
    pub linesize: [c_int; AV_NUM_DATA_POINTERS],
    pub extended_data: *mut *mut u8,
    pub width: c_int,
    pub height: c_int,
    pub nb_samples: c_int,
    pub format: c_int,
    pub key_frame: c_int,
    pub pict_type: c_int,
    pub sample_aspect_ratio: AVRational,
    pub pts: i64,
    pub pkt_pts: i64,
    pub pkt_dts: i64,
    pub coded_picture_number: c_int,
    pub display_picture_number: c_int,
    pub quality: c_int,
}

#[repr(C)]
pub(crate) struct AVFrame57_58 {
    pub data: [*mut u8; AV_NUM_DATA_POINTERS],
    pub linesize: [c_int; AV_NUM_DATA_POINTERS],
    pub extended_data: *mut *mut u8,
    pub width: c_int,
    pub height: c_int,
    pub nb_samples: c_int,
    pub format: c_int,
    pub key_frame: c_int,
    pub pict_type: c_int,
    pub sample_aspect_ratio: AVRational,
    pub pts: i64,
    pub pkt_dts: i64,
    pub time_base: AVRational,
    pub coded_picture_number: c_int,
    pub display_picture_number: c_int,
    pub quality: c_int,
    pub opaque: *mut c_void,
    pub repeat_pict: c_int,
    pub interlaced_frame: c_int,
    pub top_field_first: c_int,
    pub palette_has_changed: c_int,
    pub reordered_opaque: i64,
    pub sample_rate: c_int,
    pub channel_layout: u64,
    pub buf: [*mut c_void; AV_NUM_DATA_POINTERS],
    pub extended_buf: *mut *mut c_void,
    pub nb_extended_buf: c_int,
    pub side_data: *mut *mut AVFrameSideData,
    pub nb_side_data: c_int,
    pub flags: c_int,
    pub color_range: c_int,
    pub color_primaries: c_int,
    pub color_trc: c_int,
    pub colorspace: c_int,
    pub chroma_location: c_int,
    pub best_effort_timestamp: i64,
    pub pkt_pos: i64,
    pub pkt_duration: i64,
    pub metadata: *mut AVDictionary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameFields {
    pub data: [*mut u8; AV_NUM_DATA_POINTERS],
    pub linesize: [i32; AV_NUM_DATA_POINTERS],
    pub width: i32,
    pub height: i32,
    pub nb_samples: i32,
    pub format: i32,
    pub key_frame: i32,
    pub pict_type: i32,
    pub sample_aspect_ratio: AVRational,
    pub pts: i64,
    /// Removed from the struct in avutil 57.
    pub pkt_pts: Option<i64>,
    pub pkt_dts: i64,
    /// From avutil 57.
    pub time_base: Option<AVRational>,
    pub coded_picture_number: i32,
    pub display_picture_number: i32,
    pub quality: i32,
    /// From avutil 57; older frames carry metadata behind `av_frame_get_metadata`.
    pub metadata: Option<*mut AVDictionary>,
    pub nb_side_data: Option<i32>,
    pub colorspace: Option<i32>,
    pub color_range: Option<i32>,
    pub best_effort_timestamp: Option<i64>,
}

pub type FrameView = dyn VersionedView<Native = AVFrame, Fields = FrameFields>;

struct Frame54;
struct Frame55_56;
struct Frame57_58;

static FRAME_54: Frame54 = Frame54;
static FRAME_55_56: Frame55_56 = Frame55_56;
static FRAME_57_58: Frame57_58 = Frame57_58;

pub fn frame_view(avutil_major: u32) -> Result<&'static FrameView, AbiError> {
    match avutil_major {
        54 => Ok(&FRAME_54),
        55 | 56 => Ok(&FRAME_55_56),
        57 | 58 => Ok(&FRAME_57_58),
        major => Err(unsupported("AVFrame", Library::AvUtil, major)),
    }
}

macro_rules! read_legacy {
    ($p:expr) => {{
        let p = $p;
        FrameFields {
            data: p.data,
            linesize: p.linesize,
            width: p.width,
            height: p.height,
            nb_samples: p.nb_samples,
            format: p.format,
            key_frame: p.key_frame,
            pict_type: p.pict_type,
            sample_aspect_ratio: p.sample_aspect_ratio,
            pts: p.pts,
            pkt_pts: Some(p.pkt_pts),
            pkt_dts: p.pkt_dts,
            time_base: None,
            coded_picture_number: p.coded_picture_number,
            display_picture_number: p.display_picture_number,
            quality: p.quality,
            metadata: None,
            nb_side_data: None,
            colorspace: None,
            color_range: None,
            best_effort_timestamp: None,
        }
    }};
}

impl VersionedView for Frame54 {
    type Native = AVFrame;
    type Fields = FrameFields;

    fn family(&self) -> &'static str {
        "54"
    }

    unsafe fn read(&self, ptr: *const AVFrame) -> FrameFields {
        read_legacy!(&*(ptr as *const AVFrame54))
    }
}

impl VersionedView for Frame55_56 {
    type Native = AVFrame;
    type Fields = FrameFields;

    fn family(&self) -> &'static str {
        "55_56"
    }

    unsafe fn read(&self, ptr: *const AVFrame) -> FrameFields {
        read_legacy!(&*(ptr as *const AVFrame55_56))
    }
}

impl VersionedView for Frame57_58 {
    type Native = AVFrame;
    type Fields = FrameFields;

    fn family(&self) -> &'static str {
        "57_58"
    }

    unsafe fn read(&self, ptr: *const AVFrame) -> FrameFields {
        let p = &*(ptr as *const AVFrame57_58);
        FrameFields {
            data: p.data,
            linesize: p.linesize,
            width: p.width,
            height: p.height,
            nb_samples: p.nb_samples,
            format: p.format,
            key_frame: p.key_frame,
            pict_type: p.pict_type,
            sample_aspect_ratio: p.sample_aspect_ratio,
            pts: p.pts,
            pkt_pts: None,
            pkt_dts: p.pkt_dts,
            time_base: Some(p.time_base),
            coded_picture_number: p.coded_picture_number,
            display_picture_number: p.display_picture_number,
            quality: p.quality,
            metadata: Some(p.metadata),
            nb_side_data: Some(p.nb_side_data),
            colorspace: Some(p.colorspace),
            color_range: Some(p.color_range),
            best_effort_timestamp: Some(p.best_effort_timestamp),
        }
    }
}
