//! `AVCodecParameters`, introduced in libavcodec 57. Keyed on the avcodec major.
//!
//! One family covers 57 through 60 for every field declared here.

#![allow(dead_code, non_camel_case_types)]

use std::ffi::{c_int, c_uint};

use super::{unsupported, VersionedView, VersionedWrite};
use crate::error::AbiError;
use crate::ffi::{AVCodecParameters, AVRational};
use crate::version::Library;

#[repr(C)]
pub(crate) struct AVCodecParameters57_60 {
    pub codec_type: c_int,
    pub codec_id: c_int,
    pub codec_tag: c_uint,
    pub extradata: *mut u8,
    pub extradata_size: c_int,
    pub format: c_int,
    pub bit_rate: i64,
    pub bits_per_coded_sample: c_int,
    pub bits_per_raw_sample: c_int,
    pub profile: c_int,
    pub level: c_int,
    pub width: c_int,
    pub height: c_int,
    pub sample_aspect_ratio: AVRational,
    pub field_order: c_int,
    pub color_range: c_int,
    pub color_primaries: c_int,
    pub color_trc: c_int,
    pub color_space: c_int,
    pub chroma_location: c_int,
    pub video_delay: c_int,
}

/// Codec parameters. Every field is writable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecParametersFields {
    pub codec_type: i32,
    pub codec_id: i32,
    pub codec_tag: u32,
    pub extradata: *mut u8,
    pub extradata_size: i32,
    /// Pixel format for video, sample format for audio.
    pub format: i32,
    pub bit_rate: i64,
    pub bits_per_coded_sample: i32,
    pub bits_per_raw_sample: i32,
    pub profile: i32,
    pub level: i32,
    pub width: i32,
    pub height: i32,
    pub sample_aspect_ratio: AVRational,
    pub field_order: i32,
    pub color_range: i32,
    pub color_primaries: i32,
    pub color_trc: i32,
    pub color_space: i32,
    pub chroma_location: i32,
    pub video_delay: i32,
}

impl CodecParametersFields {
    /// The values `avcodec_parameters_alloc` leaves behind, with a 1:1 aspect ratio.
    pub fn cleared() -> Self {
        Self {
            codec_type: crate::ffi::MediaType::Unknown.to_raw(),
            codec_id: crate::ffi::AV_CODEC_ID_NONE,
            codec_tag: 0,
            extradata: std::ptr::null_mut(),
            extradata_size: 0,
            format: -1,
            bit_rate: 0,
            bits_per_coded_sample: 0,
            bits_per_raw_sample: 0,
            profile: 0,
            level: 0,
            width: 0,
            height: 0,
            sample_aspect_ratio: AVRational::new(1, 1),
            field_order: 0,
            color_range: 0,
            color_primaries: 2,
            color_trc: 2,
            color_space: crate::ffi::AVCOL_SPC_UNSPECIFIED,
            chroma_location: 0,
            video_delay: 0,
        }
    }
}

pub type CodecParametersView =
    dyn VersionedWrite<Native = AVCodecParameters, Fields = CodecParametersFields>;

struct CodecParameters57_60;

static CODEC_PARAMETERS_57_60: CodecParameters57_60 = CodecParameters57_60;

pub fn codec_parameters_view(
    avcodec_major: u32,
) -> Result<&'static CodecParametersView, AbiError> {
    match avcodec_major {
        57..=60 => Ok(&CODEC_PARAMETERS_57_60),
        major => Err(unsupported("AVCodecParameters", Library::AvCodec, major)),
    }
}

impl VersionedView for CodecParameters57_60 {
    type Native = AVCodecParameters;
    type Fields = CodecParametersFields;

    fn family(&self) -> &'static str {
        "57_60"
    }

    unsafe fn read(&self, ptr: *const AVCodecParameters) -> CodecParametersFields {
        let p = &*(ptr as *const AVCodecParameters57_60);
        CodecParametersFields {
            codec_type: p.codec_type,
            codec_id: p.codec_id,
            codec_tag: p.codec_tag,
            extradata: p.extradata,
            extradata_size: p.extradata_size,
            format: p.format,
            bit_rate: p.bit_rate,
            bits_per_coded_sample: p.bits_per_coded_sample,
            bits_per_raw_sample: p.bits_per_raw_sample,
            profile: p.profile,
            level: p.level,
            width: p.width,
            height: p.height,
            sample_aspect_ratio: p.sample_aspect_ratio,
            field_order: p.field_order,
            color_range: p.color_range,
            color_primaries: p.color_primaries,
            color_trc: p.color_trc,
            color_space: p.color_space,
            chroma_location: p.chroma_location,
            video_delay: p.video_delay,
        }
    }
}

impl VersionedWrite for CodecParameters57_60 {
    unsafe fn write(&self, ptr: *mut AVCodecParameters, f: &CodecParametersFields) {
        let p = &mut *(ptr as *mut AVCodecParameters57_60);
        p.codec_type = f.codec_type;
        p.codec_id = f.codec_id;
        p.codec_tag = f.codec_tag;
        p.extradata = f.extradata;
        p.extradata_size = f.extradata_size;
        p.format = f.format;
        p.bit_rate = f.bit_rate;
        p.bits_per_coded_sample = f.bits_per_coded_sample;
        p.bits_per_raw_sample = f.bits_per_raw_sample;
        p.profile = f.profile;
        p.level = f.level;
        p.width = f.width;
        p.height = f.height;
        p.sample_aspect_ratio = f.sample_aspect_ratio;
        p.field_order = f.field_order;
        p.color_range = f.color_range;
        p.color_primaries = f.color_primaries;
        p.color_trc = f.color_trc;
        p.color_space = f.color_space;
        p.chroma_location = f.chroma_location;
        p.video_delay = f.video_delay;
    }
}
