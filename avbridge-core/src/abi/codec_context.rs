//! `AVCodecContext`, owned by libavcodec. Keyed on the avcodec major.
//!
//! Declared up to `chroma_sample_location` (and `slices` where it follows directly). 57 widened
//! `bit_rate`; 58 and 59 each dropped a batch of deprecated encoder fields from the middle.

#![allow(dead_code, non_camel_case_types)]

use std::ffi::{c_char, c_int, c_uint, c_void};

use super::{c_array_string, unsupported, VersionedView, VersionedWrite};
use crate::error::AbiError;
use crate::ffi::{AVCodec, AVCodecContext, AVRational};
use crate::version::Library;

#[repr(C)]
pub(crate) struct AVCodecContext56 {
    pub av_class: *const c_void,
    pub log_level_offset: c_int,
    pub codec_type: c_int,
    pub codec: *const AVCodec,
    pub codec_name: [c_char; 32],
    pub codec_id: c_int,
    pub codec_tag: c_uint,
    pub stream_codec_tag: c_uint,
    pub priv_data: *mut c_void,
    pub internal: *mut c_void,
    pub opaque: *mut c_void,
    pub bit_rate: c_int,
    pub bit_rate_tolerance: c_int,
    pub global_quality: c_int,
    pub compression_level: c_int,
    pub flags: c_int,
    pub flags2: c_int,
    pub extradata: *mut u8,
    pub extradata_size: c_int,
    pub time_base: AVRational,
    pub ticks_per_frame: c_int,
    pub delay: c_int,
    pub width: c_int,
    pub height: c_int,
    pub coded_width: c_int,
    pub coded_height: c_int,
    pub gop_size: c_int,
    pub pix_fmt: c_int,
    pub me_method: c_int,
    pub draw_horiz_band: *const c_void,
    pub get_format: *const c_void,
    pub max_b_frames: c_int,
    pub b_quant_factor: f32,
    pub rc_strategy: c_int,
    pub b_frame_strategy: c_int,
    pub b_quant_offset: f32,
    pub has_b_frames: c_int,
    pub mpeg_quant: c_int,
    pub i_quant_factor: f32,
    pub i_quant_offset: f32,
    pub lumi_masking: f32,
    pub temporal_cplx_masking: f32,
    pub spatial_cplx_masking: f32,
    pub p_masking: f32,
    pub dark_masking: f32,
    pub slice_count: c_int,
    pub prediction_method: c_int,
    pub slice_offset: *mut c_int,
    pub sample_aspect_ratio: AVRational,
    pub me_cmp: c_int,
    pub me_sub_cmp: c_int,
    pub mb_cmp: c_int,
    pub ildct_cmp: c_int,
    pub dia_size: c_int,
    pub last_predictor_count: c_int,
    pub pre_me: c_int,
    pub me_pre_cmp: c_int,
    pub pre_dia_size: c_int,
    pub me_subpel_quality: c_int,
    pub dtg_active_format: c_int,
    pub me_range: c_int,
    pub intra_quant_bias: c_int,
    pub inter_quant_bias: c_int,
    pub slice_flags: c_int,
    pub xvmc_acceleration: c_int,
    pub mb_decision: c_int,
    pub intra_matrix: *mut u16,
    pub inter_matrix: *mut u16,
    pub scenechange_threshold: c_int,
    pub noise_reduction: c_int,
    pub me_threshold: c_int,
    pub mb_threshold: c_int,
    pub intra_dc_precision: c_int,
    pub skip_top: c_int,
    pub skip_bottom: c_int,
    pub border_masking: f32,
    pub mb_lmin: c_int,
    pub mb_lmax: c_int,
    pub me_penalty_compensation: c_int,
    pub bidir_refine: c_int,
    pub brd_scale: c_int,
    pub keyint_min: c_int,
    pub refs: c_int,
    pub chromaoffset: c_int,
    pub scenechange_factor: c_int,
    pub mv0_threshold: c_int,
    pub b_sensitivity: c_int,
    pub color_primaries: c_int,
    pub color_trc: c_int,
    pub colorspace: c_int,
    pub color_range: c_int,
    pub chroma_sample_location: c_int,
}

/// Same as 56 apart from the 64-bit `bit_rate`.
#[repr(C)]
pub(crate) struct AVCodecContext57 {
    pub av_class: *const c_void,
    pub log_level_offset: c_int,
    pub codec_type: c_int,
    pub codec: *const AVCodec,
    pub codec_name: [c_char; 32],
    pub codec_id: c_int,
    pub codec_tag: c_uint,
    pub stream_codec_tag: c_uint,
    pub priv_data: *mut c_void,
    pub internal: *mut c_void,
    pub opaque: *mut c_void,
    pub bit_rate: i64,
    pub bit_rate_tolerance: c_int,
    pub global_quality: c_int,
    pub compression_level: c_int,
    pub flags: c_int,
    pub flags2: c_int,
    pub extradata: *mut u8,
    pub extradata_size: c_int,
    pub time_base: AVRational,
    pub ticks_per_frame: c_int,
    pub delay: c_int,
    pub width: c_int,
    pub height: c_int,
    pub coded_width: c_int,
    pub coded_height: c_int,
    pub gop_size: c_int,
    pub pix_fmt: c_int,
    pub me_method: c_int,
    pub draw_horiz_band: *const c_void,
    pub get_format: *const c_void,
    pub max_b_frames: c_int,
    pub b_quant_factor: f32,
    pub rc_strategy: c_int,
    pub b_frame_strategy: c_int,
    pub b_quant_offset: f32,
    pub has_b_frames: c_int,
    pub mpeg_quant: c_int,
    pub i_quant_factor: f32,
    pub i_quant_offset: f32,
    pub lumi_masking: f32,
    pub temporal_cplx_masking: f32,
    pub spatial_cplx_masking: f32,
    pub p_masking: f32,
    pub dark_masking: f32,
    pub slice_count: c_int,
    pub prediction_method: c_int,
    pub slice_offset: *mut c_int,
    pub sample_aspect_ratio: AVRational,
    pub me_cmp: c_int,
    pub me_sub_cmp: c_int,
    pub mb_cmp: c_int,
    pub ildct_cmp: c_int,
    pub dia_size: c_int,
    pub last_predictor_count: c_int,
    pub pre_me: c_int,
    pub me_pre_cmp: c_int,
    pub pre_dia_size: c_int,
    pub me_subpel_quality: c_int,
    pub dtg_active_format: c_int,
    pub me_range: c_int,
    pub intra_quant_bias: c_int,
    pub inter_quant_bias: c_int,
    pub slice_flags: c_int,
    pub xvmc_acceleration: c_int,
    pub mb_decision: c_int,
    pub intra_matrix: *mut u16,
    pub inter_matrix: *mut u16,
    pub scenechange_threshold: c_int,
    pub noise_reduction: c_int,
    pub me_threshold: c_int,
    pub mb_threshold: c_int,
    pub intra_dc_precision: c_int,
    pub skip_top: c_int,
    pub skip_bottom: c_int,
    pub border_masking: f32,
    pub mb_lmin: c_int,
    pub mb_lmax: c_int,
    pub me_penalty_compensation: c_int,
    pub bidir_refine: c_int,
    pub brd_scale: c_int,
    pub keyint_min: c_int,
    pub refs: c_int,
    pub chromaoffset: c_int,
    pub scenechange_factor: c_int,
    pub mv0_threshold: c_int,
    pub b_sensitivity: c_int,
    pub color_primaries: c_int,
    pub color_trc: c_int,
    pub colorspace: c_int,
    pub color_range: c_int,
    pub chroma_sample_location: c_int,
}

#[repr(C)]
pub(crate) struct AVCodecContext58 {
    pub av_class: *const c_void,
    pub log_level_offset: c_int,
    pub codec_type: c_int,
    pub codec: *const AVCodec,
    pub codec_id: c_int,
    pub codec_tag: c_uint,
    pub priv_data: *mut c_void,
    pub internal: *mut c_void,
    pub opaque: *mut c_void,
    pub bit_rate: i64,
    pub bit_rate_tolerance: c_int,
    pub global_quality: c_int,
    pub compression_level: c_int,
    pub flags: c_int,
    pub flags2: c_int,
    pub extradata: *mut u8,
    pub extradata_size: c_int,
    pub time_base: AVRational,
    pub ticks_per_frame: c_int,
    pub delay: c_int,
    pub width: c_int,
    pub height: c_int,
    pub coded_width: c_int,
    pub coded_height: c_int,
    pub gop_size: c_int,
    pub pix_fmt: c_int,
    pub draw_horiz_band: *const c_void,
    pub get_format: *const c_void,
    pub max_b_frames: c_int,
    pub b_quant_factor: f32,
    pub b_frame_strategy: c_int,
    pub b_quant_offset: f32,
    pub has_b_frames: c_int,
    pub mpeg_quant: c_int,
    pub i_quant_factor: f32,
    pub i_quant_offset: f32,
    pub lumi_masking: f32,
    pub temporal_cplx_masking: f32,
    pub spatial_cplx_masking: f32,
    pub p_masking: f32,
    pub dark_masking: f32,
    pub slice_count: c_int,
    pub prediction_method: c_int,
    pub slice_offset: *mut c_int,
    pub sample_aspect_ratio: AVRational,
    pub me_cmp: c_int,
    pub me_sub_cmp: c_int,
    pub mb_cmp: c_int,
    pub ildct_cmp: c_int,
    pub dia_size: c_int,
    pub last_predictor_count: c_int,
    pub pre_me: c_int,
    pub me_pre_cmp: c_int,
    pub pre_dia_size: c_int,
    pub me_subpel_quality: c_int,
    pub me_range: c_int,
    pub slice_flags: c_int,
    pub mb_decision: c_int,
    pub intra_matrix: *mut u16,
    pub inter_matrix: *mut u16,
    pub scenechange_threshold: c_int,
    pub noise_reduction: c_int,
    pub intra_dc_precision: c_int,
    pub skip_top: c_int,
    pub skip_bottom: c_int,
    pub mb_lmin: c_int,
    pub mb_lmax: c_int,
    pub me_penalty_compensation: c_int,
    pub bidir_refine: c_int,
    pub brd_scale: c_int,
    pub keyint_min: c_int,
    pub refs: c_int,
    pub chromaoffset: c_int,
    pub mv0_threshold: c_int,
    pub b_sensitivity: c_int,
    pub color_primaries: c_int,
    pub color_trc: c_int,
    pub colorspace: c_int,
    pub color_range: c_int,
    pub chroma_sample_location: c_int,
    pub slices: c_int,
}

#[repr(C)]
pub(crate) struct AVCodecContext59_60 {
    pub av_class: *const c_void,
    pub log_level_offset: c_int,
    pub codec_type: c_int,
    pub codec: *const AVCodec,
    pub codec_id: c_int,
    pub codec_tag: c_uint,
    pub priv_data: *mut c_void,
    pub internal: *mut c_void,
    pub opaque: *mut c_void,
    pub bit_rate: i64,
    pub bit_rate_tolerance: c_int,
    pub global_quality: c_int,
    pub compression_level: c_int,
    pub flags: c_int,
    pub flags2: c_int,
    pub extradata: *mut u8,
    pub extradata_size: c_int,
    pub time_base: AVRational,
    pub ticks_per_frame: c_int,
    pub delay: c_int,
    pub width: c_int,
    pub height: c_int,
    pub coded_width: c_int,
    pub coded_height: c_int,
    pub gop_size: c_int,
    pub pix_fmt: c_int,
    pub draw_horiz_band: *const c_void,
    pub get_format: *const c_void,
    pub max_b_frames: c_int,
    pub b_quant_factor: f32,
    pub b_quant_offset: f32,
    pub has_b_frames: c_int,
    pub i_quant_factor: f32,
    pub i_quant_offset: f32,
    pub lumi_masking: f32,
    pub temporal_cplx_masking: f32,
    pub spatial_cplx_masking: f32,
    pub p_masking: f32,
    pub dark_masking: f32,
    pub slice_count: c_int,
    pub slice_offset: *mut c_int,
    pub sample_aspect_ratio: AVRational,
    pub me_cmp: c_int,
    pub me_sub_cmp: c_int,
    pub mb_cmp: c_int,
    pub ildct_cmp: c_int,
    pub dia_size: c_int,
    pub last_predictor_count: c_int,
    pub me_pre_cmp: c_int,
    pub pre_dia_size: c_int,
    pub me_subpel_quality: c_int,
    pub me_range: c_int,
    pub slice_flags: c_int,
    pub mb_decision: c_int,
    pub intra_matrix: *mut u16,
    pub inter_matrix: *mut u16,
    pub intra_dc_precision: c_int,
    pub skip_top: c_int,
    pub skip_bottom: c_int,
    pub mb_lmin: c_int,
    pub mb_lmax: c_int,
    pub bidir_refine: c_int,
    pub keyint_min: c_int,
    pub refs: c_int,
    pub mv0_threshold: c_int,
    pub color_primaries: c_int,
    pub color_trc: c_int,
    pub colorspace: c_int,
    pub color_range: c_int,
    pub chroma_sample_location: c_int,
    pub slices: c_int,
}

/// Codec context fields.
///
/// Writable, for the legacy configuration path that copies a stream's context into a fresh
/// decoder context: `codec_type`, `codec_id`, `codec_tag`, `bit_rate`, `extradata`,
/// `extradata_size`, `width`, `height`, `pix_fmt`, `has_b_frames`, `sample_aspect_ratio` and
/// the five colour fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecContextFields {
    pub codec_type: i32,
    pub codec: *const AVCodec,
    /// Fixed-size name buffer, removed in 58.
    pub codec_name: Option<String>,
    pub codec_id: i32,
    pub codec_tag: u32,
    pub bit_rate: i64,
    pub flags: i32,
    pub flags2: i32,
    pub extradata: *mut u8,
    pub extradata_size: i32,
    pub time_base: AVRational,
    pub ticks_per_frame: i32,
    pub delay: i32,
    pub width: i32,
    pub height: i32,
    pub coded_width: i32,
    pub coded_height: i32,
    pub gop_size: i32,
    pub pix_fmt: i32,
    pub max_b_frames: i32,
    pub has_b_frames: i32,
    pub sample_aspect_ratio: AVRational,
    pub color_primaries: i32,
    pub color_trc: i32,
    pub colorspace: i32,
    pub color_range: i32,
    pub chroma_sample_location: i32,
    /// From 58.
    pub slices: Option<i32>,
}

pub type CodecContextView =
    dyn VersionedWrite<Native = AVCodecContext, Fields = CodecContextFields>;

struct CodecContext56;
struct CodecContext57;
struct CodecContext58;
struct CodecContext59_60;

static CODEC_CONTEXT_56: CodecContext56 = CodecContext56;
static CODEC_CONTEXT_57: CodecContext57 = CodecContext57;
static CODEC_CONTEXT_58: CodecContext58 = CodecContext58;
static CODEC_CONTEXT_59_60: CodecContext59_60 = CodecContext59_60;

pub fn codec_context_view(avcodec_major: u32) -> Result<&'static CodecContextView, AbiError> {
    match avcodec_major {
        56 => Ok(&CODEC_CONTEXT_56),
        57 => Ok(&CODEC_CONTEXT_57),
        58 => Ok(&CODEC_CONTEXT_58),
        59 | 60 => Ok(&CODEC_CONTEXT_59_60),
        major => Err(unsupported("AVCodecContext", Library::AvCodec, major)),
    }
}

macro_rules! read_fields {
    ($p:expr, codec_name: $name:expr, slices: $slices:expr) => {{
        let p = $p;
        CodecContextFields {
            codec_type: p.codec_type,
            codec: p.codec,
            codec_name: $name,
            codec_id: p.codec_id,
            codec_tag: p.codec_tag,
            bit_rate: p.bit_rate as i64,
            flags: p.flags,
            flags2: p.flags2,
            extradata: p.extradata,
            extradata_size: p.extradata_size,
            time_base: p.time_base,
            ticks_per_frame: p.ticks_per_frame,
            delay: p.delay,
            width: p.width,
            height: p.height,
            coded_width: p.coded_width,
            coded_height: p.coded_height,
            gop_size: p.gop_size,
            pix_fmt: p.pix_fmt,
            max_b_frames: p.max_b_frames,
            has_b_frames: p.has_b_frames,
            sample_aspect_ratio: p.sample_aspect_ratio,
            color_primaries: p.color_primaries,
            color_trc: p.color_trc,
            colorspace: p.colorspace,
            color_range: p.color_range,
            chroma_sample_location: p.chroma_sample_location,
            slices: $slices,
        }
    }};
}

macro_rules! write_fields {
    ($p:expr, $f:expr, $bit_rate:ty) => {{
        let p = $p;
        let f = $f;
        p.codec_type = f.codec_type;
        p.codec_id = f.codec_id;
        p.codec_tag = f.codec_tag;
        p.bit_rate = f.bit_rate as $bit_rate;
        p.extradata = f.extradata;
        p.extradata_size = f.extradata_size;
        p.width = f.width;
        p.height = f.height;
        p.pix_fmt = f.pix_fmt;
        p.has_b_frames = f.has_b_frames;
        p.sample_aspect_ratio = f.sample_aspect_ratio;
        p.color_primaries = f.color_primaries;
        p.color_trc = f.color_trc;
        p.colorspace = f.colorspace;
        p.color_range = f.color_range;
        p.chroma_sample_location = f.chroma_sample_location;
    }};
}

macro_rules! codec_context_family {
    ($view:ident, $raw:ident, $family:literal, $bit_rate:ty, |$p:ident| $name:expr, $slices:expr) => {
        impl VersionedView for $view {
            type Native = AVCodecContext;
            type Fields = CodecContextFields;

            fn family(&self) -> &'static str {
                $family
            }

            unsafe fn read(&self, ptr: *const AVCodecContext) -> CodecContextFields {
                let $p = &*(ptr as *const $raw);
                read_fields!($p, codec_name: $name, slices: $slices)
            }
        }

        impl VersionedWrite for $view {
            unsafe fn write(&self, ptr: *mut AVCodecContext, fields: &CodecContextFields) {
                write_fields!(&mut *(ptr as *mut $raw), fields, $bit_rate);
            }
        }
    };
}

codec_context_family!(
    CodecContext56,
    AVCodecContext56,
    "56",
    c_int,
    |p| Some(c_array_string(&p.codec_name)),
    None
);
codec_context_family!(
    CodecContext57,
    AVCodecContext57,
    "57",
    i64,
    |p| Some(c_array_string(&p.codec_name)),
    None
);
codec_context_family!(CodecContext58, AVCodecContext58, "58", i64, |p| None, Some(p.slices));
codec_context_family!(
    CodecContext59_60,
    AVCodecContext59_60,
    "59_60",
    i64,
    |p| None,
    Some(p.slices)
);
