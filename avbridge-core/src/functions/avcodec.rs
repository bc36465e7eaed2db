//! libavcodec bindings.

use std::ffi::{c_char, c_int, c_uint};

use crate::diagnostics::DiagnosticLog;
use crate::error::LoadError;
use crate::ffi::{AVCodec, AVCodecContext, AVCodecParameters, AVDictionary, AVFrame, AVPacket};
use crate::negotiate::{self, DecodeApi};
use crate::symbols::{present, resolve, Resolver, SymbolSource};
use crate::version::{Library, Version};

// ============================================================================
// Function Types
// ============================================================================

pub type AvcodecFindDecoderFn = unsafe extern "C" fn(c_int) -> *const AVCodec;
pub type AvcodecAllocContext3Fn = unsafe extern "C" fn(*const AVCodec) -> *mut AVCodecContext;
pub type AvcodecOpen2Fn =
    unsafe extern "C" fn(*mut AVCodecContext, *const AVCodec, *mut *mut AVDictionary) -> c_int;
pub type AvcodecFreeContextFn = unsafe extern "C" fn(*mut *mut AVCodecContext);
pub type AvPacketAllocFn = unsafe extern "C" fn() -> *mut AVPacket;
pub type AvPacketFreeFn = unsafe extern "C" fn(*mut *mut AVPacket);
pub type AvInitPacketFn = unsafe extern "C" fn(*mut AVPacket);
pub type AvPacketUnrefFn = unsafe extern "C" fn(*mut AVPacket);
pub type AvcodecFlushBuffersFn = unsafe extern "C" fn(*mut AVCodecContext);
pub type AvcodecVersionFn = unsafe extern "C" fn() -> c_uint;
pub type AvcodecGetNameFn = unsafe extern "C" fn(c_int) -> *const c_char;
pub type AvcodecParametersAllocFn = unsafe extern "C" fn() -> *mut AVCodecParameters;
pub type AvcodecParametersFreeFn = unsafe extern "C" fn(*mut *mut AVCodecParameters);

pub type AvcodecSendPacketFn = unsafe extern "C" fn(*mut AVCodecContext, *const AVPacket) -> c_int;
pub type AvcodecReceiveFrameFn = unsafe extern "C" fn(*mut AVCodecContext, *mut AVFrame) -> c_int;
pub type AvcodecParametersToContextFn =
    unsafe extern "C" fn(*mut AVCodecContext, *const AVCodecParameters) -> c_int;
pub type AvcodecDecodeVideo2Fn =
    unsafe extern "C" fn(*mut AVCodecContext, *mut AVFrame, *mut c_int, *const AVPacket) -> c_int;

#[derive(Debug, Clone, Copy)]
pub struct AvCodecFunctions {
    pub avcodec_find_decoder: AvcodecFindDecoderFn,
    pub avcodec_alloc_context3: AvcodecAllocContext3Fn,
    pub avcodec_open2: AvcodecOpen2Fn,
    pub avcodec_free_context: AvcodecFreeContextFn,
    pub av_packet_alloc: AvPacketAllocFn,
    pub av_packet_free: AvPacketFreeFn,
    pub av_init_packet: AvInitPacketFn,
    pub av_packet_unref: AvPacketUnrefFn,
    pub avcodec_flush_buffers: AvcodecFlushBuffersFn,
    pub avcodec_version: AvcodecVersionFn,
    pub avcodec_get_name: AvcodecGetNameFn,
    pub avcodec_parameters_alloc: AvcodecParametersAllocFn,
    /// Optional. Parameters leak without it, as they did before it existed.
    pub avcodec_parameters_free: Option<AvcodecParametersFreeFn>,
    /// Which decode call convention this library supports.
    pub decode: DecodeApi,
}

pub fn bind(
    source: &dyn SymbolSource,
    log: &DiagnosticLog,
) -> Result<(AvCodecFunctions, Version), LoadError> {
    let mut r = Resolver::new(source, Library::AvCodec);

    let avcodec_version = resolve!(required r, avcodec_version: AvcodecVersionFn);
    let Some(avcodec_version) = avcodec_version else {
        super::log_missing(log, &r);
        return Err(r.error());
    };
    let version = Version::from_packed(unsafe { avcodec_version() });

    let avcodec_find_decoder = resolve!(required r, avcodec_find_decoder: AvcodecFindDecoderFn);
    let avcodec_alloc_context3 =
        resolve!(required r, avcodec_alloc_context3: AvcodecAllocContext3Fn);
    let avcodec_open2 = resolve!(required r, avcodec_open2: AvcodecOpen2Fn);
    let avcodec_free_context = resolve!(required r, avcodec_free_context: AvcodecFreeContextFn);
    let av_init_packet = resolve!(required r, av_init_packet: AvInitPacketFn);
    let av_packet_alloc = resolve!(required r, av_packet_alloc: AvPacketAllocFn);
    let av_packet_free = resolve!(required r, av_packet_free: AvPacketFreeFn);
    let av_packet_unref = resolve!(required r, av_packet_unref: AvPacketUnrefFn);
    let avcodec_flush_buffers = resolve!(required r, avcodec_flush_buffers: AvcodecFlushBuffersFn);
    let avcodec_get_name = resolve!(required r, avcodec_get_name: AvcodecGetNameFn);
    let avcodec_parameters_alloc =
        resolve!(required r, avcodec_parameters_alloc: AvcodecParametersAllocFn);
    let avcodec_parameters_free =
        resolve!(optional r, avcodec_parameters_free: AvcodecParametersFreeFn);

    let decode = negotiate::negotiate(&mut r, log);

    super::log_missing(log, &r);
    r.finish()?;

    let lib = Library::AvCodec;
    Ok((
        AvCodecFunctions {
            avcodec_find_decoder: present(avcodec_find_decoder, lib, "avcodec_find_decoder")?,
            avcodec_alloc_context3: present(avcodec_alloc_context3, lib, "avcodec_alloc_context3")?,
            avcodec_open2: present(avcodec_open2, lib, "avcodec_open2")?,
            avcodec_free_context: present(avcodec_free_context, lib, "avcodec_free_context")?,
            av_packet_alloc: present(av_packet_alloc, lib, "av_packet_alloc")?,
            av_packet_free: present(av_packet_free, lib, "av_packet_free")?,
            av_init_packet: present(av_init_packet, lib, "av_init_packet")?,
            av_packet_unref: present(av_packet_unref, lib, "av_packet_unref")?,
            avcodec_flush_buffers: present(avcodec_flush_buffers, lib, "avcodec_flush_buffers")?,
            avcodec_version,
            avcodec_get_name: present(avcodec_get_name, lib, "avcodec_get_name")?,
            avcodec_parameters_alloc: present(
                avcodec_parameters_alloc,
                lib,
                "avcodec_parameters_alloc",
            )?,
            avcodec_parameters_free,
            decode: present(decode, lib, "avcodec_decode_video2")?,
        },
        version,
    ))
}
