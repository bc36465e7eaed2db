//! libavformat bindings.

use std::ffi::{c_char, c_int, c_uint};

use crate::diagnostics::DiagnosticLog;
use crate::error::LoadError;
use crate::ffi::{AVDictionary, AVFormatContext, AVInputFormat, AVPacket};
use crate::symbols::{present, resolve, Resolver, SymbolSource};
use crate::version::{Library, Version};

// ============================================================================
// Function Types
// ============================================================================

pub type AvRegisterAllFn = unsafe extern "C" fn();
pub type AvformatOpenInputFn = unsafe extern "C" fn(
    *mut *mut AVFormatContext,
    *const c_char,
    *const AVInputFormat,
    *mut *mut AVDictionary,
) -> c_int;
pub type AvformatCloseInputFn = unsafe extern "C" fn(*mut *mut AVFormatContext);
pub type AvformatFindStreamInfoFn =
    unsafe extern "C" fn(*mut AVFormatContext, *mut *mut AVDictionary) -> c_int;
pub type AvReadFrameFn = unsafe extern "C" fn(*mut AVFormatContext, *mut AVPacket) -> c_int;
pub type AvSeekFrameFn = unsafe extern "C" fn(*mut AVFormatContext, c_int, i64, c_int) -> c_int;
pub type AvformatVersionFn = unsafe extern "C" fn() -> c_uint;

/// `av_register_all` was removed in libavformat 59.
pub const REGISTER_ALL_REMOVED_IN: u32 = 59;

#[derive(Debug, Clone, Copy)]
pub struct AvFormatFunctions {
    /// Present only for majors below [`REGISTER_ALL_REMOVED_IN`].
    pub av_register_all: Option<AvRegisterAllFn>,
    pub avformat_open_input: AvformatOpenInputFn,
    pub avformat_close_input: AvformatCloseInputFn,
    pub avformat_find_stream_info: AvformatFindStreamInfoFn,
    pub av_read_frame: AvReadFrameFn,
    pub av_seek_frame: AvSeekFrameFn,
    pub avformat_version: AvformatVersionFn,
}

/// Binds libavformat. The library's own version is queried first; it decides whether
/// `av_register_all` is required.
pub fn bind(
    source: &dyn SymbolSource,
    log: &DiagnosticLog,
) -> Result<(AvFormatFunctions, Version), LoadError> {
    let mut r = Resolver::new(source, Library::AvFormat);

    let avformat_version = resolve!(required r, avformat_version: AvformatVersionFn);
    let Some(avformat_version) = avformat_version else {
        super::log_missing(log, &r);
        return Err(r.error());
    };
    let version = Version::from_packed(unsafe { avformat_version() });

    let av_register_all = if version.major < REGISTER_ALL_REMOVED_IN {
        resolve!(required r, av_register_all: AvRegisterAllFn)
    } else {
        None
    };
    let avformat_open_input = resolve!(required r, avformat_open_input: AvformatOpenInputFn);
    let avformat_close_input = resolve!(required r, avformat_close_input: AvformatCloseInputFn);
    let avformat_find_stream_info =
        resolve!(required r, avformat_find_stream_info: AvformatFindStreamInfoFn);
    let av_read_frame = resolve!(required r, av_read_frame: AvReadFrameFn);
    let av_seek_frame = resolve!(required r, av_seek_frame: AvSeekFrameFn);

    super::log_missing(log, &r);
    r.finish()?;

    let lib = Library::AvFormat;
    Ok((
        AvFormatFunctions {
            av_register_all,
            avformat_open_input: present(avformat_open_input, lib, "avformat_open_input")?,
            avformat_close_input: present(avformat_close_input, lib, "avformat_close_input")?,
            avformat_find_stream_info: present(
                avformat_find_stream_info,
                lib,
                "avformat_find_stream_info",
            )?,
            av_read_frame: present(av_read_frame, lib, "av_read_frame")?,
            av_seek_frame: present(av_seek_frame, lib, "av_seek_frame")?,
            avformat_version,
        },
        version,
    ))
}
