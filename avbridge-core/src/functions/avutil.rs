//! libavutil bindings.

use std::ffi::{c_char, c_int, c_uint, c_void};

use crate::diagnostics::DiagnosticLog;
use crate::error::LoadError;
use crate::ffi::{
    AVDictionary, AVDictionaryEntry, AVFrame, AVFrameSideData, AVPixFmtDescriptor, AvLogCallback,
};
use crate::symbols::{present, resolve, Resolver, SymbolSource};
use crate::version::{Library, Version};

// ============================================================================
// Function Types
// ============================================================================

pub type AvFrameAllocFn = unsafe extern "C" fn() -> *mut AVFrame;
pub type AvFrameFreeFn = unsafe extern "C" fn(*mut *mut AVFrame);
pub type AvMalloczFn = unsafe extern "C" fn(usize) -> *mut c_void;
pub type AvFreeFn = unsafe extern "C" fn(*mut c_void);
pub type AvutilVersionFn = unsafe extern "C" fn() -> c_uint;
pub type AvDictSetFn =
    unsafe extern "C" fn(*mut *mut AVDictionary, *const c_char, *const c_char, c_int) -> c_int;
pub type AvDictGetFn = unsafe extern "C" fn(
    *const AVDictionary,
    *const c_char,
    *const AVDictionaryEntry,
    c_int,
) -> *mut AVDictionaryEntry;
pub type AvDictFreeFn = unsafe extern "C" fn(*mut *mut AVDictionary);
pub type AvFrameGetSideDataFn =
    unsafe extern "C" fn(*const AVFrame, c_int) -> *mut AVFrameSideData;
pub type AvFrameGetMetadataFn = unsafe extern "C" fn(*const AVFrame) -> *mut AVDictionary;
pub type AvLogSetCallbackFn = unsafe extern "C" fn(Option<AvLogCallback>);
pub type AvLogSetLevelFn = unsafe extern "C" fn(c_int);
pub type AvPixFmtDescGetFn = unsafe extern "C" fn(c_int) -> *const AVPixFmtDescriptor;
pub type AvPixFmtDescNextFn =
    unsafe extern "C" fn(*const AVPixFmtDescriptor) -> *const AVPixFmtDescriptor;
pub type AvPixFmtDescGetIdFn = unsafe extern "C" fn(*const AVPixFmtDescriptor) -> c_int;

/// From libavutil 57 the frame's metadata is read from the struct itself; the accessor is gone.
pub const FRAME_GET_METADATA_REMOVED_IN: u32 = 57;

#[derive(Debug, Clone, Copy)]
pub struct AvUtilFunctions {
    pub av_frame_alloc: AvFrameAllocFn,
    pub av_frame_free: AvFrameFreeFn,
    pub av_mallocz: AvMalloczFn,
    pub av_free: Option<AvFreeFn>,
    pub avutil_version: AvutilVersionFn,
    pub av_dict_set: AvDictSetFn,
    pub av_dict_get: AvDictGetFn,
    pub av_dict_free: Option<AvDictFreeFn>,
    pub av_frame_get_side_data: AvFrameGetSideDataFn,
    /// Present only for majors below [`FRAME_GET_METADATA_REMOVED_IN`].
    pub av_frame_get_metadata: Option<AvFrameGetMetadataFn>,
    pub av_log_set_callback: AvLogSetCallbackFn,
    pub av_log_set_level: AvLogSetLevelFn,
    pub av_pix_fmt_desc_get: AvPixFmtDescGetFn,
    pub av_pix_fmt_desc_next: AvPixFmtDescNextFn,
    pub av_pix_fmt_desc_get_id: AvPixFmtDescGetIdFn,
}

pub fn bind(
    source: &dyn SymbolSource,
    log: &DiagnosticLog,
) -> Result<(AvUtilFunctions, Version), LoadError> {
    let mut r = Resolver::new(source, Library::AvUtil);

    let avutil_version = resolve!(required r, avutil_version: AvutilVersionFn);
    let Some(avutil_version) = avutil_version else {
        super::log_missing(log, &r);
        return Err(r.error());
    };
    let version = Version::from_packed(unsafe { avutil_version() });

    let av_frame_alloc = resolve!(required r, av_frame_alloc: AvFrameAllocFn);
    let av_frame_free = resolve!(required r, av_frame_free: AvFrameFreeFn);
    let av_mallocz = resolve!(required r, av_mallocz: AvMalloczFn);
    let av_free = resolve!(optional r, av_free: AvFreeFn);
    let av_dict_set = resolve!(required r, av_dict_set: AvDictSetFn);
    let av_dict_get = resolve!(required r, av_dict_get: AvDictGetFn);
    let av_dict_free = resolve!(optional r, av_dict_free: AvDictFreeFn);
    let av_frame_get_side_data = resolve!(required r, av_frame_get_side_data: AvFrameGetSideDataFn);
    let av_frame_get_metadata = if version.major < FRAME_GET_METADATA_REMOVED_IN {
        resolve!(required r, av_frame_get_metadata: AvFrameGetMetadataFn)
    } else {
        None
    };
    let av_log_set_callback = resolve!(required r, av_log_set_callback: AvLogSetCallbackFn);
    let av_log_set_level = resolve!(required r, av_log_set_level: AvLogSetLevelFn);
    let av_pix_fmt_desc_get = resolve!(required r, av_pix_fmt_desc_get: AvPixFmtDescGetFn);
    let av_pix_fmt_desc_next = resolve!(required r, av_pix_fmt_desc_next: AvPixFmtDescNextFn);
    let av_pix_fmt_desc_get_id = resolve!(required r, av_pix_fmt_desc_get_id: AvPixFmtDescGetIdFn);

    super::log_missing(log, &r);
    r.finish()?;

    let lib = Library::AvUtil;
    Ok((
        AvUtilFunctions {
            av_frame_alloc: present(av_frame_alloc, lib, "av_frame_alloc")?,
            av_frame_free: present(av_frame_free, lib, "av_frame_free")?,
            av_mallocz: present(av_mallocz, lib, "av_mallocz")?,
            av_free,
            avutil_version,
            av_dict_set: present(av_dict_set, lib, "av_dict_set")?,
            av_dict_get: present(av_dict_get, lib, "av_dict_get")?,
            av_dict_free,
            av_frame_get_side_data: present(av_frame_get_side_data, lib, "av_frame_get_side_data")?,
            av_frame_get_metadata,
            av_log_set_callback: present(av_log_set_callback, lib, "av_log_set_callback")?,
            av_log_set_level: present(av_log_set_level, lib, "av_log_set_level")?,
            av_pix_fmt_desc_get: present(av_pix_fmt_desc_get, lib, "av_pix_fmt_desc_get")?,
            av_pix_fmt_desc_next: present(av_pix_fmt_desc_next, lib, "av_pix_fmt_desc_next")?,
            av_pix_fmt_desc_get_id: present(av_pix_fmt_desc_get_id, lib, "av_pix_fmt_desc_get_id")?,
        },
        version,
    ))
}
