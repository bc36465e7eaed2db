//! `AVFrameSideData` and the `AVMotionVector` records carried in motion-vector side data.
//! Both are keyed on the avutil major.

#![allow(dead_code, non_camel_case_types)]

use std::ffi::{c_int, c_void};

use super::{unsupported, VersionedArray, VersionedView};
use crate::error::AbiError;
use crate::ffi::{AVDictionary, AVFrameSideData};
use crate::version::Library;

#[repr(C)]
pub(crate) struct AVFrameSideData54_56 {
    pub type_: c_int,
    pub data: *mut u8,
    pub size: c_int,
    pub metadata: *mut AVDictionary,
    pub buf: *mut c_void,
}

#[repr(C)]
pub(crate) struct AVFrameSideData57_58 {
    pub type_: c_int,
    pub data: *mut u8,
    pub size: usize,
    pub metadata: *mut AVDictionary,
    pub buf: *mut c_void,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideDataFields {
    pub type_: i32,
    pub data: *mut u8,
    pub size: usize,
    pub metadata: *mut AVDictionary,
}

pub type SideDataView = dyn VersionedView<Native = AVFrameSideData, Fields = SideDataFields>;

struct SideData54_56;
struct SideData57_58;

static SIDE_DATA_54_56: SideData54_56 = SideData54_56;
static SIDE_DATA_57_58: SideData57_58 = SideData57_58;

pub fn side_data_view(avutil_major: u32) -> Result<&'static SideDataView, AbiError> {
    match avutil_major {
        54..=56 => Ok(&SIDE_DATA_54_56),
        57 | 58 => Ok(&SIDE_DATA_57_58),
        major => Err(unsupported("AVFrameSideData", Library::AvUtil, major)),
    }
}

impl VersionedView for SideData54_56 {
    type Native = AVFrameSideData;
    type Fields = SideDataFields;

    fn family(&self) -> &'static str {
        "54_56"
    }

    unsafe fn read(&self, ptr: *const AVFrameSideData) -> SideDataFields {
        let p = &*(ptr as *const AVFrameSideData54_56);
        SideDataFields {
            type_: p.type_,
            data: p.data,
            size: p.size.max(0) as usize,
            metadata: p.metadata,
        }
    }
}

impl VersionedView for SideData57_58 {
    type Native = AVFrameSideData;
    type Fields = SideDataFields;

    fn family(&self) -> &'static str {
        "57_58"
    }

    unsafe fn read(&self, ptr: *const AVFrameSideData) -> SideDataFields {
        let p = &*(ptr as *const AVFrameSideData57_58);
        SideDataFields {
            type_: p.type_,
            data: p.data,
            size: p.size,
            metadata: p.metadata,
        }
    }
}

/// Opaque element of a motion-vector side-data payload.
#[repr(C)]
pub struct AVMotionVector {
    _private: [u8; 0],
}

#[repr(C)]
pub(crate) struct AVMotionVector54 {
    pub source: i32,
    pub w: u8,
    pub h: u8,
    pub src_x: i16,
    pub src_y: i16,
    pub dst_x: i16,
    pub dst_y: i16,
    pub flags: u64,
}

#[repr(C)]
pub(crate) struct AVMotionVector55_58 {
    pub source: i32,
    pub w: u8,
    pub h: u8,
    pub src_x: i16,
    pub src_y: i16,
    pub dst_x: i16,
    pub dst_y: i16,
    pub flags: u64,
    pub motion_x: i32,
    pub motion_y: i32,
    pub motion_scale: u16,
}

/// One motion vector. `motion` is absent in avutil 54.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MotionVectorFields {
    /// Negative when the reference is in the past, positive for the future.
    pub source: i32,
    pub w: u8,
    pub h: u8,
    pub src_x: i16,
    pub src_y: i16,
    pub dst_x: i16,
    pub dst_y: i16,
    pub flags: u64,
    pub motion: Option<(i32, i32, u16)>,
}

pub type MotionVectorView = dyn VersionedArray<Native = AVMotionVector, Fields = MotionVectorFields>;

struct MotionVector54;
struct MotionVector55_58;

static MOTION_VECTOR_54: MotionVector54 = MotionVector54;
static MOTION_VECTOR_55_58: MotionVector55_58 = MotionVector55_58;

pub fn motion_vector_view(avutil_major: u32) -> Result<&'static MotionVectorView, AbiError> {
    match avutil_major {
        54 => Ok(&MOTION_VECTOR_54),
        55..=58 => Ok(&MOTION_VECTOR_55_58),
        major => Err(unsupported("AVMotionVector", Library::AvUtil, major)),
    }
}

impl VersionedView for MotionVector54 {
    type Native = AVMotionVector;
    type Fields = MotionVectorFields;

    fn family(&self) -> &'static str {
        "54"
    }

    unsafe fn read(&self, ptr: *const AVMotionVector) -> MotionVectorFields {
        let p = &*(ptr as *const AVMotionVector54);
        MotionVectorFields {
            source: p.source,
            w: p.w,
            h: p.h,
            src_x: p.src_x,
            src_y: p.src_y,
            dst_x: p.dst_x,
            dst_y: p.dst_y,
            flags: p.flags,
            motion: None,
        }
    }
}

impl VersionedArray for MotionVector54 {
    fn stride(&self) -> usize {
        std::mem::size_of::<AVMotionVector54>()
    }
}

impl VersionedView for MotionVector55_58 {
    type Native = AVMotionVector;
    type Fields = MotionVectorFields;

    fn family(&self) -> &'static str {
        "55_58"
    }

    unsafe fn read(&self, ptr: *const AVMotionVector) -> MotionVectorFields {
        let p = &*(ptr as *const AVMotionVector55_58);
        MotionVectorFields {
            source: p.source,
            w: p.w,
            h: p.h,
            src_x: p.src_x,
            src_y: p.src_y,
            dst_x: p.dst_x,
            dst_y: p.dst_y,
            flags: p.flags,
            motion: Some((p.motion_x, p.motion_y, p.motion_scale)),
        }
    }
}

impl VersionedArray for MotionVector55_58 {
    fn stride(&self) -> usize {
        std::mem::size_of::<AVMotionVector55_58>()
    }
}
