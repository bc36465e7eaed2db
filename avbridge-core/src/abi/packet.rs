//! `AVPacket`, owned by libavcodec. Keyed on the avcodec major.
//!
//! The whole struct is declared, not just a prefix: `AVStream` embeds one by value
//! (`attached_pic`), so its size is part of the stream layout.

#![allow(dead_code, non_camel_case_types)]

use std::ffi::{c_int, c_void};

use super::{unsupported, VersionedView, VersionedWrite};
use crate::error::AbiError;
use crate::ffi::{AVPacket, AVRational};
use crate::version::Library;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct AVPacket56 {
    pub buf: *mut c_void,
    pub pts: i64,
    pub dts: i64,
    pub data: *mut u8,
    pub size: c_int,
    pub stream_index: c_int,
    pub flags: c_int,
    pub side_data: *mut c_void,
    pub side_data_elems: c_int,
    pub duration: c_int,
    /// `void (*destruct)(struct AVPacket *)`
    pub destruct: *const c_void,
    pub priv_: *mut c_void,
    pub pos: i64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct AVPacket57_58 {
    pub buf: *mut c_void,
    pub pts: i64,
    pub dts: i64,
    pub data: *mut u8,
    pub size: c_int,
    pub stream_index: c_int,
    pub flags: c_int,
    pub side_data: *mut c_void,
    pub side_data_elems: c_int,
    pub duration: i64,
    pub pos: i64,
    pub convergence_duration: i64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct AVPacket59_60 {
    pub buf: *mut c_void,
    pub pts: i64,
    pub dts: i64,
    pub data: *mut u8,
    pub size: c_int,
    pub stream_index: c_int,
    pub flags: c_int,
    pub side_data: *mut c_void,
    pub side_data_elems: c_int,
    pub duration: i64,
    pub pos: i64,
    pub opaque: *mut c_void,
    pub opaque_ref: *mut c_void,
    pub time_base: AVRational,
}

/// Packet fields. Writable: `pts`, `dts`, `data`, `size`, `stream_index`, `flags`, `duration`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketFields {
    pub pts: i64,
    pub dts: i64,
    pub data: *mut u8,
    pub size: i32,
    pub stream_index: i32,
    pub flags: i32,
    pub side_data_elems: i32,
    pub duration: i64,
    pub pos: i64,
    /// Only carried by the packet itself from avcodec 59.
    pub time_base: Option<AVRational>,
}

pub type PacketView = dyn VersionedWrite<Native = AVPacket, Fields = PacketFields>;

struct Packet56;
struct Packet57_58;
struct Packet59_60;

static PACKET_56: Packet56 = Packet56;
static PACKET_57_58: Packet57_58 = Packet57_58;
static PACKET_59_60: Packet59_60 = Packet59_60;

pub fn packet_view(avcodec_major: u32) -> Result<&'static PacketView, AbiError> {
    match avcodec_major {
        56 => Ok(&PACKET_56),
        57 | 58 => Ok(&PACKET_57_58),
        59 | 60 => Ok(&PACKET_59_60),
        major => Err(unsupported("AVPacket", Library::AvCodec, major)),
    }
}

impl VersionedView for Packet56 {
    type Native = AVPacket;
    type Fields = PacketFields;

    fn family(&self) -> &'static str {
        "56"
    }

    unsafe fn read(&self, ptr: *const AVPacket) -> PacketFields {
        let p = &*(ptr as *const AVPacket56);
        PacketFields {
            pts: p.pts,
            dts: p.dts,
            data: p.data,
            size: p.size,
            stream_index: p.stream_index,
            flags: p.flags,
            side_data_elems: p.side_data_elems,
            duration: p.duration as i64,
            pos: p.pos,
            time_base: None,
        }
    }
}

impl VersionedWrite for Packet56 {
    unsafe fn write(&self, ptr: *mut AVPacket, f: &PacketFields) {
        let p = &mut *(ptr as *mut AVPacket56);
        p.pts = f.pts;
        p.dts = f.dts;
        p.data = f.data;
        p.size = f.size;
        p.stream_index = f.stream_index;
        p.flags = f.flags;
        p.duration = f.duration as c_int;
    }
}

impl VersionedView for Packet57_58 {
    type Native = AVPacket;
    type Fields = PacketFields;

    fn family(&self) -> &'static str {
        "57_58"
    }

    unsafe fn read(&self, ptr: *const AVPacket) -> PacketFields {
        let p = &*(ptr as *const AVPacket57_58);
        PacketFields {
            pts: p.pts,
            dts: p.dts,
            data: p.data,
            size: p.size,
            stream_index: p.stream_index,
            flags: p.flags,
            side_data_elems: p.side_data_elems,
            duration: p.duration,
            pos: p.pos,
            time_base: None,
        }
    }
}

impl VersionedWrite for Packet57_58 {
    unsafe fn write(&self, ptr: *mut AVPacket, f: &PacketFields) {
        let p = &mut *(ptr as *mut AVPacket57_58);
        p.pts = f.pts;
        p.dts = f.dts;
        p.data = f.data;
        p.size = f.size;
        p.stream_index = f.stream_index;
        p.flags = f.flags;
        p.duration = f.duration;
    }
}

impl VersionedView for Packet59_60 {
    type Native = AVPacket;
    type Fields = PacketFields;

    fn family(&self) -> &'static str {
        "59_60"
    }

    unsafe fn read(&self, ptr: *const AVPacket) -> PacketFields {
        let p = &*(ptr as *const AVPacket59_60);
        PacketFields {
            pts: p.pts,
            dts: p.dts,
            data: p.data,
            size: p.size,
            stream_index: p.stream_index,
            flags: p.flags,
            side_data_elems: p.side_data_elems,
            duration: p.duration,
            pos: p.pos,
            time_base: Some(p.time_base),
        }
    }
}

impl VersionedWrite for Packet59_60 {
    unsafe fn write(&self, ptr: *mut AVPacket, f: &PacketFields) {
        let p = &mut *(ptr as *mut AVPacket59_60);
        p.pts = f.pts;
        p.dts = f.dts;
        p.data = f.data;
        p.size = f.size;
        p.stream_index = f.stream_index;
        p.flags = f.flags;
        p.duration = f.duration;
    }
}
