//! `AVPixFmtDescriptor`, a static table inside libavutil. Keyed on the avutil major.
//!
//! 54 packs each component into a 16-bit bitfield; 55 and 56 use eight ints per component (five
//! current plus three deprecated); 57 dropped the deprecated three.

#![allow(dead_code, non_camel_case_types)]

use std::ffi::{c_char, c_int};

use super::{c_string, unsupported, VersionedView};
use crate::error::AbiError;
use crate::ffi::AVPixFmtDescriptor;
use crate::version::Library;

/// `AVComponentDescriptor` of avutil 54:
/// `plane:2, step_minus1:3, offset_plus1:3, shift:3, depth_minus1:4`, allocated from bit 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AVComponentDescriptor54 {
    pub bits: u16,
}

impl AVComponentDescriptor54 {
    pub fn pack(c: &ComponentDescriptor) -> Self {
        let bits = (c.plane as u16 & 0x3)
            | (((c.step - 1) as u16 & 0x7) << 2)
            | (((c.offset + 1) as u16 & 0x7) << 5)
            | ((c.shift as u16 & 0x7) << 8)
            | (((c.depth - 1) as u16 & 0xF) << 11);
        Self { bits }
    }

    pub fn unpack(&self) -> ComponentDescriptor {
        let b = self.bits as i32;
        ComponentDescriptor {
            plane: b & 0x3,
            step: ((b >> 2) & 0x7) + 1,
            offset: ((b >> 5) & 0x7) - 1,
            shift: (b >> 8) & 0x7,
            depth: ((b >> 11) & 0xF) + 1,
        }
    }
}

#[repr(C)]
pub(crate) struct AVPixFmtDescriptor54 {
    pub name: *const c_char,
    pub nb_components: u8,
    pub log2_chroma_w: u8,
    pub log2_chroma_h: u8,
    pub flags: u8,
    pub comp: [AVComponentDescriptor54; 4],
    pub alias: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AVComponentDescriptor55_56 {
    pub plane: c_int,
    pub step: c_int,
    pub offset: c_int,
    pub shift: c_int,
    pub depth: c_int,
    pub step_minus1: c_int,
    pub depth_minus1: c_int,
    pub offset_plus1: c_int,
}

#[repr(C)]
pub(crate) struct AVPixFmtDescriptor55_56 {
    pub name: *const c_char,
    pub nb_components: u8,
    pub log2_chroma_w: u8,
    pub log2_chroma_h: u8,
    pub flags: u64,
    pub comp: [AVComponentDescriptor55_56; 4],
    pub alias: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AVComponentDescriptor57_58 {
    pub plane: c_int,
    pub step: c_int,
    pub offset: c_int,
    pub shift: c_int,
    pub depth: c_int,
}

#[repr(C)]
pub(crate) struct AVPixFmtDescriptor57_58 {
    pub name: *const c_char,
    pub nb_components: u8,
    pub log2_chroma_w: u8,
    pub log2_chroma_h: u8,
    pub flags: u64,
    pub comp: [AVComponentDescriptor57_58; 4],
    pub alias: *const c_char,
}

/// One component (channel) of a pixel format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// Plane the component is stored in.
    pub plane: i32,
    /// Bytes (or bits, for bitstream formats) between two horizontally adjacent pixels.
    pub step: i32,
    /// Bytes (or bits) before the first pixel of this component.
    pub offset: i32,
    /// Right shift applied after reading.
    pub shift: i32,
    /// Bits per sample.
    pub depth: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixFmtFields {
    pub name: String,
    pub nb_components: u8,
    pub log2_chroma_w: u8,
    pub log2_chroma_h: u8,
    /// `AV_PIX_FMT_FLAG_*` bits. Only the low eight exist in avutil 54.
    pub flags: u64,
    pub comp: [ComponentDescriptor; 4],
    /// Comma separated alternative names; empty if none.
    pub alias: String,
}

pub type PixFmtView = dyn VersionedView<Native = AVPixFmtDescriptor, Fields = PixFmtFields>;

struct PixFmt54;
struct PixFmt55_56;
struct PixFmt57_58;

static PIX_FMT_54: PixFmt54 = PixFmt54;
static PIX_FMT_55_56: PixFmt55_56 = PixFmt55_56;
static PIX_FMT_57_58: PixFmt57_58 = PixFmt57_58;

pub fn pix_fmt_view(avutil_major: u32) -> Result<&'static PixFmtView, AbiError> {
    match avutil_major {
        54 => Ok(&PIX_FMT_54),
        55 | 56 => Ok(&PIX_FMT_55_56),
        57 | 58 => Ok(&PIX_FMT_57_58),
        major => Err(unsupported("AVPixFmtDescriptor", Library::AvUtil, major)),
    }
}

impl VersionedView for PixFmt54 {
    type Native = AVPixFmtDescriptor;
    type Fields = PixFmtFields;

    fn family(&self) -> &'static str {
        "54"
    }

    unsafe fn read(&self, ptr: *const AVPixFmtDescriptor) -> PixFmtFields {
        let p = &*(ptr as *const AVPixFmtDescriptor54);
        PixFmtFields {
            name: c_string(p.name),
            nb_components: p.nb_components,
            log2_chroma_w: p.log2_chroma_w,
            log2_chroma_h: p.log2_chroma_h,
            flags: p.flags as u64,
            comp: p.comp.map(|c| c.unpack()),
            alias: c_string(p.alias),
        }
    }
}

impl VersionedView for PixFmt55_56 {
    type Native = AVPixFmtDescriptor;
    type Fields = PixFmtFields;

    fn family(&self) -> &'static str {
        "55_56"
    }

    unsafe fn read(&self, ptr: *const AVPixFmtDescriptor) -> PixFmtFields {
        let p = &*(ptr as *const AVPixFmtDescriptor55_56);
        PixFmtFields {
            name: c_string(p.name),
            nb_components: p.nb_components,
            log2_chroma_w: p.log2_chroma_w,
            log2_chroma_h: p.log2_chroma_h,
            flags: p.flags,
            comp: p.comp.map(|c| ComponentDescriptor {
                plane: c.plane,
                step: c.step,
                offset: c.offset,
                shift: c.shift,
                depth: c.depth,
            }),
            alias: c_string(p.alias),
        }
    }
}

impl VersionedView for PixFmt57_58 {
    type Native = AVPixFmtDescriptor;
    type Fields = PixFmtFields;

    fn family(&self) -> &'static str {
        "57_58"
    }

    unsafe fn read(&self, ptr: *const AVPixFmtDescriptor) -> PixFmtFields {
        let p = &*(ptr as *const AVPixFmtDescriptor57_58);
        PixFmtFields {
            name: c_string(p.name),
            nb_components: p.nb_components,
            log2_chroma_w: p.log2_chroma_w,
            log2_chroma_h: p.log2_chroma_h,
            flags: p.flags,
            comp: p.comp.map(|c| ComponentDescriptor {
                plane: c.plane,
                step: c.step,
                offset: c.offset,
                shift: c.shift,
                depth: c.depth,
            }),
            alias: c_string(p.alias),
        }
    }
}
