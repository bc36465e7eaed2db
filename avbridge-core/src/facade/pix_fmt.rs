//! Pixel format descriptors and their classification into YUV and RGB layouts.

use serde::Serialize;
use std::ffi::c_int;

use crate::abi::{pix_fmt_view, ComponentDescriptor, PixFmtFields, PixFmtView};
use crate::error::Result;
use crate::ffi::{AVPixFmtDescriptor, AV_PIX_FMT_NONE};
use crate::session::Session;
use crate::version::Library;

const FLAG_BE: u64 = 1 << 0;
const FLAG_PAL: u64 = 1 << 1;
const FLAG_BITSTREAM: u64 = 1 << 2;
const FLAG_HWACCEL: u64 = 1 << 3;
const FLAG_PLANAR: u64 = 1 << 4;
const FLAG_RGB: u64 = 1 << 5;
const FLAG_PSEUDOPAL: u64 = 1 << 6;
const FLAG_ALPHA: u64 = 1 << 7;
const FLAG_BAYER: u64 = 1 << 8;
const FLAG_FLOAT: u64 = 1 << 9;

/// `AV_PIX_FMT_FLAG_*` decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PixFmtFlags {
    pub big_endian: bool,
    pub palette: bool,
    pub bitstream: bool,
    pub hwaccel: bool,
    pub planar: bool,
    pub rgb: bool,
    pub pseudo_palette: bool,
    pub alpha: bool,
    pub bayer: bool,
    pub float: bool,
}

impl PixFmtFlags {
    pub fn from_bits(bits: u64) -> Self {
        Self {
            big_endian: bits & FLAG_BE != 0,
            palette: bits & FLAG_PAL != 0,
            bitstream: bits & FLAG_BITSTREAM != 0,
            hwaccel: bits & FLAG_HWACCEL != 0,
            planar: bits & FLAG_PLANAR != 0,
            rgb: bits & FLAG_RGB != 0,
            pseudo_palette: bits & FLAG_PSEUDOPAL != 0,
            alpha: bits & FLAG_ALPHA != 0,
            bayer: bits & FLAG_BAYER != 0,
            float: bits & FLAG_FLOAT != 0,
        }
    }

    /// Palettes, hardware surfaces, Bayer mosaics and float samples have no plain sample layout.
    pub fn is_supported(&self) -> bool {
        !(self.palette || self.hwaccel || self.pseudo_palette || self.bayer || self.float)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Subsampling {
    Yuv400,
    Yuv444,
    Yuv422,
    Yuv420,
    Yuv440,
    Yuv410,
    Yuv411,
}

impl Subsampling {
    fn from_shifts(log2_w: u8, log2_h: u8) -> Option<Self> {
        match (log2_w, log2_h) {
            (0, 0) => Some(Self::Yuv444),
            (1, 0) => Some(Self::Yuv422),
            (1, 1) => Some(Self::Yuv420),
            (0, 1) => Some(Self::Yuv440),
            (2, 2) => Some(Self::Yuv410),
            (2, 0) => Some(Self::Yuv411),
            _ => None,
        }
    }

    /// `(log2_chroma_w, log2_chroma_h)`; luma-only formats carry no chroma.
    pub fn shifts(&self) -> (u8, u8) {
        match self {
            Self::Yuv400 | Self::Yuv444 => (0, 0),
            Self::Yuv422 => (1, 0),
            Self::Yuv420 => (1, 1),
            Self::Yuv440 => (0, 1),
            Self::Yuv410 => (2, 2),
            Self::Yuv411 => (2, 0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Yuv400 => "4:0:0",
            Self::Yuv444 => "4:4:4",
            Self::Yuv422 => "4:2:2",
            Self::Yuv420 => "4:2:0",
            Self::Yuv440 => "4:4:0",
            Self::Yuv410 => "4:1:0",
            Self::Yuv411 => "4:1:1",
        }
    }
}

/// Planar YUV layout, planes in Y, U, V(, A) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YuvLayout {
    pub subsampling: Subsampling,
    pub bits_per_sample: u32,
    pub has_alpha: bool,
    pub big_endian: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlphaPosition {
    None,
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RgbLayout {
    pub bits_per_sample: u32,
    pub planar: bool,
    /// Colour channels in memory order, e.g. `"RGB"` or `"GBR"`.
    pub channel_order: String,
    pub alpha: AlphaPosition,
    pub big_endian: bool,
}

/// One entry of the library's pixel format table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixFmtDescriptor {
    pub id: c_int,
    pub fields: PixFmtFields,
}

impl PixFmtDescriptor {
    /// Looks up the descriptor of a pixel format id. Unknown ids give `None`.
    pub fn get(session: &Session, id: c_int) -> Result<Option<Self>> {
        let view = pix_fmt_view(session.major(Library::AvUtil))?;
        let ptr = unsafe { (session.functions().avutil.av_pix_fmt_desc_get)(id) };
        if ptr.is_null() {
            return Ok(None);
        }
        Ok(Some(Self {
            id,
            fields: unsafe { view.read(ptr) },
        }))
    }

    /// Every descriptor the library knows, in table order.
    pub fn all(session: &Session) -> Result<Vec<Self>> {
        let view = pix_fmt_view(session.major(Library::AvUtil))?;
        let functions = &session.functions().avutil;
        let mut descriptors = Vec::new();
        let mut ptr: *const AVPixFmtDescriptor = std::ptr::null();
        loop {
            ptr = unsafe { (functions.av_pix_fmt_desc_next)(ptr) };
            if ptr.is_null() {
                break;
            }
            descriptors.push(Self {
                id: unsafe { (functions.av_pix_fmt_desc_get_id)(ptr) },
                fields: read(view, ptr),
            });
        }
        Ok(descriptors)
    }

    /// Finds the id whose descriptor has the same sample layout as `fields`; names are ignored.
    /// Returns [`AV_PIX_FMT_NONE`] if no entry matches.
    pub fn find_id(session: &Session, fields: &PixFmtFields) -> Result<c_int> {
        Ok(Self::all(session)?
            .into_iter()
            .find(|d| same_layout(&d.fields, fields))
            .map(|d| d.id)
            .unwrap_or(AV_PIX_FMT_NONE))
    }

    /// Builds the descriptor fields a planar YUV layout would have.
    pub fn fields_for_yuv(layout: &YuvLayout) -> PixFmtFields {
        let (log2_chroma_w, log2_chroma_h) = layout.subsampling.shifts();
        let mut nb_components: u8 = if layout.subsampling == Subsampling::Yuv400 {
            1
        } else {
            3
        };
        if layout.has_alpha {
            nb_components += 1;
        }

        let mut flags = 0;
        if layout.big_endian {
            flags |= FLAG_BE;
        }
        if nb_components > 1 {
            flags |= FLAG_PLANAR;
        }
        if layout.has_alpha {
            flags |= FLAG_ALPHA;
        }

        let step = if layout.bits_per_sample > 8 { 2 } else { 1 };
        let mut comp = [ComponentDescriptor::default(); 4];
        for (i, c) in comp.iter_mut().enumerate().take(nb_components as usize) {
            *c = ComponentDescriptor {
                plane: i as i32,
                step,
                offset: 0,
                shift: 0,
                depth: layout.bits_per_sample as i32,
            };
        }

        PixFmtFields {
            name: String::new(),
            nb_components,
            log2_chroma_w,
            log2_chroma_h,
            flags,
            comp,
            alias: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.fields.name
    }

    pub fn flags(&self) -> PixFmtFlags {
        PixFmtFlags::from_bits(self.fields.flags)
    }

    pub fn is_rgb(&self) -> bool {
        self.flags().rgb
    }

    pub fn components(&self) -> &[ComponentDescriptor] {
        &self.fields.comp[..(self.fields.nb_components as usize).min(4)]
    }

    /// Number of data planes, not counting a palette.
    pub fn plane_count(&self) -> usize {
        self.components()
            .iter()
            .map(|c| c.plane as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Height of `plane` for a picture `height` rows high. Chroma planes of YUV formats are
    /// subsampled, rounding up.
    pub fn plane_height(&self, plane: usize, height: usize) -> usize {
        if !self.is_rgb() && (plane == 1 || plane == 2) {
            let shift = self.fields.log2_chroma_h as u32;
            (height + (1 << shift) - 1) >> shift
        } else {
            height
        }
    }

    fn common_depth(&self) -> Option<u32> {
        let components = self.components();
        let depth = components.first()?.depth;
        components
            .iter()
            .all(|c| c.depth == depth)
            .then_some(depth as u32)
    }

    pub fn yuv_layout(&self) -> Option<YuvLayout> {
        let flags = self.flags();
        if flags.rgb || !flags.is_supported() || flags.bitstream {
            return None;
        }

        let nb = self.fields.nb_components;
        let subsampling = if nb == 1 {
            Subsampling::Yuv400
        } else {
            Subsampling::from_shifts(self.fields.log2_chroma_w, self.fields.log2_chroma_h)?
        };
        let has_alpha = match (nb, flags.alpha) {
            (1, false) | (3, false) => false,
            (4, true) => true,
            _ => return None,
        };
        // Luma-only formats carry no planar flag.
        if nb > 1 && !flags.planar {
            return None;
        }

        Some(YuvLayout {
            subsampling,
            bits_per_sample: self.common_depth()?,
            has_alpha,
            big_endian: flags.big_endian,
        })
    }

    pub fn rgb_layout(&self) -> Option<RgbLayout> {
        let flags = self.flags();
        if !flags.rgb || !flags.is_supported() || flags.bitstream {
            return None;
        }
        let bits_per_sample = self.common_depth()?;

        // Colour components are R, G, B in descriptor order; sort them by where they sit.
        let mut colour: Vec<(char, i32, i32)> = ['R', 'G', 'B']
            .iter()
            .zip(self.components())
            .map(|(name, c)| (*name, c.plane, c.offset))
            .collect();
        colour.sort_by_key(|(_, plane, offset)| (*plane, *offset));
        let channel_order: String = colour.iter().map(|(name, _, _)| *name).collect();

        let alpha = match self.components().get(3) {
            Some(a) if flags.alpha => {
                let before_colour = self
                    .components()
                    .iter()
                    .take(3)
                    .all(|c| (a.plane, a.offset) < (c.plane, c.offset));
                if before_colour {
                    AlphaPosition::First
                } else {
                    AlphaPosition::Last
                }
            }
            _ => AlphaPosition::None,
        };

        Some(RgbLayout {
            bits_per_sample,
            planar: flags.planar,
            channel_order,
            alpha,
            big_endian: flags.big_endian,
        })
    }
}

fn read(view: &PixFmtView, ptr: *const AVPixFmtDescriptor) -> PixFmtFields {
    unsafe { view.read(ptr) }
}

/// Descriptor equality over the sample layout: component count, chroma shifts, flags and the
/// used components.
pub fn same_layout(a: &PixFmtFields, b: &PixFmtFields) -> bool {
    let n = (a.nb_components as usize).min(4);
    a.nb_components == b.nb_components
        && a.log2_chroma_w == b.log2_chroma_w
        && a.log2_chroma_h == b.log2_chroma_h
        && a.flags == b.flags
        && a.comp[..n] == b.comp[..n]
}
