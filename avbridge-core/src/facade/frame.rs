use bytes::Bytes;
use serde::Serialize;

use super::pix_fmt::PixFmtDescriptor;
use super::side_data::{MotionVector, SideData};
use super::{Dictionary, Handle};
use crate::abi::{frame_view, side_data_view, FrameFields, FrameView};
use crate::error::{AvError, Result};
use crate::ffi::{AVFrame, AVRational, PictureType, AV_FRAME_DATA_MOTION_VECTORS};
use crate::session::Session;
use crate::version::Library;

/// Palette plane size: 256 RGBA entries.
const PALETTE_BYTES: usize = 256 * 4;

/// Per-picture values worth reporting, independent of the frame layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameInfo {
    pub width: i32,
    pub height: i32,
    pub format: i32,
    pub picture_type: PictureType,
    pub key_frame: bool,
    pub pts: i64,
    pub pkt_dts: i64,
    pub best_effort_timestamp: Option<i64>,
    pub coded_picture_number: i32,
    pub display_picture_number: i32,
    pub sample_aspect_ratio: AVRational,
    pub colorspace: Option<i32>,
}

/// One plane of picture data, copied out of the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub data: Bytes,
    /// Bytes per row, including padding.
    pub linesize: usize,
    pub rows: usize,
}

/// A decoded picture, allocated with `av_frame_alloc` and freed with `av_frame_free`.
pub struct Frame {
    session: Session,
    handle: Handle<AVFrame>,
    view: &'static FrameView,
}

impl Frame {
    pub fn alloc(session: &Session) -> Result<Self> {
        let view = frame_view(session.major(Library::AvUtil))?;
        let ptr = unsafe { (session.functions().avutil.av_frame_alloc)() };
        if ptr.is_null() {
            return Err(AvError::NullResult {
                call: "av_frame_alloc",
            });
        }
        Ok(Self {
            session: session.clone(),
            handle: Handle::new(ptr, "AVFrame"),
            view,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    pub(crate) fn as_ptr(&self) -> Result<*mut AVFrame> {
        self.handle.get()
    }

    pub fn fields(&self) -> Result<FrameFields> {
        let ptr = self.handle.get()?;
        Ok(unsafe { self.view.read(ptr) })
    }

    pub fn info(&self) -> Result<FrameInfo> {
        let f = self.fields()?;
        Ok(FrameInfo {
            width: f.width,
            height: f.height,
            format: f.format,
            picture_type: PictureType::from_raw(f.pict_type),
            key_frame: f.key_frame != 0,
            pts: f.pts,
            pkt_dts: f.pkt_dts,
            best_effort_timestamp: f.best_effort_timestamp,
            coded_picture_number: f.coded_picture_number,
            display_picture_number: f.display_picture_number,
            sample_aspect_ratio: f.sample_aspect_ratio,
            colorspace: f.colorspace,
        })
    }

    pub fn pix_fmt(&self) -> Result<Option<PixFmtDescriptor>> {
        PixFmtDescriptor::get(&self.session, self.fields()?.format)
    }

    /// Copies every plane of the picture. The plane count and the chroma heights come from the
    /// pixel format descriptor; an unknown format yields no planes.
    pub fn planes(&self) -> Result<Vec<Plane>> {
        let fields = self.fields()?;
        let Some(desc) = self.pix_fmt()? else {
            return Ok(Vec::new());
        };
        let height = fields.height.max(0) as usize;

        let mut planes = Vec::new();
        for plane in 0..desc.plane_count() {
            let rows = desc.plane_height(plane, height);
            planes.push(copy_plane(&fields, plane, rows));
        }
        if desc.flags().palette && !fields.data[1].is_null() {
            let data = unsafe { std::slice::from_raw_parts(fields.data[1], PALETTE_BYTES) };
            planes.push(Plane {
                data: Bytes::copy_from_slice(data),
                linesize: PALETTE_BYTES,
                rows: 1,
            });
        }
        Ok(planes)
    }

    /// Frame metadata. Before avutil 57 it is only reachable through `av_frame_get_metadata`.
    pub fn metadata(&self) -> Result<Dictionary<'_>> {
        let ptr = self.handle.get()?;
        let dict = match self.session.functions().avutil.av_frame_get_metadata {
            Some(get) => unsafe { get(ptr) },
            None => unsafe { self.view.read(ptr) }
                .metadata
                .unwrap_or(std::ptr::null_mut()),
        };
        Ok(Dictionary::borrowed(&self.session, dict))
    }

    pub fn side_data(&self, kind: i32) -> Result<Option<SideData<'_>>> {
        let ptr = self.handle.get()?;
        let view = side_data_view(self.session.major(Library::AvUtil))?;
        let raw = unsafe { (self.session.functions().avutil.av_frame_get_side_data)(ptr, kind) };
        if raw.is_null() {
            return Ok(None);
        }
        Ok(Some(SideData::new(&self.session, unsafe { view.read(raw) })))
    }

    /// Motion vectors exported by the decoder (`flags2=+export_mvs`); empty when there are none.
    pub fn motion_vectors(&self) -> Result<Vec<MotionVector>> {
        match self.side_data(AV_FRAME_DATA_MOTION_VECTORS)? {
            Some(side_data) => side_data.motion_vectors(),
            None => Ok(Vec::new()),
        }
    }

    pub fn free(&mut self) -> Result<()> {
        let mut ptr = self.handle.take()?;
        unsafe { (self.session.functions().avutil.av_frame_free)(&mut ptr) };
        Ok(())
    }
}

fn copy_plane(fields: &FrameFields, plane: usize, rows: usize) -> Plane {
    let data = fields.data[plane];
    let linesize = fields.linesize[plane];
    if data.is_null() || linesize == 0 {
        return Plane {
            data: Bytes::new(),
            linesize: 0,
            rows: 0,
        };
    }

    // Rows may run bottom-up when the line size is negative.
    let width = linesize.unsigned_abs() as usize;
    let mut buffer = Vec::with_capacity(width * rows);
    for row in 0..rows {
        let start = unsafe { data.offset(row as isize * linesize as isize) };
        buffer.extend_from_slice(unsafe { std::slice::from_raw_parts(start, width) });
    }
    Plane {
        data: Bytes::from(buffer),
        linesize: width,
        rows,
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("family", &self.view.family())
            .field("info", &self.info().ok())
            .finish()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if !self.handle.is_empty() {
            let _ = self.free();
        }
    }
}
