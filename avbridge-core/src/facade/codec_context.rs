use std::ffi::c_int;
use std::fmt::Write as _;
use std::marker::PhantomData;

use super::codec_parameters::{alloc_padded, free_native};
use super::{CodecParameters, Dictionary, Handle, Ownership};
use crate::abi::{codec_context_view, copy_bytes, CodecContextFields, CodecContextView};
use crate::error::{AvError, Result};
use crate::ffi::{AVCodec, AVCodecContext, MediaType};
use crate::negotiate::DecodeApi;
use crate::session::Session;
use crate::version::Library;

/// Decoder found for a codec id. Decoders are static tables inside libavcodec.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Decoder(*const AVCodec);

impl Decoder {
    pub fn find(session: &Session, codec_id: c_int) -> Option<Self> {
        let codec = unsafe { (session.functions().avcodec.avcodec_find_decoder)(codec_id) };
        (!codec.is_null()).then_some(Self(codec))
    }

    pub fn as_ptr(&self) -> *const AVCodec {
        self.0
    }
}

// Points into a read-only table of the loaded library.
unsafe impl Send for Decoder {}

/// A decoder context we allocated, or a stream's own context borrowed for as long as its
/// format context.
pub struct CodecContext<'a> {
    session: Session,
    handle: Handle<AVCodecContext>,
    view: &'static CodecContextView,
    ownership: Ownership,
    _owner: PhantomData<&'a ()>,
}

impl CodecContext<'static> {
    pub(crate) fn alloc(session: &Session, decoder: Decoder) -> Result<Self> {
        let view = codec_context_view(session.major(Library::AvCodec))?;
        let ptr = unsafe { (session.functions().avcodec.avcodec_alloc_context3)(decoder.as_ptr()) };
        if ptr.is_null() {
            return Err(AvError::NullResult {
                call: "avcodec_alloc_context3",
            });
        }
        Ok(Self {
            session: session.clone(),
            handle: Handle::new(ptr, "AVCodecContext"),
            view,
            ownership: Ownership::Owned,
            _owner: PhantomData,
        })
    }
}

impl<'a> CodecContext<'a> {
    /// A stream's own context (avformat below 59).
    pub(crate) fn borrowed(session: &Session, ptr: *mut AVCodecContext) -> Result<Self> {
        Ok(Self {
            session: session.clone(),
            handle: Handle::new(ptr, "AVCodecContext"),
            view: codec_context_view(session.major(Library::AvCodec))?,
            ownership: Ownership::Borrowed,
            _owner: PhantomData,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    pub(crate) fn as_ptr(&self) -> Result<*mut AVCodecContext> {
        self.handle.get()
    }

    pub fn fields(&self) -> Result<CodecContextFields> {
        let ptr = self.handle.get()?;
        Ok(unsafe { self.view.read(ptr) })
    }

    pub fn media_type(&self) -> Result<MediaType> {
        Ok(MediaType::from_raw(self.fields()?.codec_type))
    }

    pub fn codec_id(&self) -> Result<i32> {
        Ok(self.fields()?.codec_id)
    }

    /// Copies the decoding-relevant fields of `source` into this context, duplicating the
    /// extradata. Used to configure a decoder without `avcodec_parameters_to_context`.
    pub fn copy_from(&mut self, source: &CodecContext<'_>) -> Result<()> {
        let src = source.fields()?;
        let extradata = unsafe { copy_bytes(src.extradata, src.extradata_size as i64) };
        self.apply(|f| {
            f.codec_type = src.codec_type;
            f.codec_id = src.codec_id;
            f.codec_tag = src.codec_tag;
            f.bit_rate = src.bit_rate;
            f.width = src.width;
            f.height = src.height;
            f.pix_fmt = src.pix_fmt;
            f.has_b_frames = src.has_b_frames;
            f.sample_aspect_ratio = src.sample_aspect_ratio;
            f.color_primaries = src.color_primaries;
            f.color_trc = src.color_trc;
            f.colorspace = src.colorspace;
            f.color_range = src.color_range;
            f.chroma_sample_location = src.chroma_sample_location;
        }, &extradata)
    }

    /// Fills the context from codec parameters: through `avcodec_parameters_to_context` when the
    /// library has it, otherwise field by field.
    pub fn set_parameters(&mut self, params: &CodecParameters<'_>) -> Result<()> {
        let ptr = self.handle.get()?;
        if let DecodeApi::SendReceive {
            parameters_to_context,
            ..
        } = self.session.functions().avcodec.decode
        {
            let ret = unsafe { parameters_to_context(ptr, params.as_ptr()?) };
            if ret < 0 {
                return Err(AvError::native("avcodec_parameters_to_context", ret));
            }
            return Ok(());
        }

        let p = params.fields()?;
        let extradata = params.extradata()?;
        self.apply(|f| {
            f.codec_type = p.codec_type;
            f.codec_id = p.codec_id;
            f.codec_tag = p.codec_tag;
            f.bit_rate = p.bit_rate;
            f.width = p.width;
            f.height = p.height;
            f.pix_fmt = p.format;
            f.has_b_frames = p.video_delay;
            f.sample_aspect_ratio = p.sample_aspect_ratio;
            f.color_primaries = p.color_primaries;
            f.color_trc = p.color_trc;
            f.colorspace = p.color_space;
            f.color_range = p.color_range;
            f.chroma_sample_location = p.chroma_location;
        }, &extradata)
    }

    fn apply(&mut self, change: impl FnOnce(&mut CodecContextFields), extradata: &[u8]) -> Result<()> {
        let ptr = self.handle.get()?;
        let mut fields = unsafe { self.view.read(ptr) };
        let old = fields.extradata;
        change(&mut fields);
        if extradata.is_empty() {
            fields.extradata = std::ptr::null_mut();
            fields.extradata_size = 0;
        } else {
            fields.extradata = alloc_padded(&self.session, extradata)?;
            fields.extradata_size = extradata.len() as i32;
        }
        unsafe { self.view.write(ptr, &fields) };
        free_native(&self.session, old);
        Ok(())
    }

    /// Opens the decoder. Options the decoder did not consume are left in `options`.
    pub(crate) fn open(&mut self, decoder: Decoder, options: &mut Dictionary<'_>) -> Result<()> {
        let ptr = self.handle.get()?;
        let ret = unsafe {
            (self.session.functions().avcodec.avcodec_open2)(ptr, decoder.as_ptr(), options.slot())
        };
        if ret < 0 {
            return Err(AvError::native("avcodec_open2", ret));
        }
        Ok(())
    }

    pub fn flush_buffers(&mut self) -> Result<()> {
        let ptr = self.handle.get()?;
        unsafe { (self.session.functions().avcodec.avcodec_flush_buffers)(ptr) };
        Ok(())
    }

    pub fn info_text(&self) -> Result<String> {
        let f = self.fields()?;
        let mut text = String::new();
        let _ = writeln!(text, "Codec Type: {}", MediaType::from_raw(f.codec_type).name());
        if let Some(name) = &f.codec_name {
            let _ = writeln!(text, "Codec Name: {}", name);
        }
        let _ = writeln!(
            text,
            "Codec ID: {} ({})",
            f.codec_id,
            self.session.codec_name(f.codec_id)
        );
        let _ = writeln!(text, "Bitrate: {}", f.bit_rate);
        let _ = writeln!(text, "Time base: {}", f.time_base);
        let _ = writeln!(text, "Size: {}x{}", f.width, f.height);
        let _ = writeln!(text, "Pixel format: {}", f.pix_fmt);
        let _ = writeln!(text, "GOP size: {}", f.gop_size);
        let _ = writeln!(text, "B-frame delay: {}", f.has_b_frames);
        let _ = writeln!(text, "Sample aspect ratio: {}", f.sample_aspect_ratio);
        Ok(text)
    }

    pub fn free(&mut self) -> Result<()> {
        let mut ptr = self.handle.take()?;
        if self.ownership == Ownership::Owned {
            unsafe { (self.session.functions().avcodec.avcodec_free_context)(&mut ptr) };
        }
        Ok(())
    }
}

impl std::fmt::Debug for CodecContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecContext")
            .field("family", &self.view.family())
            .field("ownership", &self.ownership)
            .finish()
    }
}

impl Drop for CodecContext<'_> {
    fn drop(&mut self) {
        if !self.handle.is_empty() {
            let _ = self.free();
        }
    }
}
