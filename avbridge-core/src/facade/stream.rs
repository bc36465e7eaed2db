use std::fmt::Write as _;
use std::marker::PhantomData;

use super::{CodecContext, CodecParameters, Dictionary, FormatContext};
use crate::abi::{StreamFields, StreamView};
use crate::error::{AvError, Result};
use crate::ffi::{disposition_names, format_timestamp, AVRational, AVStream, MediaType};
use crate::session::Session;

/// One stream of an open input. Streams belong to the format context and live as long as the
/// borrow of it.
pub struct Stream<'a> {
    session: &'a Session,
    ptr: *mut AVStream,
    view: &'static StreamView,
    _format: PhantomData<&'a FormatContext>,
}

impl<'a> Stream<'a> {
    pub(crate) fn new(session: &'a Session, ptr: *mut AVStream, view: &'static StreamView) -> Self {
        Self {
            session,
            ptr,
            view,
            _format: PhantomData,
        }
    }

    pub fn fields(&self) -> StreamFields {
        unsafe { self.view.read(self.ptr) }
    }

    pub fn index(&self) -> usize {
        self.fields().index.max(0) as usize
    }

    /// The stream's codec parameters, when this avformat has them. Parameters present under an
    /// avcodec whose layout is unknown are an ABI error, never a silent `None`. The facade is
    /// borrowed from the format context.
    pub fn codec_parameters(&self) -> Result<Option<CodecParameters<'a>>> {
        match self.fields().codecpar {
            Some(ptr) if !ptr.is_null() => Ok(Some(CodecParameters::borrowed(self.session, ptr)?)),
            _ => Ok(None),
        }
    }

    /// The stream's own codec context (avformat below 59). Borrowed like
    /// [`Stream::codec_parameters`].
    pub fn codec_context(&self) -> Result<Option<CodecContext<'a>>> {
        match self.fields().codec {
            Some(ptr) if !ptr.is_null() => Ok(Some(CodecContext::borrowed(self.session, ptr)?)),
            _ => Ok(None),
        }
    }

    /// Codec parameters when present, the stream's codec context otherwise.
    pub fn media_type(&self) -> Result<MediaType> {
        if let Some(params) = self.codec_parameters()? {
            return params.media_type();
        }
        match self.codec_context()? {
            Some(ctx) => ctx.media_type(),
            None => Err(AvError::EmptyHandle {
                entity: "AVCodecParameters",
            }),
        }
    }

    pub fn codec_id(&self) -> Result<i32> {
        if let Some(params) = self.codec_parameters()? {
            return params.codec_id();
        }
        match self.codec_context()? {
            Some(ctx) => ctx.codec_id(),
            None => Err(AvError::EmptyHandle {
                entity: "AVCodecParameters",
            }),
        }
    }

    pub fn codec_name(&self) -> Result<String> {
        Ok(self.session.codec_name(self.codec_id()?))
    }

    /// The stream time base, or the codec context's if the stream has none.
    pub fn time_base(&self) -> Result<AVRational> {
        let time_base = self.fields().time_base;
        if time_base.is_valid() {
            return Ok(time_base);
        }
        match self.codec_context()? {
            Some(ctx) => Ok(ctx.fields()?.time_base),
            None => Ok(time_base),
        }
    }

    /// Average frame rate, falling back to the real base frame rate.
    pub fn frame_rate(&self) -> Option<AVRational> {
        let fields = self.fields();
        if fields.avg_frame_rate.is_valid() {
            return Some(fields.avg_frame_rate);
        }
        fields.r_frame_rate.filter(AVRational::is_valid)
    }

    pub fn metadata(&self) -> Dictionary<'a> {
        Dictionary::borrowed(self.session, self.fields().metadata)
    }

    pub fn info_text(&self) -> Result<String> {
        let f = self.fields();
        let time_base = self.time_base()?;
        let mut text = String::new();
        let _ = writeln!(text, "Index: {} (id {})", f.index, f.id);
        let _ = writeln!(text, "Type: {}", self.media_type()?.name());
        let _ = writeln!(text, "Codec: {} ({})", self.codec_name()?, self.codec_id()?);
        let _ = writeln!(text, "Time base: {}", time_base);
        let _ = writeln!(text, "Start: {}", format_timestamp(f.start_time, time_base));
        let _ = writeln!(text, "Duration: {}", format_timestamp(f.duration, time_base));
        let _ = writeln!(text, "Frames: {}", f.nb_frames);
        let _ = writeln!(text, "Sample aspect ratio: {}", f.sample_aspect_ratio);
        if let Some(rate) = self.frame_rate() {
            let _ = writeln!(text, "Frame rate: {}", rate);
        }
        let disposition = disposition_names(f.disposition);
        if !disposition.is_empty() {
            let _ = writeln!(text, "Disposition: {}", disposition.join(", "));
        }
        for entry in self.metadata().entries() {
            let _ = writeln!(text, "Metadata {}: {}", entry.key, entry.value);
        }
        if let Some(params) = self.codec_parameters()? {
            text.push_str(&params.info_text()?);
        }
        Ok(text)
    }
}

impl std::fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("family", &self.view.family())
            .field("fields", &self.fields())
            .finish()
    }
}
