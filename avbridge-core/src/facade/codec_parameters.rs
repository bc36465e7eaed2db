use bytes::Bytes;
use std::fmt::Write as _;
use std::marker::PhantomData;

use super::{Handle, Ownership};
use crate::abi::{
    codec_parameters_view, copy_bytes, CodecParametersFields, CodecParametersView,
};
use crate::error::{AvError, Result};
use crate::ffi::{AVCodecParameters, AVRational, MediaType, AV_INPUT_BUFFER_PADDING_SIZE};
use crate::session::Session;
use crate::version::Library;

/// Codec parameters of a stream (borrowed) or allocated by us (owned). Present from avcodec 57.
///
/// Borrowed parameters live no longer than the stream's format context:
///
/// ```compile_fail
/// # fn stale(session: &avbridge_core::Session) -> avbridge_core::Result<()> {
/// let mut input = avbridge_core::FormatContext::open(session, "movie.mkv")?;
/// let params = input.stream(0)?.codec_parameters()?;
/// input.close()?;
/// params.map(|p| p.codec_id());
/// # Ok(())
/// # }
/// ```
pub struct CodecParameters<'a> {
    session: Session,
    handle: Handle<AVCodecParameters>,
    view: &'static CodecParametersView,
    ownership: Ownership,
    _owner: PhantomData<&'a ()>,
}

impl CodecParameters<'static> {
    pub fn alloc(session: &Session) -> Result<Self> {
        let view = codec_parameters_view(session.major(Library::AvCodec))?;
        let ptr = unsafe { (session.functions().avcodec.avcodec_parameters_alloc)() };
        if ptr.is_null() {
            return Err(AvError::NullResult {
                call: "avcodec_parameters_alloc",
            });
        }
        Ok(Self {
            session: session.clone(),
            handle: Handle::new(ptr, "AVCodecParameters"),
            view,
            ownership: Ownership::Owned,
            _owner: PhantomData,
        })
    }
}

impl<'a> CodecParameters<'a> {
    pub(crate) fn borrowed(session: &Session, ptr: *mut AVCodecParameters) -> Result<Self> {
        Ok(Self {
            session: session.clone(),
            handle: Handle::new(ptr, "AVCodecParameters"),
            view: codec_parameters_view(session.major(Library::AvCodec))?,
            ownership: Ownership::Borrowed,
            _owner: PhantomData,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub(crate) fn as_ptr(&self) -> Result<*mut AVCodecParameters> {
        self.handle.get()
    }

    pub fn fields(&self) -> Result<CodecParametersFields> {
        let ptr = self.handle.get()?;
        Ok(unsafe { self.view.read(ptr) })
    }

    fn update(&mut self, change: impl FnOnce(&mut CodecParametersFields)) -> Result<()> {
        let ptr = self.handle.get()?;
        let mut fields = unsafe { self.view.read(ptr) };
        change(&mut fields);
        unsafe { self.view.write(ptr, &fields) };
        Ok(())
    }

    pub fn media_type(&self) -> Result<MediaType> {
        Ok(MediaType::from_raw(self.fields()?.codec_type))
    }

    pub fn codec_id(&self) -> Result<i32> {
        Ok(self.fields()?.codec_id)
    }

    pub fn extradata(&self) -> Result<Bytes> {
        let f = self.fields()?;
        Ok(Bytes::from(unsafe { copy_bytes(f.extradata, f.extradata_size as i64) }))
    }

    pub fn set_media_type(&mut self, media_type: MediaType) -> Result<()> {
        self.update(|f| f.codec_type = media_type.to_raw())
    }

    pub fn set_codec_id(&mut self, codec_id: i32) -> Result<()> {
        self.update(|f| f.codec_id = codec_id)
    }

    pub fn set_size(&mut self, width: i32, height: i32) -> Result<()> {
        self.update(|f| {
            f.width = width;
            f.height = height;
        })
    }

    /// Pixel format for video.
    pub fn set_format(&mut self, format: i32) -> Result<()> {
        self.update(|f| f.format = format)
    }

    pub fn set_profile_level(&mut self, profile: i32, level: i32) -> Result<()> {
        self.update(|f| {
            f.profile = profile;
            f.level = level;
        })
    }

    pub fn set_sample_aspect_ratio(&mut self, sar: AVRational) -> Result<()> {
        self.update(|f| f.sample_aspect_ratio = sar)
    }

    /// Replaces the extradata with a padded copy in library-allocated memory, so the library
    /// can free it together with the parameters.
    pub fn set_extradata(&mut self, data: &[u8]) -> Result<()> {
        let size = i32::try_from(data.len())
            .map_err(|_| AvError::InvalidArgument(format!("extradata of {} bytes", data.len())))?;
        let old = self.fields()?.extradata;
        let new = if data.is_empty() {
            std::ptr::null_mut()
        } else {
            alloc_padded(&self.session, data)?
        };
        self.update(|f| {
            f.extradata = new;
            f.extradata_size = size;
        })?;
        free_native(&self.session, old);
        Ok(())
    }

    /// Resets every field to what a fresh allocation holds.
    pub fn clear_values(&mut self) -> Result<()> {
        let old = self.fields()?.extradata;
        self.update(|f| *f = CodecParametersFields::cleared())?;
        free_native(&self.session, old);
        Ok(())
    }

    pub fn info_text(&self) -> Result<String> {
        let f = self.fields()?;
        let mut text = String::new();
        let _ = writeln!(text, "Codec Type: {}", MediaType::from_raw(f.codec_type).name());
        let _ = writeln!(
            text,
            "Codec ID: {} ({})",
            f.codec_id,
            self.session.codec_name(f.codec_id)
        );
        let _ = writeln!(text, "Codec Tag: {:#x}", f.codec_tag);
        let _ = writeln!(text, "Extradata: {} bytes", f.extradata_size.max(0));
        let _ = writeln!(text, "Format: {}", f.format);
        let _ = writeln!(text, "Bitrate: {}", f.bit_rate);
        let _ = writeln!(text, "Profile / Level: {} / {}", f.profile, f.level);
        let _ = writeln!(text, "Size: {}x{}", f.width, f.height);
        let _ = writeln!(text, "Sample aspect ratio: {}", f.sample_aspect_ratio);
        let _ = writeln!(text, "Color space: {}", f.color_space);
        let _ = writeln!(text, "Video delay: {}", f.video_delay);
        Ok(text)
    }

    /// Frees owned parameters (borrowed ones are only forgotten).
    pub fn free(&mut self) -> Result<()> {
        let mut ptr = self.handle.take()?;
        if self.ownership == Ownership::Borrowed {
            return Ok(());
        }
        match self.session.functions().avcodec.avcodec_parameters_free {
            Some(free) => unsafe { free(&mut ptr) },
            None => {
                let fields = unsafe { self.view.read(ptr) };
                free_native(&self.session, fields.extradata);
                free_native(&self.session, ptr as *mut u8);
            }
        }
        Ok(())
    }
}

/// `av_mallocz` copy of `data` followed by the input padding.
pub(crate) fn alloc_padded(session: &Session, data: &[u8]) -> Result<*mut u8> {
    let ptr = unsafe {
        (session.functions().avutil.av_mallocz)(data.len() + AV_INPUT_BUFFER_PADDING_SIZE)
    } as *mut u8;
    if ptr.is_null() {
        return Err(AvError::NullResult { call: "av_mallocz" });
    }
    unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len()) };
    Ok(ptr)
}

/// Frees library-allocated memory if `av_free` is exported; leaks it otherwise.
pub(crate) fn free_native(session: &Session, ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    match session.functions().avutil.av_free {
        Some(free) => unsafe { free(ptr as *mut std::ffi::c_void) },
        None => tracing::debug!("av_free not exported; leaking {:p}", ptr),
    }
}

impl std::fmt::Debug for CodecParameters<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecParameters")
            .field("ownership", &self.ownership)
            .field("fields", &self.fields().ok())
            .finish()
    }
}

impl Drop for CodecParameters<'_> {
    fn drop(&mut self) {
        if !self.handle.is_empty() {
            let _ = self.free();
        }
    }
}
