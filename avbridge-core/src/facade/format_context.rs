use std::ffi::c_int;
use std::fmt::Write as _;
use std::ptr;

use super::{Dictionary, Handle, Packet, Stream};
use crate::abi::{format_context_view, stream_view, FormatContextFields, FormatContextView, StreamView};
use crate::error::{AvError, Result};
use crate::ffi::{
    self, format_timestamp, AVFormatContext, AVFMTCTX_NOHEADER, AVFMTCTX_UNSEEKABLE,
    AV_TIME_BASE_Q,
};
use crate::session::Session;
use crate::version::Library;

/// An opened input, from `avformat_open_input` until `avformat_close_input`.
pub struct FormatContext {
    session: Session,
    handle: Handle<AVFormatContext>,
    view: &'static FormatContextView,
    stream_view: &'static StreamView,
}

impl FormatContext {
    /// Opens `url` and reads its header. Fails with [`AvError::Native`] if the demuxer refuses
    /// the input.
    pub fn open(session: &Session, url: &str) -> Result<Self> {
        let major = session.major(Library::AvFormat);
        let view = format_context_view(major)?;
        let stream_view = stream_view(major)?;
        let c_url = Session::c_string(url)?;

        let mut ptr: *mut AVFormatContext = ptr::null_mut();
        let ret = unsafe {
            (session.functions().avformat.avformat_open_input)(
                &mut ptr,
                c_url.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
            )
        };
        if ret < 0 {
            return Err(AvError::native("avformat_open_input", ret));
        }
        if ptr.is_null() {
            return Err(AvError::NullResult {
                call: "avformat_open_input",
            });
        }
        tracing::debug!("Opened {} ({} layout)", url, view.family());
        Ok(Self {
            session: session.clone(),
            handle: Handle::new(ptr, "AVFormatContext"),
            view,
            stream_view,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    /// Probes packets to fill in stream parameters the header did not carry.
    pub fn find_stream_info(&mut self) -> Result<()> {
        let ptr = self.handle.get()?;
        let ret = unsafe {
            (self.session.functions().avformat.avformat_find_stream_info)(ptr, ptr::null_mut())
        };
        if ret < 0 {
            return Err(AvError::native("avformat_find_stream_info", ret));
        }
        Ok(())
    }

    pub fn fields(&self) -> Result<FormatContextFields> {
        let ptr = self.handle.get()?;
        Ok(unsafe { self.view.read(ptr) })
    }

    pub fn nb_streams(&self) -> Result<usize> {
        Ok(self.fields()?.nb_streams as usize)
    }

    pub fn url(&self) -> Result<String> {
        Ok(self.fields()?.url)
    }

    pub fn stream(&self, index: usize) -> Result<Stream<'_>> {
        let fields = self.fields()?;
        let count = fields.nb_streams as usize;
        if index >= count || fields.streams.is_null() {
            return Err(AvError::StreamIndex { index, count });
        }
        let ptr = unsafe { *fields.streams.add(index) };
        if ptr.is_null() {
            return Err(AvError::EmptyHandle { entity: "AVStream" });
        }
        Ok(Stream::new(&self.session, ptr, self.stream_view))
    }

    pub fn streams(&self) -> Result<Vec<Stream<'_>>> {
        (0..self.nb_streams()?).map(|i| self.stream(i)).collect()
    }

    /// Reads the next packet into `packet`. Returns `false` at the end of the input; any
    /// negative return of the read counts as the end.
    pub fn read_packet(&mut self, packet: &mut Packet) -> Result<bool> {
        let ptr = self.handle.get()?;
        let ret = unsafe { (self.session.functions().avformat.av_read_frame)(ptr, packet.as_ptr()?) };
        if ret < 0 {
            if !ffi::is_eof(ret) {
                tracing::debug!("av_read_frame stopped: {}", ffi::describe_error(ret));
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// Seeks `stream_index` (or, for -1, the default stream in `AV_TIME_BASE` units) to `ts`.
    pub fn seek(&mut self, stream_index: c_int, ts: i64, flags: c_int) -> Result<()> {
        let ptr = self.handle.get()?;
        let ret =
            unsafe { (self.session.functions().avformat.av_seek_frame)(ptr, stream_index, ts, flags) };
        if ret < 0 {
            return Err(AvError::native("av_seek_frame", ret));
        }
        Ok(())
    }

    pub fn is_seekable(&self) -> Result<bool> {
        Ok(self.fields()?.ctx_flags & AVFMTCTX_UNSEEKABLE == 0)
    }

    pub fn metadata(&self) -> Result<Dictionary<'_>> {
        Ok(Dictionary::borrowed(&self.session, self.fields()?.metadata))
    }

    pub fn info_text(&self) -> Result<String> {
        let f = self.fields()?;
        let mut text = String::new();
        let _ = writeln!(text, "URL: {}", f.url);
        let _ = writeln!(text, "Streams: {}", f.nb_streams);
        let _ = writeln!(text, "Start: {}", format_timestamp(f.start_time, AV_TIME_BASE_Q));
        let _ = writeln!(text, "Duration: {}", format_timestamp(f.duration, AV_TIME_BASE_Q));
        let _ = writeln!(text, "Bitrate: {}", f.bit_rate);
        if f.ctx_flags & AVFMTCTX_NOHEADER != 0 {
            let _ = writeln!(text, "No header: streams may appear while reading");
        }
        if f.ctx_flags & AVFMTCTX_UNSEEKABLE != 0 {
            let _ = writeln!(text, "Unseekable");
        }
        let _ = writeln!(text, "Probe size: {}", f.probesize);
        let _ = writeln!(text, "Programs: {}, chapters: {}", f.nb_programs, f.nb_chapters);
        for entry in self.metadata()?.entries() {
            let _ = writeln!(text, "Metadata {}: {}", entry.key, entry.value);
        }
        Ok(text)
    }

    pub fn close(&mut self) -> Result<()> {
        let mut ptr = self.handle.take()?;
        unsafe { (self.session.functions().avformat.avformat_close_input)(&mut ptr) };
        Ok(())
    }
}

impl std::fmt::Debug for FormatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatContext")
            .field("family", &self.view.family())
            .field("url", &self.url().ok())
            .finish()
    }
}

impl Drop for FormatContext {
    fn drop(&mut self) {
        if !self.handle.is_empty() {
            let _ = self.close();
        }
    }
}
