use bytes::Bytes;

use super::Handle;
use crate::abi::{copy_bytes, packet_view, PacketFields, PacketView};
use crate::bitstream::PacketDataFormat;
use crate::error::{AvError, Result};
use crate::ffi::{
    AVPacket, AVRational, AV_INPUT_BUFFER_PADDING_SIZE, AV_PKT_FLAG_CORRUPT, AV_PKT_FLAG_DISCARD,
    AV_PKT_FLAG_KEY,
};
use crate::session::Session;
use crate::version::Library;

/// A compressed packet, allocated with `av_packet_alloc` and freed with `av_packet_free`.
pub struct Packet {
    session: Session,
    handle: Handle<AVPacket>,
    view: &'static PacketView,
    /// Payload set through [`Packet::set_data`]; the packet points into it.
    payload: Option<Vec<u8>>,
}

impl Packet {
    pub fn alloc(session: &Session) -> Result<Self> {
        let view = packet_view(session.major(Library::AvCodec))?;
        let ptr = unsafe { (session.functions().avcodec.av_packet_alloc)() };
        if ptr.is_null() {
            return Err(AvError::NullResult {
                call: "av_packet_alloc",
            });
        }
        Ok(Self {
            session: session.clone(),
            handle: Handle::new(ptr, "AVPacket"),
            view,
            payload: None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    pub(crate) fn as_ptr(&self) -> Result<*mut AVPacket> {
        self.handle.get()
    }

    pub fn fields(&self) -> Result<PacketFields> {
        let ptr = self.handle.get()?;
        Ok(unsafe { self.view.read(ptr) })
    }

    fn update(&mut self, change: impl FnOnce(&mut PacketFields)) -> Result<()> {
        let ptr = self.handle.get()?;
        let mut fields = unsafe { self.view.read(ptr) };
        change(&mut fields);
        unsafe { self.view.write(ptr, &fields) };
        Ok(())
    }

    pub fn pts(&self) -> Result<i64> {
        Ok(self.fields()?.pts)
    }

    pub fn dts(&self) -> Result<i64> {
        Ok(self.fields()?.dts)
    }

    pub fn set_pts(&mut self, pts: i64) -> Result<()> {
        self.update(|f| f.pts = pts)
    }

    pub fn set_dts(&mut self, dts: i64) -> Result<()> {
        self.update(|f| f.dts = dts)
    }

    pub fn duration(&self) -> Result<i64> {
        Ok(self.fields()?.duration)
    }

    pub fn stream_index(&self) -> Result<i32> {
        Ok(self.fields()?.stream_index)
    }

    pub fn set_stream_index(&mut self, index: i32) -> Result<()> {
        self.update(|f| f.stream_index = index)
    }

    pub fn size(&self) -> Result<usize> {
        Ok(self.fields()?.size.max(0) as usize)
    }

    /// Only packets of avcodec 59 and later carry their own time base.
    pub fn time_base(&self) -> Result<Option<AVRational>> {
        Ok(self.fields()?.time_base)
    }

    pub fn is_key(&self) -> Result<bool> {
        Ok(self.fields()?.flags & AV_PKT_FLAG_KEY != 0)
    }

    pub fn is_corrupt(&self) -> Result<bool> {
        Ok(self.fields()?.flags & AV_PKT_FLAG_CORRUPT != 0)
    }

    pub fn is_discard(&self) -> Result<bool> {
        Ok(self.fields()?.flags & AV_PKT_FLAG_DISCARD != 0)
    }

    pub fn set_key(&mut self, key: bool) -> Result<()> {
        self.update(|f| {
            if key {
                f.flags |= AV_PKT_FLAG_KEY;
            } else {
                f.flags &= !AV_PKT_FLAG_KEY;
            }
        })
    }

    /// Copy of the payload.
    pub fn data(&self) -> Result<Bytes> {
        let fields = self.fields()?;
        Ok(Bytes::from(unsafe { copy_bytes(fields.data, fields.size as i64) }))
    }

    /// Points the packet at a copy of `payload`, zero padded as decoders expect. The packet is
    /// not reference counted afterwards; decoders copy such payloads on submission.
    pub fn set_data(&mut self, payload: &[u8]) -> Result<()> {
        let size = i32::try_from(payload.len())
            .map_err(|_| AvError::InvalidArgument(format!("payload of {} bytes", payload.len())))?;
        let mut buffer = Vec::with_capacity(payload.len() + AV_INPUT_BUFFER_PADDING_SIZE);
        buffer.extend_from_slice(payload);
        buffer.resize(payload.len() + AV_INPUT_BUFFER_PADDING_SIZE, 0);
        let data = buffer.as_mut_ptr();
        self.update(|f| {
            f.data = data;
            f.size = size;
        })?;
        self.payload = Some(buffer);
        Ok(())
    }

    pub fn data_format(&self) -> Result<PacketDataFormat> {
        Ok(PacketDataFormat::guess(&self.data()?))
    }

    /// Releases the payload and resets every field, keeping the packet allocated.
    pub fn unref(&mut self) -> Result<()> {
        let ptr = self.handle.get()?;
        unsafe { (self.session.functions().avcodec.av_packet_unref)(ptr) };
        self.payload = None;
        Ok(())
    }

    /// Frees the packet. A second call fails with [`AvError::EmptyHandle`].
    pub fn free(&mut self) -> Result<()> {
        let mut ptr = self.handle.take()?;
        unsafe { (self.session.functions().avcodec.av_packet_free)(&mut ptr) };
        self.payload = None;
        Ok(())
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("family", &self.view.family())
            .field("fields", &self.fields().ok())
            .finish()
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        if !self.handle.is_empty() {
            let _ = self.free();
        }
    }
}
